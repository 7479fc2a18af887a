// ==========================================
// 词典导入系统 - 词典导入 Trait
// ==========================================
// 职责: 定义异步导入接口（不包含实现）
// 说明: 单次导入本身是同步阻塞流程, 异步接口将其放入阻塞线程池执行
// ==========================================

use crate::domain::import_task::{ImportOutcome, ImportRequest};
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// DictionaryImporter Trait
// ==========================================
// 实现者: DictionaryImporterImpl
#[async_trait]
pub trait DictionaryImporter: Send + Sync {
    /// 在后台工作线程执行一次完整导入并等待结束
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 导入汇总（词典 ID、落库词条数、批次数）
    /// - Err: 格式不支持、名称冲突、解析或落库失败
    async fn import_async(&self, request: ImportRequest) -> ImportResult<ImportOutcome>;

    /// 并发导入多个词典
    ///
    /// # 说明
    /// - 每个词典独占一个阻塞工作线程
    /// - 单个词典失败不影响其他词典
    async fn batch_import(
        &self,
        requests: Vec<ImportRequest>,
    ) -> ImportResult<Vec<Result<ImportOutcome, String>>>;
}
