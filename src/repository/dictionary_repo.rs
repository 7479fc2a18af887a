// ==========================================
// 词典导入系统 - 词典仓储 Trait
// ==========================================
// 职责: 定义导入编排器依赖的持久化接口（不包含实现）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::dictionary::{
    DictionaryEntry, DictionaryRecord, DictionaryUpdate, NewDictionary, WordLookupHit,
};
use crate::domain::types::ImportStatus;
use crate::repository::error::RepositoryResult;

/// 导入进度写入参数
#[derive(Debug, Clone, PartialEq)]
pub struct ImportProgressUpdate {
    pub progress: f64,
    pub status: ImportStatus,
    /// None 表示保持原值
    pub entry_count: Option<u64>,
    /// None 表示清空错误信息
    pub error: Option<String>,
}

impl ImportProgressUpdate {
    pub fn running(progress: f64, entry_count: u64) -> Self {
        Self {
            progress,
            status: ImportStatus::Importing,
            entry_count: Some(entry_count),
            error: None,
        }
    }

    pub fn completed(entry_count: u64) -> Self {
        Self {
            progress: 1.0,
            status: ImportStatus::Completed,
            entry_count: Some(entry_count),
            error: None,
        }
    }

    pub fn failed(entry_count: u64, error: impl Into<String>) -> Self {
        Self {
            progress: 0.0,
            status: ImportStatus::Failed,
            entry_count: Some(entry_count),
            error: Some(error.into()),
        }
    }
}

// ==========================================
// DictionaryRepository Trait
// ==========================================
// 用途: 词典记录与词条的持久化网关
// 实现者: SqliteDictionaryRepository
// 约束: 实现方自行串行化写入 (Send + Sync)
pub trait DictionaryRepository: Send + Sync {
    /// 按名称查找词典
    fn find_by_name(&self, name: &str) -> RepositoryResult<Option<DictionaryRecord>>;

    /// 创建词典记录, 返回新 ID
    fn create_dictionary(&self, dictionary: &NewDictionary) -> RepositoryResult<i64>;

    /// 批量写入词条 (单事务), 返回写入条数
    fn insert_entries_batch(
        &self,
        dictionary_id: i64,
        entries: &[DictionaryEntry],
    ) -> RepositoryResult<usize>;

    /// 更新导入状态/进度
    fn update_import_progress(
        &self,
        dictionary_id: i64,
        update: &ImportProgressUpdate,
    ) -> RepositoryResult<()>;

    /// 删除词典及其词条, 返回删除的词典记录数
    fn delete_dictionary(&self, dictionary_id: i64) -> RepositoryResult<usize>;

    /// 跨启用词典查词 (大小写不敏感, 按优先级降序)
    fn lookup_word(&self, word: &str) -> RepositoryResult<Vec<WordLookupHit>>;

    fn get_dictionary_by_id(&self, dictionary_id: i64)
        -> RepositoryResult<Option<DictionaryRecord>>;

    fn get_all_dictionaries(&self, enabled_only: bool) -> RepositoryResult<Vec<DictionaryRecord>>;

    /// 更新可修改字段, 返回受影响行数
    fn update_dictionary(
        &self,
        dictionary_id: i64,
        update: &DictionaryUpdate,
    ) -> RepositoryResult<usize>;

    /// 统计词典下实际词条数
    fn count_entries(&self, dictionary_id: i64) -> RepositoryResult<u64>;
}
