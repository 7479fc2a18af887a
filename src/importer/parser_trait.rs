// ==========================================
// 词典导入系统 - 解析器接口
// ==========================================
// 职责: 定义各格式解析器的统一契约（不包含实现）
// 约定:
// - parse() 返回有限、单遍的惰性序列; 再次调用从头重新打开源文件
// - 序列中的 Err 表示结构性致命错误, 之后序列结束
// - 单行/单条坏数据在解析器内部跳过, 不以 Err 形式出现
// ==========================================

use crate::domain::dictionary::DictionaryEntry;
use crate::domain::types::DictionaryFormat;
use crate::importer::error::ImportResult;

/// 词条惰性序列
pub type EntryStream<'a> = Box<dyn Iterator<Item = ImportResult<DictionaryEntry>> + Send + 'a>;

// ==========================================
// DictionaryParser Trait
// ==========================================
// 实现者: GenericCsvParser, LexicalCsvParser, JsonParser, MdxParser
pub trait DictionaryParser: Send + Sync {
    /// 解析器对应的格式
    fn format(&self) -> DictionaryFormat;

    /// 打开源文件并返回词条序列
    ///
    /// # 返回
    /// - Ok(stream): 序列; 元素为 Err 时表示致命错误
    /// - Err: 打开阶段的结构性错误 (如缺少必需列)
    fn parse(&self) -> ImportResult<EntryStream<'_>>;

    /// 快速估计词条总数 (仅用于进度计算, 可为近似上界)
    fn estimate_total_count(&self) -> ImportResult<u64>;

    /// 预览前 n 条 (至多消费 n 个元素)
    fn preview(&self, n: usize) -> ImportResult<Vec<DictionaryEntry>> {
        self.parse()?.take(n).collect()
    }
}

/// 首个致命错误后终止的序列适配器
pub(crate) struct FuseOnError<I> {
    inner: I,
    failed: bool,
}

impl<I> FuseOnError<I> {
    pub(crate) fn new(inner: I) -> Self {
        Self {
            inner,
            failed: false,
        }
    }
}

impl<I> Iterator for FuseOnError<I>
where
    I: Iterator<Item = ImportResult<DictionaryEntry>>,
{
    type Item = ImportResult<DictionaryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.inner.next()?;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}
