// ==========================================
// 词典导入系统 - MDX 解析器
// ==========================================
// 流程: 容器索引 (首次使用时加载) → 逐块读取记录 → HTML 清洗
// 规则:
// - 翻译 = 清洗后文本, 截断到配置的最大字符数
// - 音标 = 从原始 HTML 尽力提取
// - 词头或清洗后文本为空的记录跳过
// ==========================================

use crate::config::config_manager::config_defaults;
use crate::domain::dictionary::DictionaryEntry;
use crate::domain::types::DictionaryFormat;
use crate::importer::data_cleaner::{truncate_chars, DataCleaner};
use crate::importer::error::ImportResult;
use crate::importer::mdict_reader::{MdictIndex, MdictReader, MdictRecord, MdictRecords};
use crate::importer::parser_trait::{DictionaryParser, EntryStream, FuseOnError};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::debug;

pub struct MdxParser {
    path: PathBuf,
    translation_max_chars: usize,
    cleaner: DataCleaner,
    index: OnceLock<Arc<MdictIndex>>,
}

impl MdxParser {
    pub fn new(path: impl Into<PathBuf>) -> ImportResult<Self> {
        Self::with_max_chars(path, config_defaults::TRANSLATION_MAX_CHARS)
    }

    pub fn with_max_chars(path: impl Into<PathBuf>, translation_max_chars: usize) -> ImportResult<Self> {
        Ok(Self {
            path: path.into(),
            translation_max_chars,
            cleaner: DataCleaner::new()?,
            index: OnceLock::new(),
        })
    }

    /// 容器索引 (首次调用时读取, 之后复用)
    fn index(&self) -> ImportResult<Arc<MdictIndex>> {
        if let Some(index) = self.index.get() {
            return Ok(Arc::clone(index));
        }
        let loaded = Arc::new(MdictReader::open_index(&self.path)?);
        debug!(
            path = %self.path.display(),
            entries = loaded.num_entries(),
            record_blocks = loaded.record_blocks.len(),
            "MDX 索引加载完成"
        );
        Ok(Arc::clone(self.index.get_or_init(|| loaded)))
    }

    /// 词典标题 (来自容器头部)
    pub fn title(&self) -> ImportResult<String> {
        Ok(self.index()?.header.title.clone())
    }

    fn build_entry(&self, record: MdictRecord) -> Option<DictionaryEntry> {
        let cleaned = self.cleaner.clean_html(&record.content);
        let translation = truncate_chars(&cleaned, self.translation_max_chars);
        let mut entry = DictionaryEntry::new(&record.headword, &translation)?;
        entry.phonetic_uk = self.cleaner.extract_phonetic(&record.content);
        Some(entry)
    }
}

impl DictionaryParser for MdxParser {
    fn format(&self) -> DictionaryFormat {
        DictionaryFormat::Mdx
    }

    fn parse(&self) -> ImportResult<EntryStream<'_>> {
        let records = MdictRecords::open(&self.path, self.index()?)?;
        let stream = records.filter_map(move |result| match result {
            Ok(record) => self.build_entry(record).map(Ok),
            Err(e) => Some(Err(e)),
        });
        Ok(Box::new(FuseOnError::new(stream)))
    }

    fn estimate_total_count(&self) -> ImportResult<u64> {
        Ok(self.index()?.num_entries() as u64)
    }
}
