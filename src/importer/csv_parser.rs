// ==========================================
// 词典导入系统 - 通用 CSV 解析器
// ==========================================
// 支持的列名（不区分大小写, 首个匹配列生效）:
// - word/单词/英文/english: 单词
// - translation/翻译/中文/释义/chinese/meaning: 翻译
// - phonetic/音标/pronunciation: 音标
// - definition/英文释义/english_definition: 英文释义
// ==========================================

use crate::domain::dictionary::DictionaryEntry;
use crate::domain::types::DictionaryFormat;
use crate::importer::data_cleaner::normalize_null;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::parser_trait::{DictionaryParser, EntryStream, FuseOnError};
use crate::importer::text_decoder::DecodingReader;
use csv::{ReaderBuilder, StringRecord};
use encoding_rs::Encoding;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

const WORD_COLUMNS: [&str; 4] = ["word", "单词", "英文", "english"];
const TRANSLATION_COLUMNS: [&str; 6] = ["translation", "翻译", "中文", "释义", "chinese", "meaning"];
const PHONETIC_COLUMNS: [&str; 3] = ["phonetic", "音标", "pronunciation"];
const DEFINITION_COLUMNS: [&str; 3] = ["definition", "英文释义", "english_definition"];

pub(crate) type DecodedCsvReader = csv::Reader<DecodingReader<File>>;

/// 以指定编码打开 CSV (首行为表头, 允许行长度不一致)
pub(crate) fn open_csv_reader(
    path: &Path,
    encoding: &'static Encoding,
) -> ImportResult<DecodedCsvReader> {
    let file = File::open(path)?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(DecodingReader::new(file, encoding)))
}

/// 读取表头 (TRIM)
pub(crate) fn read_headers(reader: &mut DecodedCsvReader) -> ImportResult<Vec<String>> {
    Ok(reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect())
}

/// 记录流: I/O 错误致命, 其余坏行告警跳过
pub(crate) fn record_stream<'a, F>(
    reader: DecodedCsvReader,
    format: DictionaryFormat,
    mut build: F,
) -> EntryStream<'a>
where
    F: FnMut(&StringRecord) -> Option<DictionaryEntry> + Send + 'a,
{
    let stream = reader
        .into_records()
        .filter_map(move |result| match result {
            Ok(record) => build(&record).map(Ok),
            Err(e) if e.is_io_error() => Some(Err(ImportError::from(e))),
            Err(e) => {
                warn!(format = %format, error = %e, "跳过无法解析的 CSV 行");
                None
            }
        });
    Box::new(FuseOnError::new(stream))
}

/// 行数估计: 换行数 (末行无换行也计入) 减去表头
pub(crate) fn estimate_csv_rows(path: &Path) -> ImportResult<u64> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; 64 * 1024];
    let mut lines = 0u64;
    let mut last_byte = None;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        lines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
        last_byte = Some(buf[n - 1]);
    }
    if matches!(last_byte, Some(b) if b != b'\n') {
        lines += 1;
    }
    Ok(lines.saturating_sub(1))
}

pub(crate) fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
}

// ==========================================
// 列映射
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GenericColumns {
    word: usize,
    translation: usize,
    phonetic: Option<usize>,
    definition: Option<usize>,
}

impl GenericColumns {
    /// 逐列匹配别名: 每列只担任一个角色 (单词 > 翻译 > 音标 > 释义), 同一角色后出现的列覆盖先出现的
    fn detect(headers: &[String]) -> ImportResult<Self> {
        let (mut word, mut translation, mut phonetic, mut definition) = (None, None, None, None);
        for (idx, header) in headers.iter().enumerate() {
            let name = header.trim().to_lowercase();
            let name = name.as_str();
            if WORD_COLUMNS.contains(&name) {
                word = Some(idx);
            } else if TRANSLATION_COLUMNS.contains(&name) {
                translation = Some(idx);
            } else if PHONETIC_COLUMNS.contains(&name) {
                phonetic = Some(idx);
            } else if DEFINITION_COLUMNS.contains(&name) {
                definition = Some(idx);
            }
        }

        match (word, translation) {
            (Some(word), Some(translation)) => Ok(Self {
                word,
                translation,
                phonetic,
                definition,
            }),
            _ => Err(ImportError::malformed(
                DictionaryFormat::GenericCsv.as_str(),
                format!("CSV 文件必须包含单词和翻译列, 实际表头: [{}]", headers.join(", ")),
            )),
        }
    }

    fn build_entry(&self, record: &StringRecord) -> Option<DictionaryEntry> {
        let mut entry = DictionaryEntry::new(
            record.get(self.word).unwrap_or_default(),
            record.get(self.translation).unwrap_or_default(),
        )?;
        entry.phonetic_uk = normalize_null(field(record, self.phonetic));
        entry.definition = normalize_null(field(record, self.definition));
        Some(entry)
    }
}

// ==========================================
// GenericCsvParser
// ==========================================
pub struct GenericCsvParser {
    path: PathBuf,
    encoding: &'static Encoding,
}

impl GenericCsvParser {
    pub fn new(path: impl Into<PathBuf>, encoding: &'static Encoding) -> Self {
        Self {
            path: path.into(),
            encoding,
        }
    }
}

impl DictionaryParser for GenericCsvParser {
    fn format(&self) -> DictionaryFormat {
        DictionaryFormat::GenericCsv
    }

    fn parse(&self) -> ImportResult<EntryStream<'_>> {
        let mut reader = open_csv_reader(&self.path, self.encoding)?;
        let headers = read_headers(&mut reader)?;
        let columns = GenericColumns::detect(&headers)?;
        Ok(record_stream(reader, self.format(), move |record| {
            columns.build_entry(record)
        }))
    }

    fn estimate_total_count(&self) -> ImportResult<u64> {
        estimate_csv_rows(&self.path)
    }
}
