// ==========================================
// 词典导入系统 - ECDICT 词汇 CSV 解析器
// ==========================================
// 列: word, phonetic, definition, translation, pos, collins, oxford,
//     tag, bnc, frq, exchange
// 规则:
// - collins / bnc / frq 仅在纯数字时解析
// - oxford 以字符串 "1" 判定核心词汇
// - tag 空白分隔, 转大写
// - exchange 形如 p:went/d:gone/i:going/3:goes
// ==========================================

use crate::domain::dictionary::DictionaryEntry;
use crate::domain::types::DictionaryFormat;
use crate::importer::csv_parser::{
    estimate_csv_rows, field, open_csv_reader, read_headers, record_stream,
};
use crate::importer::data_cleaner::{normalize_null, parse_digits, parse_exchange, split_tags};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::parser_trait::{DictionaryParser, EntryStream};
use csv::StringRecord;
use encoding_rs::Encoding;
use std::path::PathBuf;

const OXFORD_CORE_FLAG: &str = "1";

#[derive(Debug, Clone, Copy, Default)]
struct LexicalColumns {
    word: usize,
    translation: usize,
    phonetic: Option<usize>,
    definition: Option<usize>,
    pos: Option<usize>,
    collins: Option<usize>,
    oxford: Option<usize>,
    tag: Option<usize>,
    bnc: Option<usize>,
    frq: Option<usize>,
    exchange: Option<usize>,
}

impl LexicalColumns {
    fn detect(headers: &[String]) -> ImportResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));

        let (word, translation) = match (find("word"), find("translation")) {
            (Some(w), Some(t)) => (w, t),
            _ => {
                return Err(ImportError::malformed(
                    DictionaryFormat::LexicalCsv.as_str(),
                    "缺少 word 或 translation 列",
                ))
            }
        };

        Ok(Self {
            word,
            translation,
            phonetic: find("phonetic"),
            definition: find("definition"),
            pos: find("pos"),
            collins: find("collins"),
            oxford: find("oxford"),
            tag: find("tag"),
            bnc: find("bnc"),
            frq: find("frq"),
            exchange: find("exchange"),
        })
    }

    fn build_entry(&self, record: &StringRecord) -> Option<DictionaryEntry> {
        let mut entry = DictionaryEntry::new(
            record.get(self.word).unwrap_or_default(),
            record.get(self.translation).unwrap_or_default(),
        )?;

        entry.phonetic_uk = normalize_null(field(record, self.phonetic));
        entry.definition = normalize_null(field(record, self.definition));
        entry.part_of_speech = normalize_null(field(record, self.pos));

        if let Some(star) = field(record, self.collins).and_then(parse_digits) {
            entry.set_collins_star(star);
        }
        entry.oxford_core = field(record, self.oxford)
            .map(|v| v.trim() == OXFORD_CORE_FLAG)
            .unwrap_or(false);
        if let Some(tags) = field(record, self.tag) {
            entry.tags = split_tags(tags);
        }
        entry.frequency_rank_bnc = field(record, self.bnc).and_then(parse_digits);
        entry.frequency_rank_modern = field(record, self.frq).and_then(parse_digits);
        if let Some(exchange) = field(record, self.exchange) {
            entry.morphology = parse_exchange(exchange.trim());
        }
        Some(entry)
    }
}

// ==========================================
// LexicalCsvParser
// ==========================================
pub struct LexicalCsvParser {
    path: PathBuf,
    encoding: &'static Encoding,
}

impl LexicalCsvParser {
    pub fn new(path: impl Into<PathBuf>, encoding: &'static Encoding) -> Self {
        Self {
            path: path.into(),
            encoding,
        }
    }
}

impl DictionaryParser for LexicalCsvParser {
    fn format(&self) -> DictionaryFormat {
        DictionaryFormat::LexicalCsv
    }

    fn parse(&self) -> ImportResult<EntryStream<'_>> {
        let mut reader = open_csv_reader(&self.path, self.encoding)?;
        let headers = read_headers(&mut reader)?;
        let columns = LexicalColumns::detect(&headers)?;
        Ok(record_stream(reader, self.format(), move |record| {
            columns.build_entry(record)
        }))
    }

    fn estimate_total_count(&self) -> ImportResult<u64> {
        estimate_csv_rows(&self.path)
    }
}
