// ==========================================
// 词典导入系统 - JSON 解析器
// ==========================================
// 支持两种形态:
// 1. 数组: [{"word": "hello", "translation": "你好", ...}, ...]
// 2. 扁平对象: {"hello": "你好", "world": {"trans": "世界"}, ...}
// 说明: 整个文件一次性载入内存, 总数即集合长度
// ==========================================

use crate::domain::dictionary::DictionaryEntry;
use crate::domain::types::DictionaryFormat;
use crate::importer::data_cleaner::{morphology_name, normalize_null, parse_exchange, split_tags};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::parser_trait::{DictionaryParser, EntryStream};
use crate::importer::text_decoder::read_to_string_lossy;
use encoding_rs::Encoding;
use serde_json::{Map, Value};
use std::path::PathBuf;

pub struct JsonParser {
    path: PathBuf,
    encoding: &'static Encoding,
}

impl JsonParser {
    pub fn new(path: impl Into<PathBuf>, encoding: &'static Encoding) -> Self {
        Self {
            path: path.into(),
            encoding,
        }
    }

    fn load(&self) -> ImportResult<Value> {
        let text = read_to_string_lossy(&self.path, self.encoding)?;
        let value: Value = serde_json::from_str(&text)?;
        match value {
            Value::Array(_) | Value::Object(_) => Ok(value),
            other => Err(ImportError::malformed(
                DictionaryFormat::Json.as_str(),
                format!("顶层必须是数组或对象, 实际为 {}", json_type_name(&other)),
            )),
        }
    }
}

impl DictionaryParser for JsonParser {
    fn format(&self) -> DictionaryFormat {
        DictionaryFormat::Json
    }

    fn parse(&self) -> ImportResult<EntryStream<'_>> {
        match self.load()? {
            Value::Array(items) => Ok(Box::new(items.into_iter().filter_map(|item| {
                let object = item.as_object()?;
                let word = object.get("word").and_then(Value::as_str)?;
                entry_from_object(word, object).map(Ok)
            }))),
            Value::Object(map) => Ok(Box::new(map.into_iter().filter_map(|(word, value)| {
                match &value {
                    Value::String(translation) => DictionaryEntry::new(&word, translation).map(Ok),
                    Value::Object(object) => entry_from_object(&word, object).map(Ok),
                    _ => None,
                }
            }))),
            _ => Ok(Box::new(std::iter::empty())),
        }
    }

    fn estimate_total_count(&self) -> ImportResult<u64> {
        Ok(match self.load()? {
            Value::Array(items) => items.len() as u64,
            Value::Object(map) => map.len() as u64,
            _ => 0,
        })
    }
}

/// 由对象构造词条: 翻译取 translation, 该键不存在时取 trans; 复制可识别字段
///
/// translation 存在但为空或非字符串时整条跳过, 不再回退 trans
fn entry_from_object(word: &str, object: &Map<String, Value>) -> Option<DictionaryEntry> {
    let translation = object
        .get("translation")
        .or_else(|| object.get("trans"))
        .and_then(Value::as_str)?;
    let mut entry = DictionaryEntry::new(word, translation)?;

    let text = |key: &str| normalize_null(object.get(key).and_then(Value::as_str));

    // phonetic_uk 优先于裸 phonetic
    entry.phonetic_uk = text("phonetic_uk").or_else(|| text("phonetic"));
    entry.phonetic_us = text("phonetic_us");
    entry.part_of_speech = text("pos");
    entry.definition = text("definition");

    match object.get("exchange") {
        Some(Value::String(s)) => entry.morphology = parse_exchange(s),
        Some(Value::Object(forms)) => {
            entry.morphology = forms
                .iter()
                .filter_map(|(kind, form)| {
                    let form = form.as_str()?.trim();
                    (!form.is_empty()).then(|| (morphology_name(kind.trim()), form.to_string()))
                })
                .collect();
        }
        _ => {}
    }

    match object.get("tags") {
        Some(Value::String(s)) => entry.tags = split_tags(s),
        Some(Value::Array(items)) => {
            entry.tags = items
                .iter()
                .filter_map(Value::as_str)
                .flat_map(|t| split_tags(t).into_iter())
                .collect();
        }
        _ => {}
    }

    match object.get("examples") {
        Some(Value::String(s)) if !s.trim().is_empty() => entry.examples = vec![s.trim().to_string()],
        Some(Value::Array(items)) => {
            entry.examples = items
                .iter()
                .filter_map(|v| normalize_null(v.as_str()))
                .collect();
        }
        _ => {}
    }

    Some(entry)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
