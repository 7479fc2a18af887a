// ==========================================
// 词典导入系统 - 数据清洗器
// ==========================================
// 职责: TRIM / NULL 标准化 / 数字字段防御式解析 / 标签拆分 /
//       词形变化解码 / HTML 去标签 / 音标提取
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// IPA 专用字符集 (用于判断候选串是否像音标)
pub const IPA_MARKERS: &str = "əɪʊæɑɔʌɛɜːˈˌ";

/// 词形变化代码表
const EXCHANGE_CODES: [(&str, &str); 9] = [
    ("p", "past"),
    ("d", "done"),
    ("i", "ing"),
    ("3", "third"),
    ("r", "comparative"),
    ("t", "superlative"),
    ("s", "plural"),
    ("0", "lemma"),
    ("1", "lemma"),
];

/// HTML 实体替换表 (&amp; 最后处理, 避免二次解码)
const HTML_ENTITIES: [(&str, &str); 5] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&amp;", "&"),
];

// ==========================================
// 纯文本工具
// ==========================================

/// TRIM 后为空则返回 None
pub fn normalize_null(value: Option<&str>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// 仅当字段全部为 ASCII 数字时解析
pub fn parse_digits(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u32>().ok()
}

/// 空白分隔的标签串 → 大写标签集合
pub fn split_tags(value: &str) -> BTreeSet<String> {
    value
        .split_whitespace()
        .map(|t| t.to_uppercase())
        .collect()
}

/// 词形代码 → 规范名称; 未知代码原样返回
pub fn morphology_name(code: &str) -> String {
    EXCHANGE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// 解码 `code:form/code:form` 词形变化串
///
/// - 不含 `:` 的片段被忽略
/// - 同一规范名重复出现时后者覆盖前者
pub fn parse_exchange(value: &str) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    for part in value.split('/') {
        if let Some((code, form)) = part.split_once(':') {
            result.insert(morphology_name(code.trim()), form.trim().to_string());
        }
    }
    result
}

/// 按字符截断
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

fn has_ipa_marker(candidate: &str) -> bool {
    candidate.chars().any(|c| IPA_MARKERS.contains(c))
}

// ==========================================
// DataCleaner - HTML 词条内容清洗
// ==========================================
pub struct DataCleaner {
    tag_pattern: Regex,
    whitespace_pattern: Regex,
    phonetic_patterns: Vec<Regex>,
}

impl DataCleaner {
    pub fn new() -> ImportResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ImportError::InternalError(format!("正则编译失败 {}: {}", pattern, e)))
        };

        Ok(Self {
            tag_pattern: compile(r"<[^>]+>")?,
            whitespace_pattern: compile(r"\s+")?,
            phonetic_patterns: vec![
                compile(r"\[([^\]]+)\]")?,
                compile(r"/([^/]+)/")?,
                compile(r"【([^】]+)】")?,
            ],
        })
    }

    /// 去除 HTML 标签, 解码常见实体, 压缩空白
    pub fn clean_html(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }
        let mut text = self.tag_pattern.replace_all(html, " ").into_owned();
        for (entity, replacement) in HTML_ENTITIES {
            if text.contains(entity) {
                text = text.replace(entity, replacement);
            }
        }
        self.whitespace_pattern
            .replace_all(&text, " ")
            .trim()
            .to_string()
    }

    /// 尽力提取音标: 依次尝试 [..] /../ 【..】, 取第一个含 IPA 字符的候选
    pub fn extract_phonetic(&self, content: &str) -> Option<String> {
        for pattern in &self.phonetic_patterns {
            for caps in pattern.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    let candidate = m.as_str().trim();
                    if has_ipa_marker(candidate) {
                        return Some(candidate.to_string());
                    }
                }
            }
        }
        None
    }
}
