// ==========================================
// 词典导入系统 - 词典实体
// ==========================================
// 职责: 词条 / 源文件描述 / 词典记录 / 查词结果
// 红线: 词条 word 与 translation 必须非空 (trim 后)
// ==========================================

use crate::domain::types::{DictionaryFormat, ImportStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// DictionaryEntry - 规范化词条
// ==========================================
// 由解析器产出, 所有权交给导入编排器批量落库
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub word: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_uk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_us: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    /// 柯林斯星级 (1-5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collins_star: Option<u8>,
    /// 牛津核心词汇
    #[serde(default)]
    pub oxford_core: bool,
    /// 大写标签集合 (CET4 / GRE / ...)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_rank_bnc: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_rank_modern: Option<u32>,
    /// 词形变化: past/done/ing/third/comparative/superlative/plural/lemma → 词形
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub morphology: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl DictionaryEntry {
    /// 创建词条, word 或 translation 在 trim 后为空则返回 None
    pub fn new(word: &str, translation: &str) -> Option<Self> {
        let word = word.trim();
        let translation = translation.trim();
        if word.is_empty() || translation.is_empty() {
            return None;
        }
        Some(Self {
            word: word.to_string(),
            translation: translation.to_string(),
            ..Default::default()
        })
    }

    /// 设置柯林斯星级, 超出 1-5 的值被忽略
    pub fn set_collins_star(&mut self, star: u32) {
        if (1..=5).contains(&star) {
            self.collins_star = Some(star as u8);
        }
    }
}

// ==========================================
// DictionaryFileInfo - 候选源文件描述
// ==========================================
// 按需从文件系统计算, 不缓存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryFileInfo {
    /// 绝对路径
    pub path: String,
    /// 显示名 (文件名)
    pub name: String,
    pub format: DictionaryFormat,
    /// 编码标签 (encoding_rs 名称, 如 UTF-8 / gb18030)
    pub encoding: String,
    /// 字节数
    pub size: u64,
    pub size_mb: f64,
}

// ==========================================
// NewDictionary - 创建词典记录参数
// ==========================================
#[derive(Debug, Clone)]
pub struct NewDictionary {
    pub name: String,
    pub source_format: DictionaryFormat,
    pub description: Option<String>,
    pub source_file: String,
    pub file_size: u64,
    pub priority: i32,
    pub import_status: ImportStatus,
    pub import_progress: f64,
}

// ==========================================
// DictionaryRecord - 持久化词典记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub source_format: DictionaryFormat,
    pub source_file: Option<String>,
    pub file_size: u64,
    pub entry_count: u64,
    pub priority: i32,
    pub enabled: bool,
    pub import_status: ImportStatus,
    pub import_progress: f64,
    pub import_error: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// DictionaryUpdate - 可修改字段
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
}

impl DictionaryUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.enabled.is_none()
    }
}

// ==========================================
// WordLookupHit - 跨词典查词结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordLookupHit {
    pub dictionary_id: i64,
    pub dictionary_name: String,
    pub priority: i32,
    pub entry: DictionaryEntry,
}
