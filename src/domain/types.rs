// ==========================================
// 词典导入系统 - 领域类型定义
// ==========================================
// 职责: 词典源格式标签 / 导入生命周期状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 词典源格式 (Dictionary Format)
// ==========================================
// 序列化格式: 小写短标签 (与数据库 source_format 列一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryFormat {
    /// 通用表格 CSV (word/translation 列名别名识别)
    #[serde(rename = "csv")]
    GenericCsv,
    /// ECDICT 风格词汇 CSV (音标/词形变化/词频等)
    #[serde(rename = "ecdict")]
    LexicalCsv,
    /// JSON 数组或扁平对象
    Json,
    /// MDict 压缩容器
    Mdx,
    /// 无法识别
    Unknown,
}

impl DictionaryFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DictionaryFormat::GenericCsv => "csv",
            DictionaryFormat::LexicalCsv => "ecdict",
            DictionaryFormat::Json => "json",
            DictionaryFormat::Mdx => "mdx",
            DictionaryFormat::Unknown => "unknown",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "csv" => DictionaryFormat::GenericCsv,
            "ecdict" => DictionaryFormat::LexicalCsv,
            "json" => DictionaryFormat::Json,
            "mdx" => DictionaryFormat::Mdx,
            _ => DictionaryFormat::Unknown,
        }
    }
}

impl fmt::Display for DictionaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 导入状态 (Import Status)
// ==========================================
// 状态机: pending → importing → {completed | failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Importing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Importing => "importing",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ImportStatus::Pending),
            "importing" => Some(ImportStatus::Importing),
            "completed" => Some(ImportStatus::Completed),
            "failed" => Some(ImportStatus::Failed),
            _ => None,
        }
    }

    /// 终态之后不再发生迁移
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
