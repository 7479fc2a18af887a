// ==========================================
// 词典导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: NotFound / Conflict / UnsupportedFormat / MalformedInput /
//       DependencyUnavailable / PersistenceFailure
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 资源不存在 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("词典不存在: id={0}")]
    DictionaryNotFound(i64),

    // ===== 冲突 =====
    #[error("词典 '{0}' 已存在")]
    DuplicateName(String),

    // ===== 格式错误 =====
    #[error("文件格式不支持: {0}（仅支持 .csv/.json/.mdx）")]
    UnsupportedFormat(String),

    #[error("文件内容格式错误 ({format}): {message}")]
    MalformedInput { format: String, message: String },

    #[error("解码依赖不可用: {0}")]
    DependencyUnavailable(String),

    // ===== 持久化错误 =====
    #[error("词条落库失败: {0}")]
    Persistence(#[from] RepositoryError),

    // ===== I/O =====
    #[error("文件读取失败: {0}")]
    FileReadError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 错误分类 (供调用方分支处理)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportErrorKind {
    NotFound,
    Conflict,
    UnsupportedFormat,
    MalformedInput,
    DependencyUnavailable,
    PersistenceFailure,
    Io,
    Internal,
}

impl ImportError {
    pub fn malformed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImportError::MalformedInput {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ImportErrorKind {
        match self {
            ImportError::FileNotFound(_) | ImportError::DictionaryNotFound(_) => {
                ImportErrorKind::NotFound
            }
            ImportError::DuplicateName(_) => ImportErrorKind::Conflict,
            ImportError::UnsupportedFormat(_) => ImportErrorKind::UnsupportedFormat,
            ImportError::MalformedInput { .. } => ImportErrorKind::MalformedInput,
            ImportError::DependencyUnavailable(_) => ImportErrorKind::DependencyUnavailable,
            ImportError::Persistence(_) => ImportErrorKind::PersistenceFailure,
            ImportError::FileReadError(_) => ImportErrorKind::Io,
            ImportError::InternalError(_) | ImportError::Other(_) => ImportErrorKind::Internal,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ImportError::FileNotFound(err.to_string()),
            _ => ImportError::FileReadError(err.to_string()),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            return ImportError::FileReadError(err.to_string());
        }
        ImportError::malformed("csv", err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return ImportError::FileReadError(err.to_string());
        }
        ImportError::malformed("json", err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
