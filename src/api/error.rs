// ==========================================
// 词典导入系统 - API层错误类型
// ==========================================
// 职责: 将导入层/数据访问层错误转换为面向调用方的错误分类
// ==========================================

use crate::importer::error::{ImportError, ImportErrorKind};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("名称冲突: {0}")]
    Conflict(String),

    #[error("文件格式不支持: {0}")]
    UnsupportedFormat(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("解码依赖不可用: {0}")]
    DependencyUnavailable(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::SerializationError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换 (按错误分类)
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err.kind() {
            ImportErrorKind::NotFound => ApiError::NotFound(err.to_string()),
            ImportErrorKind::Conflict => ApiError::Conflict(err.to_string()),
            ImportErrorKind::UnsupportedFormat => ApiError::UnsupportedFormat(err.to_string()),
            ImportErrorKind::MalformedInput | ImportErrorKind::Io => {
                ApiError::ImportError(err.to_string())
            }
            ImportErrorKind::DependencyUnavailable => {
                ApiError::DependencyUnavailable(err.to_string())
            }
            ImportErrorKind::PersistenceFailure => match err {
                ImportError::Persistence(repo_err) => ApiError::from(repo_err),
                other => ApiError::DatabaseError(other.to_string()),
            },
            ImportErrorKind::Internal => ApiError::InternalError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
