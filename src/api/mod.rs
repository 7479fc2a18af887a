// ==========================================
// 词典导入系统 - API 层
// ==========================================
// 职责: 提供调用方接口, 供 CLI 与上层服务调用
// ==========================================

pub mod dictionary_api;
pub mod error;

// 重导出核心类型
pub use dictionary_api::DictionaryApi;
pub use error::{ApiError, ApiResult};
