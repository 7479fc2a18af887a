// ==========================================
// 词典导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 多格式词典解析与批量入库
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 格式识别与解析
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能埋点
pub mod perf;

// 国际化
pub mod i18n;

// API 层 - 调用方接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DictionaryFormat, ImportStatus};

// 领域实体
pub use domain::{
    DictionaryEntry, DictionaryFileInfo, DictionaryRecord, DictionaryUpdate, ImportOutcome,
    ImportProgress, ImportRequest, ImportTask, WordLookupHit,
};

// 导入层
pub use importer::{
    DictionaryImporter, DictionaryImporterImpl, DictionaryParser, FormatDetector, ImportError,
    ImportErrorKind, ImportResult, ImportTaskRegistry, ParserFactory,
};

// 仓储层
pub use repository::{DictionaryRepository, SqliteDictionaryRepository};

// 配置
pub use config::{ConfigManager, ImportSettings};

// API
pub use api::{ApiError, ApiResult, DictionaryApi};

// ==========================================
// 系统常量
// ==========================================

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 系统名称
pub const SYSTEM_NAME: &str = "词典导入系统";
