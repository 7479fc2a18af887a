// ==========================================
// 词典导入系统 - 导入层
// ==========================================
// 职责: 格式识别, 流式解析, 分批落库, 进度跟踪
// 支持: 通用 CSV, ECDICT CSV, JSON, MDX
// ==========================================

// 模块声明
pub mod csv_parser;
pub mod data_cleaner;
pub mod dictionary_importer_impl;
pub mod dictionary_importer_trait;
pub mod ecdict_parser;
pub mod error;
pub mod file_parser;
pub mod format_detector;
pub mod json_parser;
pub mod mdict_reader;
pub mod mdx_parser;
pub mod parser_trait;
pub mod task_registry;
pub mod text_decoder;

// 重导出核心类型
pub use csv_parser::GenericCsvParser;
pub use data_cleaner::DataCleaner;
pub use dictionary_importer_impl::{DictionaryImporterImpl, PreparedImport, ProgressCallback};
pub use ecdict_parser::LexicalCsvParser;
pub use error::{ImportError, ImportErrorKind, ImportResult};
pub use file_parser::{FormatParser, ParserFactory};
pub use format_detector::FormatDetector;
pub use json_parser::JsonParser;
pub use mdx_parser::MdxParser;
pub use task_registry::ImportTaskRegistry;

// 重导出 Trait 接口
pub use dictionary_importer_trait::DictionaryImporter;
pub use parser_trait::{DictionaryParser, EntryStream};
