// ==========================================
// 词典导入系统 - 领域模型层
// ==========================================
// 职责: 定义词条、词典记录、导入任务等领域实体
// 红线: 不含数据访问逻辑, 不含解析逻辑
// ==========================================

pub mod dictionary;
pub mod import_task;
pub mod types;

// 重导出核心类型
pub use dictionary::{
    DictionaryEntry, DictionaryFileInfo, DictionaryRecord, DictionaryUpdate, NewDictionary,
    WordLookupHit,
};
pub use import_task::{ImportOutcome, ImportProgress, ImportRequest, ImportTask};
pub use types::{DictionaryFormat, ImportStatus};
