// ==========================================
// 词典导入系统 - 导入任务
// ==========================================
// 职责: 单次导入生命周期的可变记录 (按词典 ID 索引)
// 说明: 内存态仅为缓存, 持久状态以 dictionary 表为准
// ==========================================

use crate::domain::dictionary::DictionaryRecord;
use crate::domain::types::ImportStatus;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

// ==========================================
// ImportTask - 导入任务状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportTask {
    pub dictionary_id: i64,
    pub dictionary_name: String,
    /// 单次运行标识 (用于日志关联)
    pub run_id: String,
    pub status: ImportStatus,
    /// 进度 [0, 1]
    pub progress: f64,
    /// 已落库词条数 (非估计值)
    pub entry_count: u64,
    pub error: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
}

impl ImportTask {
    /// 新建处于 importing 状态的任务
    pub fn start(dictionary_id: i64, dictionary_name: &str) -> Self {
        Self {
            dictionary_id,
            dictionary_name: dictionary_name.to_string(),
            run_id: Uuid::new_v4().to_string(),
            status: ImportStatus::Importing,
            progress: 0.0,
            entry_count: 0,
            error: None,
            started_at: Some(Utc::now().naive_utc()),
            finished_at: None,
        }
    }

    /// 由持久记录还原任务视图 (进程重启后的回退路径)
    pub fn from_record(record: &DictionaryRecord) -> Self {
        let finished_at = if record.import_status.is_terminal() {
            Some(record.updated_at)
        } else {
            None
        };
        Self {
            dictionary_id: record.id,
            dictionary_name: record.name.clone(),
            run_id: String::new(),
            status: record.import_status,
            progress: record.import_progress,
            entry_count: record.entry_count,
            error: record.import_error.clone(),
            started_at: Some(record.created_at),
            finished_at,
        }
    }

    pub fn elapsed_ms(&self) -> Option<i64> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(|| Utc::now().naive_utc());
        Some((end - start).num_milliseconds())
    }
}

// ==========================================
// ImportProgress - 进度回调载荷
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub dictionary_id: i64,
    pub progress: f64,
    pub entry_count: u64,
}

// ==========================================
// ImportRequest - 导入请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub file_path: PathBuf,
    /// 词典名 (为空时取文件名主干)
    pub name: String,
    pub description: Option<String>,
    /// 缺省时使用配置的默认优先级
    pub priority: Option<i32>,
}

impl ImportRequest {
    pub fn new(file_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            name: name.into(),
            description: None,
            priority: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }
}

// ==========================================
// ImportOutcome - 成功导入的汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub dictionary_id: i64,
    pub dictionary_name: String,
    pub run_id: String,
    /// 实际落库词条数
    pub entry_count: u64,
    /// 落库批次数
    pub batches: u64,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_task() {
        let task = ImportTask::start(7, "ecdict");
        assert_eq!(task.status, ImportStatus::Importing);
        assert_eq!(task.progress, 0.0);
        assert_eq!(task.entry_count, 0);
        assert!(!task.run_id.is_empty());
        assert!(task.elapsed_ms().is_some());
    }

    #[test]
    fn test_request_builder() {
        let request = ImportRequest::new("/data/ecdict.csv", "ECDICT")
            .with_description("英汉词典")
            .with_priority(200);
        assert_eq!(request.name, "ECDICT");
        assert_eq!(request.description.as_deref(), Some("英汉词典"));
        assert_eq!(request.priority, Some(200));
    }
}
