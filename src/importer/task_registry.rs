// ==========================================
// 词典导入系统 - 导入任务登记表
// ==========================================
// 职责: 进程内导入任务状态 (按词典 ID 索引)
// 约束:
// - 进度单调不减, 终态后不再变化
// - 仅为缓存, 进程重启后由 dictionary 表还原
// ==========================================

use crate::domain::import_task::ImportTask;
use crate::domain::types::ImportStatus;
use crate::importer::error::{ImportError, ImportResult};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct ImportTaskRegistry {
    tasks: Mutex<HashMap<i64, ImportTask>>,
}

impl ImportTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ImportResult<MutexGuard<'_, HashMap<i64, ImportTask>>> {
        self.tasks
            .lock()
            .map_err(|e| ImportError::InternalError(format!("任务登记表锁获取失败: {}", e)))
    }

    /// 登记新任务 (覆盖同 ID 的旧任务)
    pub fn register(&self, task: ImportTask) -> ImportResult<()> {
        self.lock()?.insert(task.dictionary_id, task);
        Ok(())
    }

    /// 更新运行中进度; 返回更新后的进度
    pub fn update_progress(
        &self,
        dictionary_id: i64,
        progress: f64,
        entry_count: u64,
    ) -> ImportResult<Option<f64>> {
        let mut tasks = self.lock()?;
        let Some(task) = tasks.get_mut(&dictionary_id) else {
            return Ok(None);
        };
        if task.status.is_terminal() {
            return Ok(Some(task.progress));
        }
        task.progress = task.progress.max(progress.clamp(0.0, 1.0));
        task.entry_count = task.entry_count.max(entry_count);
        Ok(Some(task.progress))
    }

    /// 批次落库后同步已落库数 (不改变进度)
    pub fn update_entry_count(&self, dictionary_id: i64, entry_count: u64) -> ImportResult<()> {
        if let Some(task) = self.lock()?.get_mut(&dictionary_id) {
            if !task.status.is_terminal() {
                task.entry_count = task.entry_count.max(entry_count);
            }
        }
        Ok(())
    }

    pub fn complete(&self, dictionary_id: i64, entry_count: u64) -> ImportResult<()> {
        if let Some(task) = self.lock()?.get_mut(&dictionary_id) {
            task.status = ImportStatus::Completed;
            task.progress = 1.0;
            task.entry_count = entry_count;
            task.error = None;
            task.finished_at = Some(Utc::now().naive_utc());
        }
        Ok(())
    }

    pub fn fail(&self, dictionary_id: i64, entry_count: u64, error: &str) -> ImportResult<()> {
        if let Some(task) = self.lock()?.get_mut(&dictionary_id) {
            task.status = ImportStatus::Failed;
            task.progress = 0.0;
            task.entry_count = entry_count;
            task.error = Some(error.to_string());
            task.finished_at = Some(Utc::now().naive_utc());
        }
        Ok(())
    }

    pub fn get(&self, dictionary_id: i64) -> ImportResult<Option<ImportTask>> {
        Ok(self.lock()?.get(&dictionary_id).cloned())
    }

    pub fn remove(&self, dictionary_id: i64) -> ImportResult<Option<ImportTask>> {
        Ok(self.lock()?.remove(&dictionary_id))
    }

    /// 全部任务 (按词典 ID 升序)
    pub fn list(&self) -> ImportResult<Vec<ImportTask>> {
        let mut tasks: Vec<ImportTask> = self.lock()?.values().cloned().collect();
        tasks.sort_by_key(|t| t.dictionary_id);
        Ok(tasks)
    }
}
