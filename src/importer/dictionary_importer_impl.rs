// ==========================================
// 词典导入系统 - 词典导入编排器实现
// ==========================================
// 状态机: pending → importing → {completed | failed}
// 流程: 文件信息 → 名称唯一性 → 建档 + 登记任务 → 估计总数
//       → 分批落库 (batch_size) → 按间隔上报进度 (progress_interval)
//       → 收尾 (completed, 1.0) / 失败 (failed, 0.0, 错误信息)
// 约束:
// - 单次导入内解析与落库严格串行, 词条按解析顺序落库
// - 运行中进度上限 max_running_progress, 仅收尾时为 1.0
// - 已落库批次失败时不回滚
// ==========================================

use crate::config::ImportSettings;
use crate::domain::dictionary::{DictionaryEntry, DictionaryFileInfo, NewDictionary};
use crate::domain::import_task::{ImportOutcome, ImportProgress, ImportRequest, ImportTask};
use crate::domain::types::{DictionaryFormat, ImportStatus};
use crate::importer::dictionary_importer_trait::DictionaryImporter;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::ParserFactory;
use crate::importer::format_detector::FormatDetector;
use crate::importer::parser_trait::DictionaryParser;
use crate::importer::task_registry::ImportTaskRegistry;
use crate::perf::PerfGuard;
use crate::repository::{DictionaryRepository, ImportProgressUpdate, RepositoryError};
use async_trait::async_trait;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// 进度回调 (运行中按间隔调用, 收尾时以 1.0 调用一次)
pub type ProgressCallback = Arc<dyn Fn(ImportProgress) + Send + Sync>;

/// 已建档、待执行的导入
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub dictionary_id: i64,
    pub dictionary_name: String,
    pub run_id: String,
    pub file: DictionaryFileInfo,
}

/// 单次运行的累计计数
#[derive(Debug, Default, Clone, Copy)]
struct RunCounters {
    persisted: u64,
    batches: u64,
    last_reported: u64,
}

// ==========================================
// DictionaryImporterImpl - 导入编排器
// ==========================================
pub struct DictionaryImporterImpl<R>
where
    R: DictionaryRepository,
{
    repo: Arc<R>,
    registry: Arc<ImportTaskRegistry>,
    settings: ImportSettings,
}

impl<R> Clone for DictionaryImporterImpl<R>
where
    R: DictionaryRepository,
{
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            registry: Arc::clone(&self.registry),
            settings: self.settings,
        }
    }
}

impl<R> DictionaryImporterImpl<R>
where
    R: DictionaryRepository + 'static,
{
    /// 创建导入编排器
    ///
    /// # 参数
    /// - repo: 存储网关
    /// - registry: 进程级任务登记表 (由调用方创建并共享)
    /// - settings: 导入参数快照
    pub fn new(repo: Arc<R>, registry: Arc<ImportTaskRegistry>, settings: ImportSettings) -> Self {
        Self {
            repo,
            registry,
            settings,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn registry(&self) -> &Arc<ImportTaskRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    // ==========================================
    // 建档阶段
    // ==========================================

    /// 校验并建档: 未知格式与重名在建档前拒绝
    pub fn begin_import(&self, request: &ImportRequest) -> ImportResult<PreparedImport> {
        let file = FormatDetector::file_info(&request.file_path)?;
        if file.format == DictionaryFormat::Unknown {
            let ext = request
                .file_path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| file.name.clone());
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let name = resolve_name(&request.name, &request.file_path);
        if self.repo.find_by_name(&name)?.is_some() {
            warn!(name = %name, "词典名称已存在, 拒绝导入");
            return Err(ImportError::DuplicateName(name));
        }

        let new_dictionary = NewDictionary {
            name: name.clone(),
            source_format: file.format,
            description: request.description.clone(),
            source_file: file.path.clone(),
            file_size: file.size,
            priority: request.priority.unwrap_or(self.settings.default_priority),
            import_status: ImportStatus::Importing,
            import_progress: 0.0,
        };
        let dictionary_id = match self.repo.create_dictionary(&new_dictionary) {
            Ok(id) => id,
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Err(ImportError::DuplicateName(name))
            }
            Err(e) => return Err(e.into()),
        };

        let task = ImportTask::start(dictionary_id, &name);
        let run_id = task.run_id.clone();
        self.registry.register(task)?;

        info!(
            dictionary_id,
            run_id = %run_id,
            name = %name,
            format = %file.format,
            file_path = %file.path,
            "词典已建档, 开始导入"
        );

        Ok(PreparedImport {
            dictionary_id,
            dictionary_name: name,
            run_id,
            file,
        })
    }

    // ==========================================
    // 执行阶段
    // ==========================================

    /// 执行已建档的导入 (阻塞); 失败时记录 failed 状态后原样返回错误
    #[instrument(
        skip(self, prepared, on_progress),
        fields(dictionary_id = prepared.dictionary_id, run_id = %prepared.run_id)
    )]
    pub fn run_prepared(
        &self,
        prepared: &PreparedImport,
        on_progress: Option<&(dyn Fn(ImportProgress) + Send + Sync)>,
    ) -> ImportResult<ImportOutcome> {
        let perf = PerfGuard::new("import_dictionary");
        let mut counters = RunCounters::default();

        // 解析中的 panic 同样按失败收尾, 不让记录停留在 importing
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_batches(prepared, &mut counters, on_progress)
                .and_then(|_| self.finish(prepared, &counters, on_progress))
        }))
        .unwrap_or_else(|payload| Err(ImportError::InternalError(panic_message(payload.as_ref()))));

        match result {
            Ok(()) => {
                let outcome = ImportOutcome {
                    dictionary_id: prepared.dictionary_id,
                    dictionary_name: prepared.dictionary_name.clone(),
                    run_id: prepared.run_id.clone(),
                    entry_count: counters.persisted,
                    batches: counters.batches,
                    elapsed_ms: perf.elapsed_ms(),
                };
                info!(
                    entry_count = outcome.entry_count,
                    batches = outcome.batches,
                    elapsed_ms = outcome.elapsed_ms,
                    "词典导入完成"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.mark_failed(prepared.dictionary_id, counters.persisted, &e);
                Err(e)
            }
        }
    }

    fn run_batches(
        &self,
        prepared: &PreparedImport,
        counters: &mut RunCounters,
        on_progress: Option<&(dyn Fn(ImportProgress) + Send + Sync)>,
    ) -> ImportResult<()> {
        let parser = ParserFactory::create_with_settings(&prepared.file, &self.settings)?;
        let estimated_total = parser.estimate_total_count()?;
        debug!(estimated_total, "词条总数估计完成");

        let batch_size = self.settings.batch_size.max(1);
        let mut batch: Vec<DictionaryEntry> = Vec::with_capacity(batch_size);

        for item in parser.parse()? {
            batch.push(item?);
            if batch.len() >= batch_size {
                self.flush_batch(prepared.dictionary_id, &mut batch, counters)?;
                self.report_progress(prepared.dictionary_id, estimated_total, counters, on_progress)?;
            }
        }

        if !batch.is_empty() {
            self.flush_batch(prepared.dictionary_id, &mut batch, counters)?;
            self.report_progress(prepared.dictionary_id, estimated_total, counters, on_progress)?;
        }
        Ok(())
    }

    fn flush_batch(
        &self,
        dictionary_id: i64,
        batch: &mut Vec<DictionaryEntry>,
        counters: &mut RunCounters,
    ) -> ImportResult<()> {
        let written = self.repo.insert_entries_batch(dictionary_id, batch)?;
        counters.persisted += written as u64;
        counters.batches += 1;
        batch.clear();

        self.registry.update_entry_count(dictionary_id, counters.persisted)?;
        debug!(
            batch = counters.batches,
            written,
            entry_count = counters.persisted,
            "批次落库完成"
        );
        Ok(())
    }

    /// 累计落库数距上次上报达到间隔时写入进度
    fn report_progress(
        &self,
        dictionary_id: i64,
        estimated_total: u64,
        counters: &mut RunCounters,
        on_progress: Option<&(dyn Fn(ImportProgress) + Send + Sync)>,
    ) -> ImportResult<()> {
        if counters.persisted - counters.last_reported < self.settings.progress_interval {
            return Ok(());
        }

        let progress = self
            .settings
            .running_progress(counters.persisted, estimated_total);
        self.repo.update_import_progress(
            dictionary_id,
            &ImportProgressUpdate::running(progress, counters.persisted),
        )?;
        let progress = self
            .registry
            .update_progress(dictionary_id, progress, counters.persisted)?
            .unwrap_or(progress);
        counters.last_reported = counters.persisted;

        debug!(progress, entry_count = counters.persisted, "导入进度已更新");
        if let Some(callback) = on_progress {
            callback(ImportProgress {
                dictionary_id,
                progress,
                entry_count: counters.persisted,
            });
        }
        Ok(())
    }

    fn finish(
        &self,
        prepared: &PreparedImport,
        counters: &RunCounters,
        on_progress: Option<&(dyn Fn(ImportProgress) + Send + Sync)>,
    ) -> ImportResult<()> {
        self.repo.update_import_progress(
            prepared.dictionary_id,
            &ImportProgressUpdate::completed(counters.persisted),
        )?;
        self.registry
            .complete(prepared.dictionary_id, counters.persisted)?;

        if let Some(callback) = on_progress {
            callback(ImportProgress {
                dictionary_id: prepared.dictionary_id,
                progress: 1.0,
                entry_count: counters.persisted,
            });
        }
        Ok(())
    }

    /// 记录失败状态; 状态写入本身失败时仅记录日志
    fn mark_failed(&self, dictionary_id: i64, persisted: u64, cause: &ImportError) {
        let message = cause.to_string();
        error!(dictionary_id, entry_count = persisted, error = %message, "词典导入失败");

        if let Err(e) = self
            .repo
            .update_import_progress(dictionary_id, &ImportProgressUpdate::failed(persisted, &message))
        {
            error!(dictionary_id, error = %e, "写入失败状态失败");
        }
        if let Err(e) = self.registry.fail(dictionary_id, persisted, &message) {
            error!(dictionary_id, error = %e, "更新任务登记表失败");
        }
    }

    // ==========================================
    // 调用入口
    // ==========================================

    /// 同步导入 (阻塞至完成或失败)
    pub fn import_sync(
        &self,
        request: &ImportRequest,
        on_progress: Option<&(dyn Fn(ImportProgress) + Send + Sync)>,
    ) -> ImportResult<ImportOutcome> {
        let prepared = self.begin_import(request)?;
        self.run_prepared(&prepared, on_progress)
    }

    /// 同步建档后在阻塞线程池中执行, 立即返回词典 ID 与任务句柄
    ///
    /// 须在 tokio 运行时内调用
    pub fn spawn_import(
        &self,
        request: &ImportRequest,
        on_progress: Option<ProgressCallback>,
    ) -> ImportResult<(i64, JoinHandle<ImportResult<ImportOutcome>>)> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| ImportError::InternalError(format!("未处于异步运行时: {}", e)))?;

        let prepared = self.begin_import(request)?;
        let dictionary_id = prepared.dictionary_id;
        let importer = self.clone();
        let join = handle.spawn_blocking(move || {
            importer.run_prepared(&prepared, on_progress.as_deref())
        });
        Ok((dictionary_id, join))
    }

    /// 导入状态: 先查登记表, 缺失时由持久记录还原
    pub fn get_import_status(&self, dictionary_id: i64) -> ImportResult<Option<ImportTask>> {
        if let Some(task) = self.registry.get(dictionary_id)? {
            return Ok(Some(task));
        }
        Ok(self
            .repo
            .get_dictionary_by_id(dictionary_id)?
            .map(|record| ImportTask::from_record(&record)))
    }

    /// 删除词典及其词条, 同时移除登记表中的任务
    pub fn delete_dictionary(&self, dictionary_id: i64) -> ImportResult<bool> {
        let affected = self.repo.delete_dictionary(dictionary_id)?;
        self.registry.remove(dictionary_id)?;
        info!(dictionary_id, affected, "删除词典");
        Ok(affected > 0)
    }

    /// 预览文件前 n 条词条 (不建档)
    pub fn preview(&self, path: &Path, n: usize) -> ImportResult<Vec<DictionaryEntry>> {
        let file = FormatDetector::file_info(path)?;
        let parser = ParserFactory::create_with_settings(&file, &self.settings)?;
        parser.preview(n)
    }
}

#[async_trait]
impl<R> DictionaryImporter for DictionaryImporterImpl<R>
where
    R: DictionaryRepository + 'static,
{
    async fn import_async(&self, request: ImportRequest) -> ImportResult<ImportOutcome> {
        let importer = self.clone();
        tokio::task::spawn_blocking(move || importer.import_sync(&request, None))
            .await
            .map_err(|e| ImportError::InternalError(format!("导入任务异常终止: {}", e)))?
    }

    async fn batch_import(
        &self,
        requests: Vec<ImportRequest>,
    ) -> ImportResult<Vec<Result<ImportOutcome, String>>> {
        use futures::future::join_all;

        info!(count = requests.len(), "开始批量导入词典");

        let import_tasks = requests.into_iter().map(|request| {
            let file = request.file_path.display().to_string();
            async move {
                match self.import_async(request).await {
                    Ok(outcome) => {
                        info!(file = %file, entry_count = outcome.entry_count, "词典导入成功");
                        Ok(outcome)
                    }
                    Err(e) => {
                        error!(file = %file, error = %e, "词典导入失败");
                        Err(format!("文件 {} 导入失败: {}", file, e))
                    }
                }
            }
        });

        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );
        Ok(results)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default();
    format!("导入过程异常终止: {}", detail)
}

/// 词典名: 请求名 TRIM; 为空时取文件名主干
fn resolve_name(requested: &str, path: &Path) -> String {
    let trimmed = requested.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::SqliteDictionaryRepository;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    fn importer(settings: ImportSettings) -> (NamedTempFile, DictionaryImporterImpl<SqliteDictionaryRepository>) {
        let db = NamedTempFile::new().unwrap();
        let repo = SqliteDictionaryRepository::new(db.path().to_str().unwrap()).unwrap();
        let importer =
            DictionaryImporterImpl::new(Arc::new(repo), Arc::new(ImportTaskRegistry::new()), settings);
        (db, importer)
    }

    fn csv_source(rows: usize) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "word,translation").unwrap();
        for i in 0..rows {
            writeln!(file, "word{},释义{}", i, i).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_resolve_name_falls_back_to_file_stem() {
        assert_eq!(resolve_name("  牛津  ", Path::new("/a/b.csv")), "牛津");
        assert_eq!(resolve_name("", Path::new("/a/ecdict.csv")), "ecdict");
    }

    #[test]
    fn test_import_sync_with_small_batches() {
        let settings = ImportSettings {
            batch_size: 10,
            progress_interval: 20,
            ..ImportSettings::default()
        };
        let (_db, importer) = importer(settings);
        let source = csv_source(45);

        let seen = Mutex::new(Vec::new());
        let callback = |p: ImportProgress| seen.lock().unwrap().push(p.progress);
        let outcome = importer
            .import_sync(&ImportRequest::new(source.path(), "小词典"), Some(&callback))
            .unwrap();

        assert_eq!(outcome.entry_count, 45);
        assert_eq!(outcome.batches, 5, "45 条按 10 条一批应为 5 批");

        let progress = seen.into_inner().unwrap();
        assert_eq!(progress.last().copied(), Some(1.0));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]), "进度应单调不减");
        assert!(progress[..progress.len() - 1].iter().all(|p| *p <= 0.99));

        let task = importer.get_import_status(outcome.dictionary_id).unwrap().unwrap();
        assert_eq!(task.status, ImportStatus::Completed);
        assert_eq!(task.entry_count, 45);
    }

    #[test]
    fn test_unknown_format_rejected_before_record() {
        let (_db, importer) = importer(ImportSettings::default());
        let mut txt = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(txt, "hello").unwrap();

        let err = importer
            .import_sync(&ImportRequest::new(txt.path(), "txt"), None)
            .err()
            .unwrap();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
        assert!(importer.repository().get_all_dictionaries(false).unwrap().is_empty());
    }

    #[test]
    fn test_delete_removes_registry_entry() {
        let (_db, importer) = importer(ImportSettings::default());
        let source = csv_source(3);
        let outcome = importer
            .import_sync(&ImportRequest::new(source.path(), "tmp"), None)
            .unwrap();

        assert!(importer.delete_dictionary(outcome.dictionary_id).unwrap());
        assert!(importer.registry().get(outcome.dictionary_id).unwrap().is_none());
        assert!(importer.get_import_status(outcome.dictionary_id).unwrap().is_none());
        assert!(!importer.delete_dictionary(outcome.dictionary_id).unwrap());
    }

    #[tokio::test]
    async fn test_spawn_import_returns_id_immediately() {
        let (_db, importer) = importer(ImportSettings::default());
        let source = csv_source(12);
        let (id, handle) = importer
            .spawn_import(&ImportRequest::new(source.path(), "后台"), None)
            .unwrap();

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.dictionary_id, id);
        assert_eq!(outcome.entry_count, 12);
    }
}
