// ==========================================
// 词典导入系统 - 词典 API
// ==========================================
// 职责: 面向调用方的门面 (扫描 / 导入 / 状态 / 管理 / 查词)
// 说明: 与传输层无关, CLI 与上层服务共用
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader, ImportSettings};
use crate::domain::dictionary::{
    DictionaryEntry, DictionaryFileInfo, DictionaryRecord, DictionaryUpdate, WordLookupHit,
};
use crate::domain::import_task::{ImportOutcome, ImportProgress, ImportRequest, ImportTask};
use crate::importer::{
    DictionaryImporter, DictionaryImporterImpl, FormatDetector, ImportTaskRegistry,
    ProgressCallback,
};
use crate::repository::{DictionaryRepository, SqliteDictionaryRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 词典 API
pub struct DictionaryApi {
    importer: DictionaryImporterImpl<SqliteDictionaryRepository>,
    dictionary_directory: PathBuf,
}

impl DictionaryApi {
    /// 打开数据库并按配置构造 API
    ///
    /// # 参数
    /// - db_path: SQLite 数据库文件路径 (不存在时创建)
    pub async fn new(db_path: &str) -> ApiResult<Self> {
        let repo = SqliteDictionaryRepository::new(db_path)?;
        let config = ConfigManager::from_connection(repo.connection())
            .map_err(|e| ApiError::DatabaseError(format!("配置加载失败: {}", e)))?;

        let settings = ImportSettings::load(&config)
            .await
            .map_err(|e| ApiError::InternalError(format!("导入参数加载失败: {}", e)))?;
        let dictionary_directory = config
            .get_dictionary_directory()
            .await
            .map_err(|e| ApiError::InternalError(format!("词典目录配置读取失败: {}", e)))?;

        info!(
            db_path,
            batch_size = settings.batch_size,
            progress_interval = settings.progress_interval,
            "词典 API 初始化完成"
        );
        Ok(Self::with_parts(
            Arc::new(repo),
            Arc::new(ImportTaskRegistry::new()),
            settings,
            dictionary_directory,
        ))
    }

    /// 由已构造的组件组装 (共享登记表时使用)
    pub fn with_parts(
        repo: Arc<SqliteDictionaryRepository>,
        registry: Arc<ImportTaskRegistry>,
        settings: ImportSettings,
        dictionary_directory: PathBuf,
    ) -> Self {
        Self {
            importer: DictionaryImporterImpl::new(repo, registry, settings),
            dictionary_directory,
        }
    }

    pub fn dictionary_directory(&self) -> &Path {
        &self.dictionary_directory
    }

    // ==========================================
    // 扫描与预览
    // ==========================================

    /// 扫描目录 (缺省为配置的词典目录)
    pub fn scan(&self, directory: Option<&Path>) -> ApiResult<Vec<DictionaryFileInfo>> {
        let directory = directory.unwrap_or(&self.dictionary_directory);
        Ok(FormatDetector::scan_directory(directory)?)
    }

    /// 预览文件前 n 条词条 (不建档)
    pub fn preview(&self, path: &Path, n: usize) -> ApiResult<Vec<DictionaryEntry>> {
        if n == 0 {
            return Err(ApiError::InvalidInput("预览条数必须大于 0".to_string()));
        }
        Ok(self.importer.preview(path, n)?)
    }

    // ==========================================
    // 导入
    // ==========================================

    /// 同步导入, 返回词典 ID
    pub fn import_sync(
        &self,
        request: &ImportRequest,
        on_progress: Option<&(dyn Fn(ImportProgress) + Send + Sync)>,
    ) -> ApiResult<i64> {
        Ok(self.importer.import_sync(request, on_progress)?.dictionary_id)
    }

    /// 后台工作线程导入并等待结束, 返回词典 ID
    pub async fn import_async(&self, request: ImportRequest) -> ApiResult<i64> {
        Ok(self.importer.import_async(request).await?.dictionary_id)
    }

    /// 建档后立即返回词典 ID, 导入在后台继续
    pub fn spawn_import(
        &self,
        request: &ImportRequest,
        on_progress: Option<ProgressCallback>,
    ) -> ApiResult<(i64, JoinHandle<crate::importer::ImportResult<ImportOutcome>>)> {
        Ok(self.importer.spawn_import(request, on_progress)?)
    }

    /// 并发导入多个文件
    pub async fn batch_import(
        &self,
        requests: Vec<ImportRequest>,
    ) -> ApiResult<Vec<Result<ImportOutcome, String>>> {
        Ok(self.importer.batch_import(requests).await?)
    }

    pub fn get_import_status(&self, dictionary_id: i64) -> ApiResult<Option<ImportTask>> {
        Ok(self.importer.get_import_status(dictionary_id)?)
    }

    /// 本进程登记的导入任务 (按词典 ID 升序)
    pub fn list_import_tasks(&self) -> ApiResult<Vec<ImportTask>> {
        Ok(self.importer.registry().list()?)
    }

    // ==========================================
    // 词典管理
    // ==========================================

    pub fn delete_dictionary(&self, dictionary_id: i64) -> ApiResult<bool> {
        Ok(self.importer.delete_dictionary(dictionary_id)?)
    }

    pub fn list_dictionaries(&self, enabled_only: bool) -> ApiResult<Vec<DictionaryRecord>> {
        Ok(self.importer.repository().get_all_dictionaries(enabled_only)?)
    }

    pub fn get_dictionary(&self, dictionary_id: i64) -> ApiResult<DictionaryRecord> {
        self.importer
            .repository()
            .get_dictionary_by_id(dictionary_id)?
            .ok_or_else(|| ApiError::NotFound(format!("词典(id={})不存在", dictionary_id)))
    }

    /// 修改名称/描述/优先级/启用状态, 返回修改后的记录
    pub fn update_dictionary(
        &self,
        dictionary_id: i64,
        update: &DictionaryUpdate,
    ) -> ApiResult<DictionaryRecord> {
        if update.is_empty() {
            return Err(ApiError::InvalidInput("未指定任何修改字段".to_string()));
        }
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ApiError::InvalidInput("词典名称不能为空".to_string()));
            }
        }

        let affected = self
            .importer
            .repository()
            .update_dictionary(dictionary_id, update)?;
        if affected == 0 {
            warn!(dictionary_id, "修改词典未命中记录");
            return Err(ApiError::NotFound(format!("词典(id={})不存在", dictionary_id)));
        }
        self.get_dictionary(dictionary_id)
    }

    /// 跨启用词典查词 (按词典优先级降序)
    pub fn lookup_word(&self, word: &str) -> ApiResult<Vec<WordLookupHit>> {
        let word = word.trim();
        if word.is_empty() {
            return Err(ApiError::InvalidInput("查询单词不能为空".to_string()));
        }
        Ok(self.importer.repository().lookup_word(word)?)
    }
}
