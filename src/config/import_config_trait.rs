// ==========================================
// 词典导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入编排器所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;
use std::path::PathBuf;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入编排器的可调参数
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 每批落库词条数
    ///
    /// # 默认值
    /// - 1000
    async fn get_batch_size(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 进度上报间隔（累计落库词条数）
    ///
    /// # 默认值
    /// - 5000
    async fn get_progress_interval(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;

    /// 运行中进度上限（完成前不报告 100%）
    ///
    /// # 默认值
    /// - 0.99
    async fn get_max_running_progress(&self) -> Result<f64, Box<dyn Error + Send + Sync>>;

    /// 新词典默认优先级
    ///
    /// # 默认值
    /// - 100
    async fn get_default_priority(&self) -> Result<i32, Box<dyn Error + Send + Sync>>;

    /// MDX 释义文本最大字符数
    ///
    /// # 默认值
    /// - 2000
    async fn get_translation_max_chars(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 词典文件扫描目录
    ///
    /// # 默认值
    /// - <data_dir>/dict-importer/dictionaries
    async fn get_dictionary_directory(&self) -> Result<PathBuf, Box<dyn Error + Send + Sync>>;
}
