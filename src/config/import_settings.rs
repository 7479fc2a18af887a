// ==========================================
// 词典导入系统 - 导入参数快照
// ==========================================
// 职责: 导入编排器构造时使用的只读参数集合
// ==========================================

use crate::config::config_manager::config_defaults;
use crate::config::import_config_trait::ImportConfigReader;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// 导入参数 (构造后不可变)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    /// 每批落库词条数
    pub batch_size: usize,
    /// 进度上报间隔 (累计落库词条数)
    pub progress_interval: u64,
    /// 运行中进度上限
    pub max_running_progress: f64,
    /// 新词典默认优先级
    pub default_priority: i32,
    /// MDX 释义文本最大字符数
    pub translation_max_chars: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: config_defaults::BATCH_SIZE,
            progress_interval: config_defaults::PROGRESS_INTERVAL,
            max_running_progress: config_defaults::MAX_RUNNING_PROGRESS,
            default_priority: config_defaults::DEFAULT_PRIORITY,
            translation_max_chars: config_defaults::TRANSLATION_MAX_CHARS,
        }
    }
}

impl ImportSettings {
    /// 从配置读取器解析参数快照
    pub async fn load(
        reader: &dyn ImportConfigReader,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            batch_size: reader.get_batch_size().await?,
            progress_interval: reader.get_progress_interval().await?,
            max_running_progress: reader.get_max_running_progress().await?,
            default_priority: reader.get_default_priority().await?,
            translation_max_chars: reader.get_translation_max_chars().await?,
        })
    }

    /// 运行中进度: min(persisted / estimated, 上限); 估计值为 0 时报告 0.5
    pub fn running_progress(&self, persisted: u64, estimated_total: u64) -> f64 {
        if estimated_total == 0 {
            return 0.5_f64.min(self.max_running_progress);
        }
        (persisted as f64 / estimated_total as f64).min(self.max_running_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_progress_is_capped() {
        let settings = ImportSettings::default();
        assert_eq!(settings.running_progress(5000, 10000), 0.5);
        assert_eq!(settings.running_progress(12000, 10000), 0.99);
        assert_eq!(settings.running_progress(5000, 0), 0.5);
    }
}
