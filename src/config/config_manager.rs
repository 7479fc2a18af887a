// ==========================================
// 词典导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const BATCH_SIZE: &str = "import/batch_size";
    pub const PROGRESS_INTERVAL: &str = "import/progress_interval";
    pub const MAX_RUNNING_PROGRESS: &str = "import/max_running_progress";
    pub const DEFAULT_PRIORITY: &str = "import/default_priority";
    pub const TRANSLATION_MAX_CHARS: &str = "import/translation_max_chars";
    pub const DICTIONARY_DIRECTORY: &str = "dictionary/directory";
}

/// 默认值
pub mod config_defaults {
    pub const BATCH_SIZE: usize = 1000;
    pub const PROGRESS_INTERVAL: u64 = 5000;
    pub const MAX_RUNNING_PROGRESS: f64 = 0.99;
    pub const DEFAULT_PRIORITY: i32 = 100;
    pub const TRANSLATION_MAX_CHARS: usize = 2000;
}

/// 配置作用域
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    Global,
}

impl ConfigScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigScope::Global => "global",
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?)
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![ConfigScope::Global.as_str(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![ConfigScope::Global.as_str(), key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![ConfigScope::Global.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    /// 读取并解析配置值; 缺失返回默认值, 无法解析时告警并返回默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "配置值无法解析, 使用默认值");
                    Ok(default)
                }
            },
        }
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> ConfigResult<usize> {
        let value = self.get_parsed_or_default(config_keys::BATCH_SIZE, config_defaults::BATCH_SIZE)?;
        Ok(if value == 0 { config_defaults::BATCH_SIZE } else { value })
    }

    async fn get_progress_interval(&self) -> ConfigResult<u64> {
        let value = self.get_parsed_or_default(
            config_keys::PROGRESS_INTERVAL,
            config_defaults::PROGRESS_INTERVAL,
        )?;
        Ok(if value == 0 { config_defaults::PROGRESS_INTERVAL } else { value })
    }

    async fn get_max_running_progress(&self) -> ConfigResult<f64> {
        let value = self.get_parsed_or_default(
            config_keys::MAX_RUNNING_PROGRESS,
            config_defaults::MAX_RUNNING_PROGRESS,
        )?;
        // 必须严格小于 1.0, 完成信号只由 finalize 发出
        if value > 0.0 && value < 1.0 {
            Ok(value)
        } else {
            tracing::warn!(value, "进度上限越界, 使用默认值");
            Ok(config_defaults::MAX_RUNNING_PROGRESS)
        }
    }

    async fn get_default_priority(&self) -> ConfigResult<i32> {
        self.get_parsed_or_default(config_keys::DEFAULT_PRIORITY, config_defaults::DEFAULT_PRIORITY)
    }

    async fn get_translation_max_chars(&self) -> ConfigResult<usize> {
        let value = self.get_parsed_or_default(
            config_keys::TRANSLATION_MAX_CHARS,
            config_defaults::TRANSLATION_MAX_CHARS,
        )?;
        Ok(if value == 0 { config_defaults::TRANSLATION_MAX_CHARS } else { value })
    }

    async fn get_dictionary_directory(&self) -> ConfigResult<PathBuf> {
        match self.get_global_config_value(config_keys::DICTIONARY_DIRECTORY)? {
            Some(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir.trim())),
            _ => Ok(default_dictionary_directory()),
        }
    }
}

/// 默认词典目录
pub fn default_dictionary_directory() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dict-importer")
        .join("dictionaries")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let manager = setup_manager();
        assert_eq!(manager.get_batch_size().await.unwrap(), 1000);
        assert_eq!(manager.get_progress_interval().await.unwrap(), 5000);
        assert_eq!(manager.get_max_running_progress().await.unwrap(), 0.99);
        assert_eq!(manager.get_default_priority().await.unwrap(), 100);
        assert_eq!(manager.get_translation_max_chars().await.unwrap(), 2000);
    }

    #[tokio::test]
    async fn test_override_and_invalid_values() {
        let manager = setup_manager();
        manager.set_global_config_value(config_keys::BATCH_SIZE, "250").unwrap();
        manager.set_global_config_value(config_keys::PROGRESS_INTERVAL, "abc").unwrap();
        manager.set_global_config_value(config_keys::MAX_RUNNING_PROGRESS, "1.5").unwrap();

        assert_eq!(manager.get_batch_size().await.unwrap(), 250);
        assert_eq!(manager.get_progress_interval().await.unwrap(), 5000, "无法解析应回退默认值");
        assert_eq!(manager.get_max_running_progress().await.unwrap(), 0.99, "越界应回退默认值");

        let snapshot = manager.get_config_snapshot().unwrap();
        assert_eq!(snapshot.get(config_keys::BATCH_SIZE).map(String::as_str), Some("250"));
    }

    #[tokio::test]
    async fn test_dictionary_directory_override() {
        let manager = setup_manager();
        manager
            .set_global_config_value(config_keys::DICTIONARY_DIRECTORY, "/data/dicts")
            .unwrap();
        assert_eq!(
            manager.get_dictionary_directory().await.unwrap(),
            PathBuf::from("/data/dicts")
        );
    }
}
