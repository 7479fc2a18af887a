// ==========================================
// 词典导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键级联删除依赖 foreign_keys)
// - 统一 busy_timeout, 减少并发导入时的偶发 busy 错误
// - 幂等建表, 记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout (毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "DICT_IMPORTER_DB";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id    TEXT NOT NULL DEFAULT 'global',
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS dictionary (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT NOT NULL UNIQUE,
    description      TEXT,
    source_format    TEXT NOT NULL,
    source_file      TEXT,
    file_size        INTEGER NOT NULL DEFAULT 0,
    entry_count      INTEGER NOT NULL DEFAULT 0,
    priority         INTEGER NOT NULL DEFAULT 100,
    enabled          INTEGER NOT NULL DEFAULT 1,
    import_status    TEXT NOT NULL DEFAULT 'pending',
    import_progress  REAL NOT NULL DEFAULT 0.0,
    import_error     TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS dictionary_entry (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    dictionary_id  INTEGER NOT NULL REFERENCES dictionary(id) ON DELETE CASCADE,
    word           TEXT NOT NULL,
    phonetic_uk    TEXT,
    phonetic_us    TEXT,
    translation    TEXT NOT NULL,
    definition     TEXT,
    pos            TEXT,
    collins_star   INTEGER,
    oxford_level   TEXT,
    tags           TEXT,
    bnc_rank       INTEGER,
    frq_rank       INTEGER,
    exchange       TEXT,
    examples       TEXT
);

CREATE INDEX IF NOT EXISTS idx_dictionary_entry_word
    ON dictionary_entry (word COLLATE NOCASE);
CREATE INDEX IF NOT EXISTS idx_dictionary_entry_dict
    ON dictionary_entry (dictionary_id);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 幂等建表并写入 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version (若表不存在则返回 None)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// 优先级: DICT_IMPORTER_DB 环境变量 > <data_dir>/dict-importer/dictionaries.db
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dict-importer")
        .join("dictionaries.db")
}
