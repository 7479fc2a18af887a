// ==========================================
// 词典导入系统 - SQL 性能观测
// ==========================================
// 开关:
// - DICT_IMPORTER_PERF_SQL=1 强制开启 (Debug 默认开启, Release 默认关闭)
// - DICT_IMPORTER_SLOW_SQL_MS=200 慢 SQL 阈值 (毫秒)
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const PERF_SQL_ENV: &str = "DICT_IMPORTER_PERF_SQL";
pub const SLOW_SQL_MS_ENV: &str = "DICT_IMPORTER_SLOW_SQL_MS";

const DEFAULT_SLOW_SQL_MS: u64 = 200;

static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(DEFAULT_SLOW_SQL_MS);

thread_local! {
    static SQL_COUNT: Cell<u64> = const { Cell::new(0) };
}

fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn shorten_sql(sql: &str, max_chars: usize) -> String {
    let flat: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let head: String = flat.chars().take(max_chars).collect();
    format!("{}…", head)
}

/// 为连接安装 profile 回调 (慢 SQL 日志 + 语句计数)
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = std::env::var(PERF_SQL_ENV)
        .map(|v| env_flag(&v))
        .unwrap_or(cfg!(debug_assertions));

    if !enabled {
        conn.profile(None);
        return;
    }

    let threshold = std::env::var(SLOW_SQL_MS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_SLOW_SQL_MS);
    SLOW_SQL_THRESHOLD_MS.store(threshold, Ordering::Relaxed);

    conn.profile(Some(sql_profile_callback));
}

fn sql_profile_callback(sql: &str, duration: Duration) {
    SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %shorten_sql(sql, 300),
            "slow sql"
        );
    }
}

/// 耗时统计 Guard: drop 时输出 elapsed_ms 与本线程执行的 SQL 数
///
/// ```ignore
/// let _perf = dict_importer::perf::PerfGuard::new("import_dictionary");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            sql_start: SQL_COUNT.with(|c| c.get()),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let sql_count = SQL_COUNT.with(|c| c.get()).saturating_sub(self.sql_start);
        tracing::debug!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.elapsed_ms(),
            sql_count,
            "done"
        );
    }
}
