// ==========================================
// 词典导入系统 - 词典仓储 SQLite 实现
// ==========================================
// 职责: 管理 dictionary / dictionary_entry 表
// 约束: 所有查询使用参数化; 每个批次一个事务
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::dictionary::{
    DictionaryEntry, DictionaryRecord, DictionaryUpdate, NewDictionary, WordLookupHit,
};
use crate::domain::types::{DictionaryFormat, ImportStatus};
use crate::repository::dictionary_repo::{DictionaryRepository, ImportProgressUpdate};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

const DICTIONARY_COLUMNS: &str = r#"
    id, name, description, source_format, source_file, file_size, entry_count,
    priority, enabled, import_status, import_progress, import_error, created_at, updated_at
"#;

const OXFORD_CORE: &str = "core";

// ==========================================
// SqliteDictionaryRepository - 词典仓储
// ==========================================
pub struct SqliteDictionaryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDictionaryRepository {
    /// 打开数据库并确保表结构存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 共享连接 (供 ConfigManager 复用)
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_dictionary_row(row: &Row<'_>) -> rusqlite::Result<DictionaryRecord> {
        let format: String = row.get(3)?;
        let status: String = row.get(9)?;
        let import_status = ImportStatus::from_str(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                9,
                Type::Text,
                Box::new(RepositoryError::FieldValueError {
                    field: "import_status".to_string(),
                    message: format!("未知状态: {}", status),
                }),
            )
        })?;

        Ok(DictionaryRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            source_format: DictionaryFormat::from_str(&format),
            source_file: row.get(4)?,
            file_size: row.get::<_, i64>(5)?.max(0) as u64,
            entry_count: row.get::<_, i64>(6)?.max(0) as u64,
            priority: row.get(7)?,
            enabled: row.get(8)?,
            import_status,
            import_progress: row.get(10)?,
            import_error: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    /// 词条列偏移: dictionary_id, name, priority 之后
    fn map_entry_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<DictionaryEntry> {
        let json_column = |idx: usize| -> rusqlite::Result<Option<String>> { row.get(offset + idx) };

        let tags: BTreeSet<String> = parse_json_column(json_column(9)?, offset + 9)?;
        let morphology: BTreeMap<String, String> = parse_json_column(json_column(12)?, offset + 12)?;
        let examples: Vec<String> = parse_json_column(json_column(13)?, offset + 13)?;
        let oxford: Option<String> = row.get(offset + 8)?;

        Ok(DictionaryEntry {
            word: row.get(offset)?,
            phonetic_uk: row.get(offset + 1)?,
            phonetic_us: row.get(offset + 2)?,
            translation: row.get(offset + 3)?,
            definition: row.get(offset + 4)?,
            part_of_speech: row.get(offset + 5)?,
            collins_star: row
                .get::<_, Option<i64>>(offset + 6)?
                .and_then(|v| u8::try_from(v).ok()),
            oxford_core: oxford.as_deref() == Some(OXFORD_CORE),
            tags,
            frequency_rank_bnc: row
                .get::<_, Option<i64>>(offset + 10)?
                .and_then(|v| u32::try_from(v).ok()),
            frequency_rank_modern: row
                .get::<_, Option<i64>>(offset + 11)?
                .and_then(|v| u32::try_from(v).ok()),
            morphology,
            examples,
        })
    }
}

fn parse_json_column<T>(raw: Option<String>, idx: usize) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match raw {
        None => Ok(T::default()),
        Some(text) if text.is_empty() => Ok(T::default()),
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

fn to_json_column<T: serde::Serialize>(value: &T, is_empty: bool) -> RepositoryResult<Option<String>> {
    if is_empty {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(value)?))
}

impl DictionaryRepository for SqliteDictionaryRepository {
    fn find_by_name(&self, name: &str) -> RepositoryResult<Option<DictionaryRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM dictionary WHERE name = ?1", DICTIONARY_COLUMNS);
        let record = conn
            .query_row(&sql, params![name], Self::map_dictionary_row)
            .optional()?;
        Ok(record)
    }

    fn create_dictionary(&self, dictionary: &NewDictionary) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let now = Utc::now().naive_utc();
        conn.execute(
            r#"
            INSERT INTO dictionary (
                name, description, source_format, source_file, file_size,
                priority, enabled, import_status, import_progress, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?9, ?9)
            "#,
            params![
                dictionary.name,
                dictionary.description,
                dictionary.source_format.as_str(),
                dictionary.source_file,
                dictionary.file_size as i64,
                dictionary.priority,
                dictionary.import_status.as_str(),
                dictionary.import_progress,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_entries_batch(
        &self,
        dictionary_id: i64,
        entries: &[DictionaryEntry],
    ) -> RepositoryResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                r#"
                INSERT INTO dictionary_entry (
                    dictionary_id, word, phonetic_uk, phonetic_us, translation, definition,
                    pos, collins_star, oxford_level, tags, bnc_rank, frq_rank, exchange, examples
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )?;

            for entry in entries {
                let tags = to_json_column(&entry.tags, entry.tags.is_empty())?;
                let exchange = to_json_column(&entry.morphology, entry.morphology.is_empty())?;
                let examples = to_json_column(&entry.examples, entry.examples.is_empty())?;
                let oxford = entry.oxford_core.then_some(OXFORD_CORE);

                stmt.execute(params![
                    dictionary_id,
                    entry.word,
                    entry.phonetic_uk,
                    entry.phonetic_us,
                    entry.translation,
                    entry.definition,
                    entry.part_of_speech,
                    entry.collins_star.map(i64::from),
                    oxford,
                    tags,
                    entry.frequency_rank_bnc.map(i64::from),
                    entry.frequency_rank_modern.map(i64::from),
                    exchange,
                    examples,
                ])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    fn update_import_progress(
        &self,
        dictionary_id: i64,
        update: &ImportProgressUpdate,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE dictionary
            SET import_progress = ?1,
                import_status = ?2,
                entry_count = COALESCE(?3, entry_count),
                import_error = ?4,
                updated_at = ?5
            WHERE id = ?6
            "#,
            params![
                update.progress,
                update.status.as_str(),
                update.entry_count.map(|c| c as i64),
                update.error,
                Utc::now().naive_utc(),
                dictionary_id,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Dictionary".to_string(),
                id: dictionary_id.to_string(),
            });
        }
        Ok(())
    }

    fn delete_dictionary(&self, dictionary_id: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        // dictionary_entry 通过 ON DELETE CASCADE 级联删除
        let affected = conn.execute("DELETE FROM dictionary WHERE id = ?1", params![dictionary_id])?;
        Ok(affected)
    }

    fn lookup_word(&self, word: &str) -> RepositoryResult<Vec<WordLookupHit>> {
        let word = word.trim();
        if word.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT d.id, d.name, d.priority,
                   e.word, e.phonetic_uk, e.phonetic_us, e.translation, e.definition, e.pos,
                   e.collins_star, e.oxford_level, e.tags, e.bnc_rank, e.frq_rank,
                   e.exchange, e.examples
            FROM dictionary_entry e
            JOIN dictionary d ON d.id = e.dictionary_id
            WHERE e.word = ?1 COLLATE NOCASE
              AND d.enabled = 1
            ORDER BY d.priority DESC, d.id ASC, e.id ASC
            "#,
        )?;

        let rows = stmt.query_map(params![word], |row| {
            Ok(WordLookupHit {
                dictionary_id: row.get(0)?,
                dictionary_name: row.get(1)?,
                priority: row.get(2)?,
                entry: Self::map_entry_row(row, 3)?,
            })
        })?;

        let mut hits = Vec::new();
        for row in rows {
            hits.push(row?);
        }
        Ok(hits)
    }

    fn get_dictionary_by_id(
        &self,
        dictionary_id: i64,
    ) -> RepositoryResult<Option<DictionaryRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM dictionary WHERE id = ?1", DICTIONARY_COLUMNS);
        let record = conn
            .query_row(&sql, params![dictionary_id], Self::map_dictionary_row)
            .optional()?;
        Ok(record)
    }

    fn get_all_dictionaries(&self, enabled_only: bool) -> RepositoryResult<Vec<DictionaryRecord>> {
        let conn = self.get_conn()?;
        let filter = if enabled_only { "WHERE enabled = 1" } else { "" };
        let sql = format!(
            "SELECT {} FROM dictionary {} ORDER BY priority DESC, id ASC",
            DICTIONARY_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_dictionary_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn update_dictionary(
        &self,
        dictionary_id: i64,
        update: &DictionaryUpdate,
    ) -> RepositoryResult<usize> {
        if update.is_empty() {
            return Ok(0);
        }

        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(name) = &update.name {
            assignments.push("name = ?");
            values.push(Box::new(name.trim().to_string()));
        }
        if let Some(description) = &update.description {
            assignments.push("description = ?");
            values.push(Box::new(description.clone()));
        }
        if let Some(priority) = update.priority {
            assignments.push("priority = ?");
            values.push(Box::new(priority));
        }
        if let Some(enabled) = update.enabled {
            assignments.push("enabled = ?");
            values.push(Box::new(enabled));
        }
        assignments.push("updated_at = ?");
        values.push(Box::new(Utc::now().naive_utc()));
        values.push(Box::new(dictionary_id));

        let sql = format!("UPDATE dictionary SET {} WHERE id = ?", assignments.join(", "));
        let conn = self.get_conn()?;
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(affected)
    }

    fn count_entries(&self, dictionary_id: i64) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dictionary_entry WHERE dictionary_id = ?1",
            params![dictionary_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}
