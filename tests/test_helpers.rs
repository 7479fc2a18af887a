// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、源文件生成、MDX 容器写入、仓储测试替身
// ==========================================

#![allow(dead_code)]

use adler32::RollingAdler32;
use dict_importer::domain::{
    DictionaryEntry, DictionaryRecord, DictionaryUpdate, NewDictionary, WordLookupHit,
};
use dict_importer::repository::{
    DictionaryRepository, ImportProgressUpdate, RepositoryError, RepositoryResult,
    SqliteDictionaryRepository,
};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ripemd::{Digest, Ripemd128};
use std::error::Error;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = dict_importer::db::open_sqlite_connection(&db_path)?;
    dict_importer::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 写入带后缀的临时源文件
pub fn write_source(suffix: &str, content: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

/// 生成 n 行通用 CSV (word,translation)
pub fn generic_csv(rows: usize) -> NamedTempFile {
    let mut content = String::from("word,translation\n");
    for i in 0..rows {
        content.push_str(&format!("word{:06},释义{}\n", i, i));
    }
    write_source(".csv", content.as_bytes())
}

/// 生成 ECDICT 风格 CSV
pub fn ecdict_csv(rows: &[&str]) -> NamedTempFile {
    let mut content =
        String::from("word,phonetic,definition,translation,pos,collins,oxford,tag,bnc,frq,exchange\n");
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    write_source(".csv", content.as_bytes())
}

// ==========================================
// MDX 容器写入 (2.0, UTF-8)
// ==========================================

#[derive(Debug, Clone)]
pub struct MdxOptions {
    /// 块压缩: 0 = 无, 2 = zlib
    pub compression: u32,
    /// 键索引混淆 (Encrypted=2)
    pub encrypt_key_index: bool,
    /// 记录区按字节切块 (可使单条记录跨块)
    pub record_block_bytes: usize,
    /// 每个键块的词头数
    pub keys_per_block: usize,
    pub engine_version: String,
    /// 覆盖键块中的记录偏移: (词条序号, 偏移)
    pub offset_overrides: Vec<(usize, u64)>,
    /// 覆盖记录块索引中的解压长度字段
    pub record_block_size_override: Option<u64>,
}

impl Default for MdxOptions {
    fn default() -> Self {
        Self {
            compression: 2,
            encrypt_key_index: false,
            record_block_bytes: 64,
            keys_per_block: 2,
            engine_version: "2.0".to_string(),
            offset_overrides: Vec::new(),
            record_block_size_override: None,
        }
    }
}

fn adler32(data: &[u8]) -> u32 {
    RollingAdler32::from_buffer(data).hash()
}

fn ripemd128(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Ripemd128::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

fn fast_encrypt(data: &mut [u8], key: &[u8]) {
    let mut prev = 0x36u8;
    for (i, byte) in data.iter_mut().enumerate() {
        let cipher = (*byte ^ prev ^ (i as u8) ^ key[i % key.len()]).rotate_left(4);
        *byte = cipher;
        prev = cipher;
    }
}

fn compress(data: &[u8], compression: u32) -> Vec<u8> {
    match compression {
        0 => data.to_vec(),
        _ => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data).unwrap();
            encoder.finish().unwrap()
        }
    }
}

fn encode_block(data: &[u8], compression: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&compression.to_le_bytes());
    out.extend_from_slice(&adler32(data).to_be_bytes());
    out.extend_from_slice(&compress(data, compression));
    out
}

fn push_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_index_key(out: &mut Vec<u8>, key: &str) {
    out.extend_from_slice(&(key.len() as u16).to_be_bytes());
    out.extend_from_slice(key.as_bytes());
    out.push(0);
}

/// 按词头/HTML 内容生成 MDX 文件字节
pub fn build_mdx(entries: &[(&str, &str)], options: &MdxOptions) -> Vec<u8> {
    let raw: Vec<(&str, &[u8])> = entries.iter().map(|(w, h)| (*w, h.as_bytes())).collect();
    build_mdx_bytes(&raw, options)
}

/// 同 build_mdx, 记录内容为原始字节 (可写入非法编码)
pub fn build_mdx_bytes(entries: &[(&str, &[u8])], options: &MdxOptions) -> Vec<u8> {
    let mut out = Vec::new();

    // ----- 头部 -----
    let encrypted = if options.encrypt_key_index { 2 } else { 0 };
    let xml = format!(
        r#"<Dictionary GeneratedByEngineVersion="{}" RequiredEngineVersion="2.0" Encrypted="{}" Encoding="UTF-8" Format="Html" Title="测试词典"/>"#,
        options.engine_version, encrypted
    );
    let header: Vec<u8> = xml.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    out.extend_from_slice(&(header.len() as u32).to_be_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&adler32(&header).to_le_bytes());

    // ----- 记录区 (内容以 NUL 结尾) -----
    let mut record_data = Vec::new();
    let mut offsets = Vec::new();
    for (_, html) in entries {
        offsets.push(record_data.len() as u64);
        record_data.extend_from_slice(html);
        record_data.push(0);
    }
    for (idx, offset) in &options.offset_overrides {
        offsets[*idx] = *offset;
    }

    // ----- 键块 -----
    let mut key_blocks = Vec::new();
    let mut key_index = Vec::new();
    let indexed: Vec<(u64, &str)> = offsets.iter().copied().zip(entries.iter().map(|e| e.0)).collect();
    for chunk in indexed.chunks(options.keys_per_block.max(1)) {
        let mut plain = Vec::new();
        for (offset, word) in chunk {
            push_u64(&mut plain, *offset);
            plain.extend_from_slice(word.as_bytes());
            plain.push(0);
        }
        let block = encode_block(&plain, options.compression);

        push_u64(&mut key_index, chunk.len() as u64);
        push_index_key(&mut key_index, chunk[0].1);
        push_index_key(&mut key_index, chunk[chunk.len() - 1].1);
        push_u64(&mut key_index, block.len() as u64);
        push_u64(&mut key_index, plain.len() as u64);
        key_blocks.push(block);
    }

    // ----- 键索引块 (zlib, 可选混淆) -----
    let mut key_index_block = Vec::new();
    key_index_block.extend_from_slice(&2u32.to_le_bytes());
    key_index_block.extend_from_slice(&adler32(&key_index).to_be_bytes());
    let mut payload = compress(&key_index, 2);
    if options.encrypt_key_index {
        let key = ripemd128(&[&key_index_block[4..8], &0x3695u32.to_le_bytes()]);
        fast_encrypt(&mut payload, &key);
    }
    key_index_block.extend_from_slice(&payload);

    let key_blocks_len: usize = key_blocks.iter().map(Vec::len).sum();
    let mut info = Vec::new();
    push_u64(&mut info, key_blocks.len() as u64);
    push_u64(&mut info, entries.len() as u64);
    push_u64(&mut info, key_index.len() as u64);
    push_u64(&mut info, key_index_block.len() as u64);
    push_u64(&mut info, key_blocks_len as u64);
    out.extend_from_slice(&info);
    out.extend_from_slice(&adler32(&info).to_be_bytes());
    out.extend_from_slice(&key_index_block);
    for block in &key_blocks {
        out.extend_from_slice(block);
    }

    // ----- 记录块 -----
    let record_blocks: Vec<(Vec<u8>, usize)> = record_data
        .chunks(options.record_block_bytes.max(1))
        .map(|chunk| (encode_block(chunk, options.compression), chunk.len()))
        .collect();
    let record_blocks_len: usize = record_blocks.iter().map(|(b, _)| b.len()).sum();

    push_u64(&mut out, record_blocks.len() as u64);
    push_u64(&mut out, entries.len() as u64);
    push_u64(&mut out, (record_blocks.len() * 16) as u64);
    push_u64(&mut out, record_blocks_len as u64);
    for (block, decompressed) in &record_blocks {
        push_u64(&mut out, block.len() as u64);
        push_u64(
            &mut out,
            options
                .record_block_size_override
                .unwrap_or(*decompressed as u64),
        );
    }
    for (block, _) in &record_blocks {
        out.extend_from_slice(block);
    }
    out
}

pub fn write_mdx(entries: &[(&str, &str)], options: &MdxOptions) -> NamedTempFile {
    write_source(".mdx", &build_mdx(entries, options))
}

// ==========================================
// 仓储测试替身
// ==========================================

/// 委托给 SQLite 仓储, 记录批次与进度写入, 可在第 N 批 (从 1 计) 落库时失败
pub struct RecordingRepository {
    inner: SqliteDictionaryRepository,
    fail_on_batch: Option<usize>,
    panic_on_batch: Option<usize>,
    batch_calls: AtomicUsize,
    pub batch_sizes: Mutex<Vec<usize>>,
    pub progress_updates: Mutex<Vec<ImportProgressUpdate>>,
}

impl RecordingRepository {
    pub fn new(db_path: &str) -> Self {
        Self {
            inner: SqliteDictionaryRepository::new(db_path).unwrap(),
            fail_on_batch: None,
            panic_on_batch: None,
            batch_calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
            progress_updates: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on_batch(db_path: &str, batch: usize) -> Self {
        Self {
            fail_on_batch: Some(batch),
            ..Self::new(db_path)
        }
    }

    pub fn panicking_on_batch(db_path: &str, batch: usize) -> Self {
        Self {
            panic_on_batch: Some(batch),
            ..Self::new(db_path)
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn progress_updates(&self) -> Vec<ImportProgressUpdate> {
        self.progress_updates.lock().unwrap().clone()
    }
}

impl DictionaryRepository for RecordingRepository {
    fn find_by_name(&self, name: &str) -> RepositoryResult<Option<DictionaryRecord>> {
        self.inner.find_by_name(name)
    }

    fn create_dictionary(&self, dictionary: &NewDictionary) -> RepositoryResult<i64> {
        self.inner.create_dictionary(dictionary)
    }

    fn insert_entries_batch(
        &self,
        dictionary_id: i64,
        entries: &[DictionaryEntry],
    ) -> RepositoryResult<usize> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_batch == Some(call) {
            return Err(RepositoryError::DatabaseTransactionError(format!(
                "模拟第 {} 批落库失败",
                call
            )));
        }
        if self.panic_on_batch == Some(call) {
            panic!("模拟第 {} 批落库时崩溃", call);
        }
        self.batch_sizes.lock().unwrap().push(entries.len());
        self.inner.insert_entries_batch(dictionary_id, entries)
    }

    fn update_import_progress(
        &self,
        dictionary_id: i64,
        update: &ImportProgressUpdate,
    ) -> RepositoryResult<()> {
        self.progress_updates.lock().unwrap().push(update.clone());
        self.inner.update_import_progress(dictionary_id, update)
    }

    fn delete_dictionary(&self, dictionary_id: i64) -> RepositoryResult<usize> {
        self.inner.delete_dictionary(dictionary_id)
    }

    fn lookup_word(&self, word: &str) -> RepositoryResult<Vec<WordLookupHit>> {
        self.inner.lookup_word(word)
    }

    fn get_dictionary_by_id(&self, dictionary_id: i64) -> RepositoryResult<Option<DictionaryRecord>> {
        self.inner.get_dictionary_by_id(dictionary_id)
    }

    fn get_all_dictionaries(&self, enabled_only: bool) -> RepositoryResult<Vec<DictionaryRecord>> {
        self.inner.get_all_dictionaries(enabled_only)
    }

    fn update_dictionary(
        &self,
        dictionary_id: i64,
        update: &DictionaryUpdate,
    ) -> RepositoryResult<usize> {
        self.inner.update_dictionary(dictionary_id, update)
    }

    fn count_entries(&self, dictionary_id: i64) -> RepositoryResult<u64> {
        self.inner.count_entries(dictionary_id)
    }
}
