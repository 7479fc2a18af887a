// ==========================================
// 词典导入系统 - MDict (.mdx) 容器读取
// ==========================================
// 支持: 1.x / 2.x 容器; 块压缩 无/zlib (LZO 需开启 lzo 特性);
//       键索引混淆 (Encrypted & 0x02); 块级 fast-XOR 加密
// 不支持: 3.x 容器; Salsa20 块加密; 需注册码的词典 (Encrypted & 0x01)
// 结构:
//   header_len(u32 BE) | header(UTF-16LE XML) | adler32(u32 LE)
//   key block info | key index | key blocks
//   record block info | record index | record blocks
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use adler32::RollingAdler32;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use encoding_rs::{Encoding, GB18030, UTF_16BE, UTF_16LE, UTF_8};
use flate2::read::ZlibDecoder;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use ripemd::{Digest, Ripemd128};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const FORMAT_TAG: &str = "mdx";

/// 头部长度上限 (防止对非 MDX 文件做超大分配)
const MAX_HEADER_LEN: u32 = 4 * 1024 * 1024;

/// 单个块解压后长度上限 (长度字段来自文件, 分配前须校验)
pub const MAX_BLOCK_LEN: u64 = 64 * 1024 * 1024;

fn malformed(message: impl Into<String>) -> ImportError {
    ImportError::malformed(FORMAT_TAG, message)
}

fn truncated(section: &str) -> ImportError {
    malformed(format!("{} 数据不完整", section))
}

// ==========================================
// 头部
// ==========================================
#[derive(Debug, Clone)]
pub struct MdictHeader {
    pub version: f32,
    pub encoding: &'static Encoding,
    /// 数字宽度: 2.x 为 8 字节, 1.x 为 4 字节
    pub number_width: usize,
    pub encrypt_key_index: bool,
    pub encrypt_record_blocks: bool,
    pub title: String,
    pub description: Option<String>,
}

impl MdictHeader {
    fn from_attributes(attrs: &HashMap<String, String>) -> ImportResult<Self> {
        let version_str = attrs
            .get("GeneratedByEngineVersion")
            .map(|s| s.trim())
            .unwrap_or("1.0");
        let version = version_str
            .parse::<f32>()
            .map_err(|_| malformed(format!("无法识别的版本号: {}", version_str)))?;

        if version >= 3.0 {
            return Err(ImportError::DependencyUnavailable(format!(
                "MDict {} 容器需要 3.x 解码器, 当前仅支持 1.x/2.x",
                version
            )));
        }

        let encoding = match attrs.get("Encoding").map(|s| s.trim()) {
            None | Some("") => UTF_8,
            Some(label) if label.eq_ignore_ascii_case("GBK") || label.eq_ignore_ascii_case("GB2312") => GB18030,
            Some(label) => Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8),
        };

        let encrypted = attrs
            .get("Encrypted")
            .map(|s| s.trim().to_lowercase())
            .map(|s| match s.as_str() {
                "yes" => 1,
                "no" | "" => 0,
                other => other.parse::<u8>().unwrap_or(0),
            })
            .unwrap_or(0);

        Ok(Self {
            version,
            encoding,
            number_width: if version >= 2.0 { 8 } else { 4 },
            encrypt_key_index: encrypted & 0x02 != 0,
            encrypt_record_blocks: encrypted & 0x01 != 0,
            title: attrs
                .get("Title")
                .cloned()
                .unwrap_or_else(|| "Untitled".to_string()),
            description: attrs.get("Description").cloned(),
        })
    }

    fn is_v2(&self) -> bool {
        self.version >= 2.0
    }

    fn is_utf16(&self) -> bool {
        self.encoding == UTF_16LE || self.encoding == UTF_16BE
    }
}

/// 解析头部 XML 根元素的属性
fn parse_header_xml(xml: &str) -> ImportResult<HashMap<String, String>> {
    let mut reader = XmlReader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let mut attrs = HashMap::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| malformed(format!("头部属性解析失败: {}", e)))?;
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    let value = attr
                        .unescape_value()
                        .map_err(|e| malformed(format!("头部属性解析失败: {}", e)))?
                        .into_owned();
                    attrs.insert(key, value);
                }
                return Ok(attrs);
            }
            Ok(Event::Eof) => return Err(malformed("头部缺少根元素")),
            Err(e) => return Err(malformed(format!("头部 XML 解析失败: {}", e))),
            _ => {}
        }
    }
}

// ==========================================
// 编解码
// ==========================================

fn adler32_of(data: &[u8]) -> u32 {
    RollingAdler32::from_buffer(data).hash()
}

fn ripemd128(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Ripemd128::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// MDict 快速解密: 每字节循环移位 4 位后与前一密文字节、下标、密钥异或
pub fn fast_decrypt(data: &mut [u8], key: &[u8]) {
    let mut prev = 0x36u8;
    for (i, byte) in data.iter_mut().enumerate() {
        let current = *byte;
        *byte = current.rotate_left(4) ^ prev ^ (i as u8) ^ key[i % key.len()];
        prev = current;
    }
}

/// 确认块压缩方式可用
pub fn ensure_codec(compression: u32) -> ImportResult<()> {
    match compression {
        0 | 2 => Ok(()),
        1 if cfg!(feature = "lzo") => Ok(()),
        1 => Err(ImportError::DependencyUnavailable(
            "LZO 解码器未启用 (需以 lzo 特性构建)".to_string(),
        )),
        other => Err(malformed(format!("未知压缩类型: {}", other))),
    }
}

#[cfg(feature = "lzo")]
fn lzo_decompress(payload: &[u8], expected_len: usize) -> ImportResult<Vec<u8>> {
    let mut out = vec![0u8; expected_len];
    let written = lzokay::decompress::decompress(payload, &mut out)
        .map_err(|e| malformed(format!("LZO 解压失败: {:?}", e)))?;
    out.truncate(written);
    Ok(out)
}

#[cfg(not(feature = "lzo"))]
fn lzo_decompress(_payload: &[u8], _expected_len: usize) -> ImportResult<Vec<u8>> {
    Err(ImportError::DependencyUnavailable(
        "LZO 解码器未启用 (需以 lzo 特性构建)".to_string(),
    ))
}

fn decompress(payload: &[u8], compression: u32, expected_len: usize) -> ImportResult<Vec<u8>> {
    ensure_codec(compression)?;
    if expected_len as u64 > MAX_BLOCK_LEN {
        return Err(malformed(format!("块解压长度异常: {}", expected_len)));
    }
    let out = match compression {
        0 => payload.to_vec(),
        1 => lzo_decompress(payload, expected_len)?,
        _ => {
            let mut out = Vec::with_capacity(expected_len);
            // 多读 1 字节以识别超长输出
            ZlibDecoder::new(payload)
                .take(expected_len as u64 + 1)
                .read_to_end(&mut out)
                .map_err(|e| malformed(format!("zlib 解压失败: {}", e)))?;
            out
        }
    };
    if out.len() != expected_len {
        return Err(malformed(format!(
            "解压长度不符: 期望 {}, 实际 {}",
            expected_len,
            out.len()
        )));
    }
    Ok(out)
}

/// 解码键块/记录块: [info u32 LE][adler32 u32 BE][payload]
pub fn decode_block(block: &[u8], expected_len: usize) -> ImportResult<Vec<u8>> {
    if block.len() < 8 {
        return Err(truncated("数据块"));
    }
    let info = LittleEndian::read_u32(&block[0..4]);
    let compression = info & 0x0F;
    let encryption = (info >> 4) & 0x0F;
    let checksum = BigEndian::read_u32(&block[4..8]);

    let payload = match encryption {
        0 => std::borrow::Cow::Borrowed(&block[8..]),
        1 => {
            let key = ripemd128(&[&block[4..8]]);
            let mut data = block[8..].to_vec();
            fast_decrypt(&mut data, &key);
            std::borrow::Cow::Owned(data)
        }
        2 => {
            return Err(ImportError::DependencyUnavailable(
                "Salsa20 加密块需要额外解密组件".to_string(),
            ))
        }
        other => return Err(malformed(format!("未知加密类型: {}", other))),
    };

    let data = decompress(&payload, compression, expected_len)?;
    if adler32_of(&data) != checksum {
        return Err(malformed("数据块校验和不匹配"));
    }
    Ok(data)
}

// ==========================================
// 切片读取工具
// ==========================================

fn read_number(reader: &mut &[u8], width: usize, section: &str) -> ImportResult<u64> {
    let value = match width {
        8 => reader.read_u64::<BigEndian>(),
        4 => reader.read_u32::<BigEndian>().map(u64::from),
        2 => reader.read_u16::<BigEndian>().map(u64::from),
        1 => reader.read_u8().map(u64::from),
        _ => return Err(ImportError::InternalError(format!("不支持的数字宽度: {}", width))),
    };
    value.map_err(|_| truncated(section))
}

fn to_len(value: u64, section: &str) -> ImportResult<usize> {
    usize::try_from(value).map_err(|_| malformed(format!("{} 长度越界: {}", section, value)))
}

/// 块解压后长度: 不超过 MAX_BLOCK_LEN
fn block_len(decompressed: u64, section: &str) -> ImportResult<usize> {
    if decompressed > MAX_BLOCK_LEN {
        return Err(malformed(format!("{} 解压长度异常: {}", section, decompressed)));
    }
    to_len(decompressed, section)
}

fn checked_sum(mut values: impl Iterator<Item = u64>, section: &str) -> ImportResult<u64> {
    values
        .try_fold(0u64, |acc, v| acc.checked_add(v))
        .ok_or_else(|| malformed(format!("{} 长度溢出", section)))
}

/// 跳过键索引中的首/末键文本
fn skip_key_text(reader: &mut &[u8], header: &MdictHeader) -> ImportResult<()> {
    let (len_width, terminator) = if header.is_v2() { (2, 1) } else { (1, 0) };
    let units = read_number(reader, len_width, "键索引")?;
    let unit_bytes = if header.is_utf16() { 2 } else { 1 };
    let skip = to_len(units + terminator, "键索引")? * unit_bytes;
    if reader.len() < skip {
        return Err(truncated("键索引"));
    }
    *reader = &reader[skip..];
    Ok(())
}

/// 读取以 NUL 结尾的词头文本
fn read_headword_text(reader: &mut &[u8], header: &MdictHeader) -> ImportResult<String> {
    let (end, width) = if header.is_utf16() {
        let pos = reader
            .chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .ok_or_else(|| truncated("键块词头"))?;
        (pos * 2, 2)
    } else {
        let pos = reader
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| truncated("键块词头"))?;
        (pos, 1)
    };
    let (text, _) = header.encoding.decode_without_bom_handling(&reader[..end]);
    let text = text.into_owned();
    *reader = &reader[end + width..];
    Ok(text)
}

// ==========================================
// 索引
// ==========================================

/// 词头及其在解压后记录区中的偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headword {
    pub offset: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSize {
    pub compressed: u64,
    pub decompressed: u64,
}

/// 已解析的键区与记录块索引 (不含记录内容)
#[derive(Debug)]
pub struct MdictIndex {
    pub header: MdictHeader,
    pub headwords: Vec<Headword>,
    pub record_blocks: Vec<BlockSize>,
    /// 记录块数据在文件中的起始位置
    pub record_data_offset: u64,
    /// 解压后记录区总长度
    pub record_data_len: u64,
}

impl MdictIndex {
    pub fn num_entries(&self) -> usize {
        self.headwords.len()
    }
}

/// 带剩余长度检查的文件读取器
struct SectionReader {
    inner: BufReader<File>,
    remaining: u64,
}

impl SectionReader {
    fn read_vec(&mut self, len: u64, section: &str) -> ImportResult<Vec<u8>> {
        if len > self.remaining {
            return Err(truncated(section));
        }
        let mut buf = vec![0u8; to_len(len, section)?];
        self.inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => truncated(section),
            _ => ImportError::from(e),
        })?;
        self.remaining -= len;
        Ok(buf)
    }

    fn read_u32_be(&mut self, section: &str) -> ImportResult<u32> {
        let buf = self.read_vec(4, section)?;
        Ok(BigEndian::read_u32(&buf))
    }

    fn read_u32_le(&mut self, section: &str) -> ImportResult<u32> {
        let buf = self.read_vec(4, section)?;
        Ok(LittleEndian::read_u32(&buf))
    }
}

pub struct MdictReader;

impl MdictReader {
    /// 读取头部与全部索引 (记录块内容延迟到迭代时读取)
    pub fn open_index(path: &Path) -> ImportResult<MdictIndex> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = SectionReader {
            inner: BufReader::new(file),
            remaining: file_len,
        };

        let header = Self::read_header(&mut reader)?;
        debug!(
            version = header.version,
            encoding = header.encoding.name(),
            title = %header.title,
            "MDX 头部解析完成"
        );
        if header.encrypt_record_blocks {
            return Err(ImportError::DependencyUnavailable(
                "词典需要注册码解密, 当前不支持".to_string(),
            ));
        }

        // ----- 键块信息 -----
        let info_len = if header.is_v2() { 40 } else { 16 };
        let info_bytes = reader.read_vec(info_len, "键块信息")?;
        if header.is_v2() {
            let checksum = reader.read_u32_be("键块信息")?;
            if adler32_of(&info_bytes) != checksum {
                return Err(malformed("键块信息校验和不匹配"));
            }
        }
        let width = header.number_width;
        let mut cursor = &info_bytes[..];
        let num_key_blocks = read_number(&mut cursor, width, "键块信息")?;
        let num_entries = read_number(&mut cursor, width, "键块信息")?;
        let key_index_decomp_len = if header.is_v2() {
            Some(read_number(&mut cursor, width, "键块信息")?)
        } else {
            None
        };
        let key_index_len = read_number(&mut cursor, width, "键块信息")?;
        let key_blocks_len = read_number(&mut cursor, width, "键块信息")?;

        // ----- 键索引 -----
        let key_index_raw = reader.read_vec(key_index_len, "键索引")?;
        let key_index = match key_index_decomp_len {
            Some(decomp_len) => Self::decode_key_index(&key_index_raw, decomp_len, &header)?,
            None => key_index_raw,
        };
        let key_blocks = Self::parse_key_index(&key_index, &header, num_entries)?;
        if key_blocks.len() as u64 != num_key_blocks {
            return Err(malformed(format!(
                "键块数量不符: 期望 {}, 实际 {}",
                num_key_blocks,
                key_blocks.len()
            )));
        }

        // ----- 键块 -----
        let key_data = reader.read_vec(key_blocks_len, "键块")?;
        let headwords = Self::parse_key_blocks(&key_data, &key_blocks, &header)?;
        if headwords.len() as u64 != num_entries {
            return Err(malformed(format!(
                "词头数量不符: 期望 {}, 实际 {}",
                num_entries,
                headwords.len()
            )));
        }

        // ----- 记录块信息与索引 -----
        let record_info = reader.read_vec(4 * width as u64, "记录块信息")?;
        let mut cursor = &record_info[..];
        let num_record_blocks = read_number(&mut cursor, width, "记录块信息")?;
        let record_entries = read_number(&mut cursor, width, "记录块信息")?;
        let record_index_len = read_number(&mut cursor, width, "记录块信息")?;
        let record_blocks_len = read_number(&mut cursor, width, "记录块信息")?;
        if record_entries != num_entries {
            return Err(malformed("记录数与词头数不一致"));
        }

        let record_index = reader.read_vec(record_index_len, "记录块索引")?;
        let mut cursor = &record_index[..];
        let mut record_blocks = Vec::new();
        while !cursor.is_empty() {
            record_blocks.push(BlockSize {
                compressed: read_number(&mut cursor, width, "记录块索引")?,
                decompressed: read_number(&mut cursor, width, "记录块索引")?,
            });
        }
        if record_blocks.len() as u64 != num_record_blocks {
            return Err(malformed("记录块数量不符"));
        }
        for block in &record_blocks {
            block_len(block.decompressed, "记录块")?;
        }
        let compressed_total = checked_sum(record_blocks.iter().map(|b| b.compressed), "记录块")?;
        if compressed_total != record_blocks_len || record_blocks_len > reader.remaining {
            return Err(truncated("记录块"));
        }
        let record_data_len = checked_sum(record_blocks.iter().map(|b| b.decompressed), "记录区")?;

        Ok(MdictIndex {
            header,
            headwords,
            record_data_len,
            record_blocks,
            record_data_offset: file_len - reader.remaining,
        })
    }

    fn read_header(reader: &mut SectionReader) -> ImportResult<MdictHeader> {
        let header_len = reader.read_u32_be("头部")?;
        if header_len == 0 || header_len > MAX_HEADER_LEN {
            return Err(malformed(format!("头部长度异常: {}", header_len)));
        }
        let header_bytes = reader.read_vec(u64::from(header_len), "头部")?;
        let checksum = reader.read_u32_le("头部")?;
        if adler32_of(&header_bytes) != checksum {
            return Err(malformed("头部校验和不匹配"));
        }

        let (decoded, _) = UTF_16LE.decode_without_bom_handling(&header_bytes);
        let sanitized: String = decoded
            .chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .collect();
        MdictHeader::from_attributes(&parse_header_xml(&sanitized)?)
    }

    fn decode_key_index(raw: &[u8], decomp_len: u64, header: &MdictHeader) -> ImportResult<Vec<u8>> {
        if raw.len() < 8 {
            return Err(truncated("键索引"));
        }
        let compression = LittleEndian::read_u32(&raw[0..4]);
        let checksum = BigEndian::read_u32(&raw[4..8]);

        let payload = if header.encrypt_key_index {
            let key = ripemd128(&[&raw[4..8], &0x3695u32.to_le_bytes()]);
            let mut data = raw[8..].to_vec();
            fast_decrypt(&mut data, &key);
            data
        } else {
            raw[8..].to_vec()
        };

        let data = decompress(&payload, compression, block_len(decomp_len, "键索引")?)?;
        if adler32_of(&data) != checksum {
            return Err(malformed("键索引校验和不匹配"));
        }
        Ok(data)
    }

    fn parse_key_index(
        data: &[u8],
        header: &MdictHeader,
        num_entries: u64,
    ) -> ImportResult<Vec<BlockSize>> {
        let width = header.number_width;
        let mut cursor = data;
        let mut blocks = Vec::new();
        let mut counted = 0u64;
        while !cursor.is_empty() {
            counted = counted
                .checked_add(read_number(&mut cursor, width, "键索引")?)
                .ok_or_else(|| malformed("键索引词条数溢出"))?;
            skip_key_text(&mut cursor, header)?;
            skip_key_text(&mut cursor, header)?;
            blocks.push(BlockSize {
                compressed: read_number(&mut cursor, width, "键索引")?,
                decompressed: read_number(&mut cursor, width, "键索引")?,
            });
        }
        if counted != num_entries {
            return Err(malformed(format!(
                "键索引词条数不符: 期望 {}, 实际 {}",
                num_entries, counted
            )));
        }
        Ok(blocks)
    }

    fn parse_key_blocks(
        data: &[u8],
        blocks: &[BlockSize],
        header: &MdictHeader,
    ) -> ImportResult<Vec<Headword>> {
        let mut headwords = Vec::new();
        let mut rest = data;
        for block in blocks {
            let len = to_len(block.compressed, "键块")?;
            if rest.len() < len {
                return Err(truncated("键块"));
            }
            let (raw, tail) = rest.split_at(len);
            rest = tail;

            let decoded = decode_block(raw, block_len(block.decompressed, "键块")?)?;
            let mut cursor = &decoded[..];
            while !cursor.is_empty() {
                let offset = read_number(&mut cursor, header.number_width, "键块")?;
                let text = read_headword_text(&mut cursor, header)?;
                headwords.push(Headword { offset, text });
            }
        }
        Ok(headwords)
    }
}

// ==========================================
// 记录迭代
// ==========================================

/// 一条原始记录: 词头 + 解码后的 HTML 内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdictRecord {
    pub headword: String,
    pub content: String,
}

/// 逐块解压记录区并按词头偏移切分
///
/// - I/O 错误与块损坏为致命错误, 序列随即结束
/// - 单条记录偏移异常或文本无法解码时告警并跳过
pub struct MdictRecords {
    index: Arc<MdictIndex>,
    file: BufReader<File>,
    next_block: usize,
    buffer: Vec<u8>,
    /// buffer[0] 在解压后记录区中的偏移
    buffer_base: u64,
    next_entry: usize,
    done: bool,
}

impl MdictRecords {
    pub fn open(path: &Path, index: Arc<MdictIndex>) -> ImportResult<Self> {
        let mut file = BufReader::new(File::open(path)?);
        file.seek(SeekFrom::Start(index.record_data_offset))?;
        Ok(Self {
            index,
            file,
            next_block: 0,
            buffer: Vec::new(),
            buffer_base: 0,
            next_entry: 0,
            done: false,
        })
    }

    fn buffer_end(&self) -> u64 {
        self.buffer_base + self.buffer.len() as u64
    }

    /// 丢弃已消费的数据并追加下一个记录块
    fn load_next_block(&mut self, keep_from: u64) -> ImportResult<()> {
        let keep_from = keep_from.clamp(self.buffer_base, self.buffer_end());
        let consumed = (keep_from - self.buffer_base) as usize;
        self.buffer.drain(..consumed);
        self.buffer_base = keep_from;

        let block = self.index.record_blocks[self.next_block];
        self.next_block += 1;

        let mut raw = vec![0u8; to_len(block.compressed, "记录块")?];
        self.file.read_exact(&mut raw).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => truncated("记录块"),
            _ => ImportError::from(e),
        })?;
        let decoded = decode_block(&raw, block_len(block.decompressed, "记录块")?)?;
        self.buffer.extend_from_slice(&decoded);
        Ok(())
    }

    fn decode_content(&self, bytes: &[u8]) -> Option<String> {
        let text = self
            .index
            .header
            .encoding
            .decode_without_bom_handling_and_without_replacement(bytes)?;
        Some(text.trim_end_matches('\0').to_string())
    }
}

impl Iterator for MdictRecords {
    type Item = ImportResult<MdictRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done || self.next_entry >= self.index.headwords.len() {
                self.done = true;
                return None;
            }

            let entry_idx = self.next_entry;
            let start = self.index.headwords[entry_idx].offset;
            let end = self
                .index
                .headwords
                .get(entry_idx + 1)
                .map(|h| h.offset)
                .unwrap_or(self.index.record_data_len);

            if end < start || start < self.buffer_base || end > self.index.record_data_len {
                warn!(
                    headword = %self.index.headwords[entry_idx].text,
                    start, end, "MDX 记录偏移异常, 跳过"
                );
                self.next_entry += 1;
                continue;
            }

            if end > self.buffer_end() {
                if self.next_block >= self.index.record_blocks.len() {
                    warn!(headword = %self.index.headwords[entry_idx].text, "MDX 记录越过数据末尾, 跳过");
                    self.next_entry += 1;
                    continue;
                }
                if let Err(e) = self.load_next_block(start) {
                    self.done = true;
                    return Some(Err(e));
                }
                continue;
            }

            self.next_entry += 1;
            let from = (start - self.buffer_base) as usize;
            let to = (end - self.buffer_base) as usize;
            let headword = &self.index.headwords[entry_idx].text;
            match self.decode_content(&self.buffer[from..to]) {
                Some(content) => {
                    return Some(Ok(MdictRecord {
                        headword: headword.clone(),
                        content,
                    }))
                }
                None => {
                    warn!(headword = %headword, "MDX 记录文本解码失败, 跳过");
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn fast_encrypt(data: &mut [u8], key: &[u8]) {
        let mut prev = 0x36u8;
        for (i, byte) in data.iter_mut().enumerate() {
            let cipher = (*byte ^ prev ^ (i as u8) ^ key[i % key.len()]).rotate_left(4);
            *byte = cipher;
            prev = cipher;
        }
    }

    fn block(info: u32, plain: &[u8], payload: Vec<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&info.to_le_bytes());
        out.extend_from_slice(&adler32_of(plain).to_be_bytes());
        out.extend_from_slice(&payload);
        out
    }

    #[test]
    fn test_fast_decrypt_inverts_encrypt() {
        let key = ripemd128(&[b"abcd"]);
        let plain = b"hello mdict world".to_vec();
        let mut data = plain.clone();
        fast_encrypt(&mut data, &key);
        assert_ne!(data, plain);
        fast_decrypt(&mut data, &key);
        assert_eq!(data, plain);
    }

    #[test]
    fn test_decode_raw_and_zlib_blocks() {
        let plain = b"<b>hello</b>\0".to_vec();
        let raw = block(0, &plain, plain.clone());
        assert_eq!(decode_block(&raw, plain.len()).unwrap(), plain);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&plain).unwrap();
        let zipped = block(2, &plain, encoder.finish().unwrap());
        assert_eq!(decode_block(&zipped, plain.len()).unwrap(), plain);
    }

    #[test]
    fn test_decode_encrypted_block() {
        let plain = b"secret record".to_vec();
        let checksum = adler32_of(&plain).to_be_bytes();
        let key = ripemd128(&[&checksum]);
        let mut payload = plain.clone();
        fast_encrypt(&mut payload, &key);
        let encrypted = block(0x10, &plain, payload);
        assert_eq!(decode_block(&encrypted, plain.len()).unwrap(), plain);
    }

    #[test]
    fn test_decode_block_errors() {
        let plain = b"data".to_vec();
        let mut corrupt = block(0, &plain, plain.clone());
        corrupt[8] ^= 0xFF;
        assert!(matches!(
            decode_block(&corrupt, plain.len()),
            Err(ImportError::MalformedInput { .. })
        ));

        let salsa = block(0x20, &plain, plain.clone());
        assert!(matches!(
            decode_block(&salsa, plain.len()),
            Err(ImportError::DependencyUnavailable(_))
        ));

        assert!(matches!(decode_block(&[0, 0], 0), Err(ImportError::MalformedInput { .. })));
    }

    #[test]
    fn test_declared_length_is_bounded() {
        let plain = vec![b'x'; 4096];
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&plain).unwrap();
        let zipped = block(2, &plain, encoder.finish().unwrap());

        let oversized = usize::try_from(MAX_BLOCK_LEN + 1).unwrap();
        assert!(matches!(
            decode_block(&zipped, oversized),
            Err(ImportError::MalformedInput { .. })
        ));
        // 实际输出长于声明长度
        assert!(matches!(
            decode_block(&zipped, 16),
            Err(ImportError::MalformedInput { .. })
        ));
        assert!(block_len(u64::MAX, "记录块").is_err());
        assert!(checked_sum([u64::MAX, 1].into_iter(), "记录块").is_err());
        assert_eq!(checked_sum([3, 4].into_iter(), "记录块").unwrap(), 7);
    }

    #[cfg(not(feature = "lzo"))]
    #[test]
    fn test_lzo_requires_feature() {
        assert!(matches!(ensure_codec(1), Err(ImportError::DependencyUnavailable(_))));
    }

    #[test]
    fn test_header_attributes() {
        let attrs = parse_header_xml(
            r#"<Dictionary GeneratedByEngineVersion="2.0" Encoding="GBK" Encrypted="2" Title="Demo &amp; Test"/>"#,
        )
        .unwrap();
        let header = MdictHeader::from_attributes(&attrs).unwrap();
        assert_eq!(header.number_width, 8);
        assert_eq!(header.encoding, GB18030);
        assert!(header.encrypt_key_index);
        assert!(!header.encrypt_record_blocks);
        assert_eq!(header.title, "Demo & Test");

        let v3 = parse_header_xml(r#"<Dictionary GeneratedByEngineVersion="3.0"/>"#).unwrap();
        assert!(matches!(
            MdictHeader::from_attributes(&v3),
            Err(ImportError::DependencyUnavailable(_))
        ));
    }

    #[test]
    fn test_read_headword_text_utf16() {
        let header = MdictHeader {
            version: 2.0,
            encoding: UTF_16LE,
            number_width: 8,
            encrypt_key_index: false,
            encrypt_record_blocks: false,
            title: String::new(),
            description: None,
        };
        // "hi" + NUL NUL + 剩余
        let bytes = [b'h', 0, b'i', 0, 0, 0, 9];
        let mut cursor = &bytes[..];
        assert_eq!(read_headword_text(&mut cursor, &header).unwrap(), "hi");
        assert_eq!(cursor, &[9]);
    }
}
