// ==========================================
// 词典导入系统 - 格式识别
// ==========================================
// 职责: 按扩展名 (CSV 另看首行表头) 判定词典格式;
//       计算源文件描述; 扫描目录
// 红线: 探测至多读取一行, 解码错误不外抛
// ==========================================

use crate::domain::dictionary::DictionaryFileInfo;
use crate::domain::types::DictionaryFormat;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::text_decoder::detect_encoding;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// 首行读取上限
const HEADER_SAMPLE_LIMIT: u64 = 64 * 1024;

/// 扫描时识别的扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["csv", "json", "mdx"];

const LEXICAL_WORD_MARKER: &str = "word";
const LEXICAL_TRANSLATION_MARKER: &str = "translation";
const LEXICAL_EXTRA_MARKERS: [&str; 2] = ["phonetic", "exchange"];

pub struct FormatDetector;

impl FormatDetector {
    /// 判定文件格式
    ///
    /// # 规则
    /// - .mdx → Mdx
    /// - .json → Json
    /// - .csv → 首行同时含 word/translation 且含 phonetic 或 exchange → LexicalCsv, 否则 GenericCsv
    /// - 其他 → Unknown
    pub fn detect(path: &Path) -> DictionaryFormat {
        match extension_of(path).as_deref() {
            Some("mdx") => DictionaryFormat::Mdx,
            Some("json") => DictionaryFormat::Json,
            Some("csv") => Self::classify_csv(path),
            _ => DictionaryFormat::Unknown,
        }
    }

    fn classify_csv(path: &Path) -> DictionaryFormat {
        match read_first_line(path) {
            Some(line) if is_lexical_header(&line) => DictionaryFormat::LexicalCsv,
            Some(_) => DictionaryFormat::GenericCsv,
            None => {
                debug!(file = %path.display(), "无法读取 CSV 首行, 按通用 CSV 处理");
                DictionaryFormat::GenericCsv
            }
        }
    }

    /// 计算源文件描述
    ///
    /// # 返回
    /// - Err(FileNotFound): 文件不存在或不是普通文件
    pub fn file_info(path: &Path) -> ImportResult<DictionaryFileInfo> {
        if !path.is_file() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let absolute = std::fs::canonicalize(path)?;
        let format = Self::detect(&absolute);
        let encoding = detect_encoding(&absolute)?;
        let size = std::fs::metadata(&absolute)?.len();
        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(DictionaryFileInfo {
            path: absolute.display().to_string(),
            name,
            format,
            encoding: encoding.name().to_string(),
            size,
            size_mb: size_in_mb(size),
        })
    }

    /// 扫描目录中的词典文件
    ///
    /// - 目录不存在返回空列表
    /// - 单个文件信息计算失败仅告警跳过
    /// - 按文件名 (不区分大小写) 排序
    pub fn scan_directory(directory: &Path) -> ImportResult<Vec<DictionaryFileInfo>> {
        if !directory.is_dir() {
            debug!(directory = %directory.display(), "扫描目录不存在");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for dir_entry in std::fs::read_dir(directory)? {
            let path = match dir_entry {
                Ok(e) => e.path(),
                Err(e) => {
                    warn!(directory = %directory.display(), error = %e, "读取目录项失败");
                    continue;
                }
            };

            let supported = extension_of(&path)
                .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false);
            if !path.is_file() || !supported {
                continue;
            }

            match Self::file_info(&path) {
                Ok(info) => files.push(info),
                Err(e) => warn!(file = %path.display(), error = %e, "获取文件信息失败"),
            }
        }

        files.sort_by_key(|info| info.name.to_lowercase());
        Ok(files)
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// 读取首行 (上限 64KB, 非法字节按替换字符处理)
fn read_first_line(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file.take(HEADER_SAMPLE_LIMIT));
    let mut raw = Vec::new();
    reader.read_until(b'\n', &mut raw).ok()?;
    Some(String::from_utf8_lossy(&raw).into_owned())
}

fn is_lexical_header(line: &str) -> bool {
    let line = line.to_lowercase();
    line.contains(LEXICAL_WORD_MARKER)
        && line.contains(LEXICAL_TRANSLATION_MARKER)
        && LEXICAL_EXTRA_MARKERS.iter().any(|m| line.contains(m))
}

fn size_in_mb(size: u64) -> f64 {
    let mb = size as f64 / (1024.0 * 1024.0);
    (mb * 100.0).round() / 100.0
}
