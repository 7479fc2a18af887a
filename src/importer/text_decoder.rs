// ==========================================
// 词典导入系统 - 文本编码探测与转码
// ==========================================
// 职责: 采样前 10KB 猜测编码; 将任意编码流转为 UTF-8 流
// 工具: encoding_rs
// ==========================================

use crate::importer::error::ImportResult;
use encoding_rs::{CoderResult, Decoder, Encoding, GB18030, UTF_8};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// 编码探测采样字节数
pub const ENCODING_SAMPLE_BYTES: usize = 10_000;

const INPUT_CHUNK: usize = 16 * 1024;

/// 探测文件编码 (读取前 10KB)
///
/// 顺序: BOM → 合法 UTF-8 → 可无损解码的 GB18030 → 回退 UTF-8
pub fn detect_encoding(path: &Path) -> ImportResult<&'static Encoding> {
    let mut sample = Vec::with_capacity(ENCODING_SAMPLE_BYTES);
    File::open(path)?
        .take(ENCODING_SAMPLE_BYTES as u64)
        .read_to_end(&mut sample)?;
    Ok(detect_encoding_from_sample(&sample))
}

/// 对字节样本猜测编码
pub fn detect_encoding_from_sample(sample: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(sample) {
        return encoding;
    }

    match std::str::from_utf8(sample) {
        Ok(_) => return UTF_8,
        // 采样截断在多字节字符中间
        Err(e) if e.error_len().is_none() => return UTF_8,
        Err(_) => {}
    }

    // 同理, GB18030 采样尾部最多截断 3 字节
    for trim in 0..=3usize.min(sample.len()) {
        let candidate = &sample[..sample.len() - trim];
        if GB18030
            .decode_without_bom_handling_and_without_replacement(candidate)
            .is_some()
        {
            return GB18030;
        }
    }

    UTF_8
}

/// 由编码标签解析编码, 无法识别时回退 UTF-8
pub fn encoding_for_label(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or(UTF_8)
}

/// 读取整个文件并解码为 UTF-8 字符串 (非法字节替换为 U+FFFD, 去除 BOM)
pub fn read_to_string_lossy(path: &Path, encoding: &'static Encoding) -> ImportResult<String> {
    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;
    let (text, _, _) = encoding.decode(&raw);
    Ok(text.into_owned())
}

// ==========================================
// DecodingReader - 流式转码 Reader
// ==========================================
// 输出始终为 UTF-8; 输入按块读取, 内存占用恒定
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    input: Box<[u8]>,
    input_start: usize,
    input_end: usize,
    output: Vec<u8>,
    output_pos: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            // new_decoder 会嗅探并剥离 BOM
            decoder: encoding.new_decoder(),
            input: vec![0u8; INPUT_CHUNK].into_boxed_slice(),
            input_start: 0,
            input_end: 0,
            output: Vec::with_capacity(INPUT_CHUNK * 3 + 16),
            output_pos: 0,
            eof: false,
            finished: false,
        }
    }

    fn fill_output(&mut self) -> io::Result<()> {
        self.output.clear();
        self.output_pos = 0;

        if self.input_start == self.input_end && !self.eof {
            let n = self.inner.read(&mut self.input)?;
            self.input_start = 0;
            self.input_end = n;
            if n == 0 {
                self.eof = true;
            }
        }

        let src = &self.input[self.input_start..self.input_end];
        let capacity = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or(src.len() * 3 + 16)
            .max(16);
        self.output.resize(capacity, 0);

        let (result, read, written, _) =
            self.decoder
                .decode_to_utf8(src, &mut self.output, self.eof);
        self.input_start += read;
        self.output.truncate(written);

        if self.eof && result == CoderResult::InputEmpty && self.input_start == self.input_end {
            self.finished = true;
        }
        Ok(())
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.output_pos < self.output.len() {
                let available = &self.output[self.output_pos..];
                let n = available.len().min(buf.len());
                buf[..n].copy_from_slice(&available[..n]);
                self.output_pos += n;
                return Ok(n);
            }
            if self.finished {
                return Ok(0);
            }
            self.fill_output()?;
        }
    }
}
