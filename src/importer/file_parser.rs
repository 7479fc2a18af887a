// ==========================================
// 词典导入系统 - 解析器工厂
// ==========================================
// 职责: 按文件格式选择解析器
// 支持: 通用 CSV / ECDICT CSV / JSON / MDX
// ==========================================

use crate::config::ImportSettings;
use crate::domain::dictionary::DictionaryFileInfo;
use crate::domain::types::DictionaryFormat;
use crate::importer::csv_parser::GenericCsvParser;
use crate::importer::ecdict_parser::LexicalCsvParser;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::json_parser::JsonParser;
use crate::importer::mdx_parser::MdxParser;
use crate::importer::parser_trait::{DictionaryParser, EntryStream};
use crate::importer::text_decoder::encoding_for_label;
use std::path::Path;
use tracing::debug;

// ==========================================
// FormatParser - 已知格式的解析器集合
// ==========================================
pub enum FormatParser {
    GenericCsv(GenericCsvParser),
    LexicalCsv(LexicalCsvParser),
    Json(JsonParser),
    Mdx(MdxParser),
}

impl FormatParser {
    fn inner(&self) -> &dyn DictionaryParser {
        match self {
            FormatParser::GenericCsv(p) => p,
            FormatParser::LexicalCsv(p) => p,
            FormatParser::Json(p) => p,
            FormatParser::Mdx(p) => p,
        }
    }
}

impl DictionaryParser for FormatParser {
    fn format(&self) -> DictionaryFormat {
        self.inner().format()
    }

    fn parse(&self) -> ImportResult<EntryStream<'_>> {
        self.inner().parse()
    }

    fn estimate_total_count(&self) -> ImportResult<u64> {
        self.inner().estimate_total_count()
    }

    fn preview(&self, n: usize) -> ImportResult<Vec<crate::domain::dictionary::DictionaryEntry>> {
        self.inner().preview(n)
    }
}

// ==========================================
// ParserFactory
// ==========================================
pub struct ParserFactory;

impl ParserFactory {
    /// 按默认参数创建解析器
    pub fn create(info: &DictionaryFileInfo) -> ImportResult<FormatParser> {
        Self::create_with_settings(info, &ImportSettings::default())
    }

    /// 按格式创建解析器; 未知格式返回 UnsupportedFormat
    pub fn create_with_settings(
        info: &DictionaryFileInfo,
        settings: &ImportSettings,
    ) -> ImportResult<FormatParser> {
        let encoding = encoding_for_label(&info.encoding);
        debug!(
            path = %info.path,
            format = %info.format,
            encoding = encoding.name(),
            "创建解析器"
        );

        let parser = match info.format {
            DictionaryFormat::GenericCsv => {
                FormatParser::GenericCsv(GenericCsvParser::new(&info.path, encoding))
            }
            DictionaryFormat::LexicalCsv => {
                FormatParser::LexicalCsv(LexicalCsvParser::new(&info.path, encoding))
            }
            DictionaryFormat::Json => FormatParser::Json(JsonParser::new(&info.path, encoding)),
            DictionaryFormat::Mdx => FormatParser::Mdx(MdxParser::with_max_chars(
                &info.path,
                settings.translation_max_chars,
            )?),
            DictionaryFormat::Unknown => {
                let ext = Path::new(&info.path)
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| info.path.clone());
                return Err(ImportError::UnsupportedFormat(ext));
            }
        };
        Ok(parser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(path: &str, format: DictionaryFormat) -> DictionaryFileInfo {
        DictionaryFileInfo {
            path: path.to_string(),
            name: "demo".to_string(),
            format,
            encoding: "utf-8".to_string(),
            size: 0,
            size_mb: 0.0,
        }
    }

    #[test]
    fn test_factory_selects_parser_by_format() {
        let cases = [
            DictionaryFormat::GenericCsv,
            DictionaryFormat::LexicalCsv,
            DictionaryFormat::Json,
            DictionaryFormat::Mdx,
        ];
        for format in cases {
            let parser = ParserFactory::create(&info("/tmp/demo", format)).unwrap();
            assert_eq!(parser.format(), format, "工厂应返回对应格式的解析器");
        }
    }

    #[test]
    fn test_factory_rejects_unknown_format() {
        let err = ParserFactory::create(&info("/tmp/demo.txt", DictionaryFormat::Unknown))
            .err()
            .expect("未知格式应报错");
        assert!(matches!(err, ImportError::UnsupportedFormat(ref ext) if ext == "txt"));
    }
}
