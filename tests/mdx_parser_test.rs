// ==========================================
// MDX 解析器测试
// ==========================================
// 测试目标: 容器解析 (压缩/混淆/跨块记录), HTML 清洗, 错误分类
// ==========================================

mod test_helpers;

use dict_importer::importer::mdict_reader::{MdictReader, MAX_BLOCK_LEN};
use dict_importer::importer::{DictionaryParser, ImportError, ImportErrorKind, MdxParser};
use test_helpers::{build_mdx, build_mdx_bytes, write_mdx, write_source, MdxOptions};

const SAMPLE: [(&str, &str); 4] = [
    ("hello", "<b>hello</b> [həˈləʊ] int. 你好 &amp; 喂"),
    ("world", "<div>n. 世界</div>"),
    ("blank", "<br/>  "),
    ("", "<p>无词头</p>"),
];

fn parse_all(parser: &MdxParser) -> Vec<dict_importer::DictionaryEntry> {
    parser
        .parse()
        .expect("打开 MDX 失败")
        .collect::<Result<Vec<_>, _>>()
        .expect("解析 MDX 失败")
}

#[test]
fn test_parse_zlib_container() {
    let file = write_mdx(&SAMPLE, &MdxOptions::default());
    let parser = MdxParser::new(file.path()).unwrap();

    assert_eq!(parser.estimate_total_count().unwrap(), 4, "估计值为容器词头数");
    assert_eq!(parser.title().unwrap(), "测试词典");

    let entries = parse_all(&parser);
    assert_eq!(entries.len(), 2, "空词头与空释义应跳过");

    assert_eq!(entries[0].word, "hello");
    assert_eq!(entries[0].translation, "hello [həˈləʊ] int. 你好 & 喂");
    assert_eq!(entries[0].phonetic_uk.as_deref(), Some("həˈləʊ"));

    assert_eq!(entries[1].word, "world");
    assert_eq!(entries[1].translation, "n. 世界");
    assert_eq!(entries[1].phonetic_uk, None);
}

#[test]
fn test_parse_uncompressed_and_obfuscated_index() {
    let options = MdxOptions {
        compression: 0,
        encrypt_key_index: true,
        record_block_bytes: 7,
        keys_per_block: 1,
        ..MdxOptions::default()
    };
    let file = write_mdx(&SAMPLE, &options);
    let parser = MdxParser::new(file.path()).unwrap();

    let words: Vec<String> = parse_all(&parser).into_iter().map(|e| e.word).collect();
    assert_eq!(words, vec!["hello".to_string(), "world".to_string()]);
}

#[test]
fn test_records_spanning_blocks() {
    let long_html = format!("<p>{}</p>", "释义".repeat(200));
    let entries = [("alpha", long_html.as_str()), ("beta", "<i>乙</i>"), ("gamma", "丙")];
    let options = MdxOptions {
        record_block_bytes: 50,
        ..MdxOptions::default()
    };
    let file = write_mdx(&entries, &options);

    let index = MdictReader::open_index(file.path()).unwrap();
    assert!(index.record_blocks.len() > 5, "长记录应跨越多个记录块");

    let parsed = parse_all(&MdxParser::new(file.path()).unwrap());
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[0].translation, "释义".repeat(200));
    assert_eq!(parsed[1].translation, "乙");
    assert_eq!(parsed[2].translation, "丙");
}

#[test]
fn test_translation_is_truncated() {
    let long_html = "词".repeat(50);
    let file = write_mdx(&[("long", long_html.as_str())], &MdxOptions::default());
    let parser = MdxParser::with_max_chars(file.path(), 10).unwrap();

    let entries = parse_all(&parser);
    assert_eq!(entries[0].translation.chars().count(), 10);
}

#[test]
fn test_parse_is_restartable() {
    let file = write_mdx(&SAMPLE, &MdxOptions::default());
    let parser = MdxParser::new(file.path()).unwrap();

    assert_eq!(parser.parse().unwrap().count(), 2);
    assert_eq!(parser.parse().unwrap().count(), 2);
    assert_eq!(parser.preview(1).unwrap().len(), 1);
}

#[test]
fn test_truncated_container_is_malformed() {
    let bytes = build_mdx(&SAMPLE, &MdxOptions::default());
    let file = write_source(".mdx", &bytes[..bytes.len() / 2]);
    let parser = MdxParser::new(file.path()).unwrap();

    let err = parser.estimate_total_count().unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::MalformedInput, "截断文件应报格式错误: {}", err);
}

#[test]
fn test_corrupt_record_block_fails_stream() {
    let mut bytes = build_mdx(&SAMPLE, &MdxOptions::default());
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    let file = write_source(".mdx", &bytes);
    let parser = MdxParser::new(file.path()).unwrap();

    let results: Vec<_> = parser.parse().unwrap().collect();
    let err = results
        .last()
        .and_then(|r| r.as_ref().err())
        .expect("损坏的记录块应以错误结束序列");
    assert!(matches!(err, ImportError::MalformedInput { .. }));
}

#[test]
fn test_not_a_container() {
    let file = write_source(".mdx", b"this is plain text, not an mdict container");
    let parser = MdxParser::new(file.path()).unwrap();
    assert!(matches!(
        parser.parse().err(),
        Some(ImportError::MalformedInput { .. })
    ));
}

#[test]
fn test_v3_container_needs_missing_decoder() {
    let options = MdxOptions {
        engine_version: "3.0".to_string(),
        ..MdxOptions::default()
    };
    let file = write_mdx(&SAMPLE, &options);
    let parser = MdxParser::new(file.path()).unwrap();

    let err = parser.estimate_total_count().unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::DependencyUnavailable);
}

#[test]
fn test_oversized_block_length_is_malformed() {
    for size in [(1u64 << 63) + 5, MAX_BLOCK_LEN + 1, u64::MAX] {
        let options = MdxOptions {
            record_block_size_override: Some(size),
            ..MdxOptions::default()
        };
        let file = write_mdx(&SAMPLE, &options);
        let parser = MdxParser::new(file.path()).unwrap();

        let err = parser.estimate_total_count().unwrap_err();
        assert_eq!(err.kind(), ImportErrorKind::MalformedInput, "解压长度 {} 应报格式错误", size);
        assert!(matches!(
            parser.parse().err(),
            Some(ImportError::MalformedInput { .. })
        ));
    }
}

#[test]
fn test_undecodable_record_is_skipped() {
    let entries: [(&str, &[u8]); 3] = [
        ("first", "n. 第一".as_bytes()),
        ("broken", &[0xFF, 0xFE, b'x', 0xC3]),
        ("last", "n. 最后".as_bytes()),
    ];
    let file = write_source(".mdx", &build_mdx_bytes(&entries, &MdxOptions::default()));
    let parser = MdxParser::new(file.path()).unwrap();

    let results: Vec<_> = parser.parse().unwrap().collect();
    assert!(results.iter().all(|r| r.is_ok()), "单条解码失败不应中断序列");
    let words: Vec<String> = results.into_iter().map(|r| r.unwrap().word).collect();
    assert_eq!(words, vec!["first".to_string(), "last".to_string()]);
}

#[test]
fn test_out_of_range_offset_is_skipped() {
    // c 的偏移越界: b 的结束位置与 c 的起始位置均异常
    let entries = [("a", "甲"), ("b", "乙"), ("c", "丙"), ("d", "丁")];
    let options = MdxOptions {
        offset_overrides: vec![(2, 1 << 40)],
        ..MdxOptions::default()
    };
    let file = write_mdx(&entries, &options);
    let parser = MdxParser::new(file.path()).unwrap();

    let results: Vec<_> = parser.parse().unwrap().collect();
    assert!(results.iter().all(|r| r.is_ok()));
    let words: Vec<String> = results.into_iter().map(|r| r.unwrap().word).collect();
    assert_eq!(words, vec!["a".to_string(), "d".to_string()]);
}
