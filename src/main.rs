// ==========================================
// 词典导入系统 - 命令行入口
// ==========================================
// 子命令: scan / import / status / list / lookup / preview / delete
// 环境变量: DICT_IMPORTER_DB, DICT_IMPORTER_LANG, RUST_LOG
// ==========================================

use anyhow::Context;
use clap::{Parser, Subcommand};
use dict_importer::i18n::{self, t, t_with_args};
use dict_importer::{db, logging, DictionaryApi, ImportProgress, ImportRequest, ImportTask};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "dict-importer", version, about = "词典导入系统 - 多格式词典解析与批量入库")]
struct Cli {
    /// 数据库文件路径 (默认: DICT_IMPORTER_DB 或系统数据目录)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// 输出语言 (zh-CN / en)
    #[arg(long, global = true)]
    lang: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 扫描目录中的词典文件 (缺省为配置的词典目录)
    Scan { dir: Option<PathBuf> },

    /// 导入一个或多个词典文件 (多个文件并发导入)
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// 词典名 (仅单文件时有效, 缺省取文件名)
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        priority: Option<i32>,
    },

    /// 查询导入状态
    Status { id: i64 },

    /// 列出已导入的词典
    List {
        #[arg(long)]
        enabled_only: bool,
    },

    /// 跨词典查词
    Lookup { word: String },

    /// 预览文件前若干条词条
    Preview {
        file: PathBuf,

        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// 删除词典及其词条
    Delete { id: i64 },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_with_default("warn");
    i18n::init_from_env();
    if let Some(lang) = &cli.lang {
        i18n::set_locale(lang);
    }

    let db_path = cli.db.clone().unwrap_or_else(db::default_db_path);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("无法创建数据库目录: {}", parent.display()))?;
    }
    let db_path = db_path.to_string_lossy().to_string();

    let runtime = tokio::runtime::Runtime::new().context("无法创建异步运行时")?;
    let api = runtime.block_on(DictionaryApi::new(&db_path))?;
    tracing::info!(
        "{} / {}",
        t_with_args("app.banner", &[("version", dict_importer::VERSION)]),
        t_with_args("app.database", &[("path", &db_path)])
    );

    match cli.command {
        Command::Scan { dir } => run_scan(&api, dir.as_deref()),
        Command::Import {
            files,
            name,
            description,
            priority,
        } => {
            let requests: Vec<ImportRequest> = files
                .iter()
                .map(|file| ImportRequest {
                    file_path: file.clone(),
                    name: if files.len() == 1 {
                        name.clone().unwrap_or_default()
                    } else {
                        String::new()
                    },
                    description: description.clone(),
                    priority,
                })
                .collect();
            if requests.len() == 1 {
                run_import(&api, &requests[0])
            } else {
                run_batch_import(&runtime, &api, requests)
            }
        }
        Command::Status { id } => run_status(&api, id),
        Command::List { enabled_only } => run_list(&api, enabled_only),
        Command::Lookup { word } => run_lookup(&api, &word),
        Command::Preview { file, count } => run_preview(&api, &file, count),
        Command::Delete { id } => {
            if api.delete_dictionary(id)? {
                println!("{}", t_with_args("delete.success", &[("id", &id.to_string())]));
            } else {
                println!("{}", t_with_args("delete.not_found", &[("id", &id.to_string())]));
            }
            Ok(())
        }
    }
}

fn run_scan(api: &DictionaryApi, dir: Option<&Path>) -> anyhow::Result<()> {
    let files = api.scan(dir)?;
    let shown = dir.unwrap_or(api.dictionary_directory()).display().to_string();
    if files.is_empty() {
        println!("{}", t_with_args("scan.empty", &[("dir", &shown)]));
        return Ok(());
    }

    println!(
        "{}",
        t_with_args("scan.found", &[("dir", &shown), ("count", &files.len().to_string())])
    );
    for file in files {
        println!(
            "  {:<32} {:<7} {:<10} {:>9.2} MB",
            file.name, file.format, file.encoding, file.size_mb
        );
    }
    Ok(())
}

fn import_progress_bar(name: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(name.to_string());
    pb
}

fn run_import(api: &DictionaryApi, request: &ImportRequest) -> anyhow::Result<()> {
    let label = request.file_path.display().to_string();
    println!(
        "{}",
        t_with_args("import.started", &[("name", &request.name), ("path", &label)])
    );

    let bar = import_progress_bar(&label);
    let bar_handle = bar.clone();
    let on_progress = move |p: ImportProgress| {
        bar_handle.set_position((p.progress * 100.0).round() as u64);
        bar_handle.set_message(format!("{} ({})", label, p.entry_count));
    };

    let result = api.import_sync(request, Some(&on_progress));
    bar.finish_and_clear();

    match result {
        Ok(id) => {
            println!("{}", t("import.completed"));
            print_summary(api, id)
        }
        Err(e) => {
            eprintln!("{}", t_with_args("import.failed", &[("error", &e.to_string())]));
            Err(e.into())
        }
    }
}

fn run_batch_import(
    runtime: &tokio::runtime::Runtime,
    api: &DictionaryApi,
    requests: Vec<ImportRequest>,
) -> anyhow::Result<()> {
    let results = runtime.block_on(api.batch_import(requests))?;
    for task in api.list_import_tasks()? {
        print_task(&task);
    }

    let failed: Vec<String> = results.into_iter().filter_map(Result::err).collect();
    for message in &failed {
        eprintln!("{}", t_with_args("import.failed", &[("error", message)]));
    }
    if !failed.is_empty() {
        anyhow::bail!("{} 个文件导入失败", failed.len());
    }
    Ok(())
}

fn print_summary(api: &DictionaryApi, id: i64) -> anyhow::Result<()> {
    if let Some(task) = api.get_import_status(id)? {
        println!(
            "{}",
            t_with_args(
                "import.summary",
                &[
                    ("name", &task.dictionary_name),
                    ("id", &id.to_string()),
                    ("count", &task.entry_count.to_string()),
                    ("ms", &task.elapsed_ms().unwrap_or(0).to_string()),
                ]
            )
        );
    }
    Ok(())
}

fn print_task(task: &ImportTask) {
    println!(
        "{}",
        t_with_args(
            "status.line",
            &[
                ("name", &task.dictionary_name),
                ("id", &task.dictionary_id.to_string()),
                ("status", task.status.as_str()),
                ("progress", &format!("{:.1}", task.progress * 100.0)),
                ("count", &task.entry_count.to_string()),
            ]
        )
    );
    if let Some(error) = &task.error {
        println!("  {}", error);
    }
}

fn run_status(api: &DictionaryApi, id: i64) -> anyhow::Result<()> {
    match api.get_import_status(id)? {
        Some(task) => print_task(&task),
        None => println!("{}", t_with_args("status.not_found", &[("id", &id.to_string())])),
    }
    Ok(())
}

fn run_list(api: &DictionaryApi, enabled_only: bool) -> anyhow::Result<()> {
    let records = api.list_dictionaries(enabled_only)?;
    if records.is_empty() {
        println!("{}", t("list.empty"));
        return Ok(());
    }
    for r in records {
        println!(
            "{:>4}  {:<24} {:<7} {:>9} prio={:<5} {} {}",
            r.id,
            r.name,
            r.source_format,
            r.entry_count,
            r.priority,
            if r.enabled { "on " } else { "off" },
            r.import_status
        );
    }
    Ok(())
}

fn run_lookup(api: &DictionaryApi, word: &str) -> anyhow::Result<()> {
    let hits = api.lookup_word(word)?;
    if hits.is_empty() {
        println!("{}", t_with_args("lookup.empty", &[("word", word)]));
        return Ok(());
    }
    for hit in hits {
        let phonetic = hit
            .entry
            .phonetic_uk
            .as_deref()
            .map(|p| format!(" [{}]", p))
            .unwrap_or_default();
        println!("[{}] {}{}", hit.dictionary_name, hit.entry.word, phonetic);
        println!("    {}", hit.entry.translation);
    }
    Ok(())
}

fn run_preview(api: &DictionaryApi, file: &Path, count: usize) -> anyhow::Result<()> {
    let entries = api.preview(file, count)?;
    if entries.is_empty() {
        println!("{}", t("preview.empty"));
        return Ok(());
    }
    for entry in entries {
        println!("{}\t{}", entry.word, entry.translation);
    }
    Ok(())
}
