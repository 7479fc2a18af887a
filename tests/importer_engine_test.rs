// ==========================================
// 导入编排器测试
// ==========================================
// 测试目标: 批次守恒、进度单调、失败不回滚、名称唯一
// ==========================================

mod test_helpers;

use dict_importer::config::ImportSettings;
use dict_importer::domain::{ImportProgress, ImportRequest, ImportStatus};
use dict_importer::importer::{DictionaryImporterImpl, ImportError, ImportErrorKind, ImportTaskRegistry};
use dict_importer::logging;
use dict_importer::repository::DictionaryRepository;
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_db, generic_csv, write_mdx, write_source, MdxOptions, RecordingRepository};

fn importer_with(
    repo: RecordingRepository,
) -> (Arc<RecordingRepository>, DictionaryImporterImpl<RecordingRepository>) {
    let repo = Arc::new(repo);
    let importer = DictionaryImporterImpl::new(
        Arc::clone(&repo),
        Arc::new(ImportTaskRegistry::new()),
        ImportSettings::default(),
    );
    (repo, importer)
}

#[test]
fn test_batch_count_conservation() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let (repo, importer) = importer_with(RecordingRepository::new(&db_path));
    let source = generic_csv(2500);

    let outcome = importer
        .import_sync(&ImportRequest::new(source.path(), "守恒"), None)
        .unwrap();

    assert_eq!(outcome.entry_count, 2500);
    assert_eq!(outcome.batches, 3, "ceil(2500 / 1000) = 3");
    assert_eq!(repo.batch_sizes(), vec![1000, 1000, 500]);
    assert_eq!(repo.count_entries(outcome.dictionary_id).unwrap(), 2500);

    let record = repo.get_dictionary_by_id(outcome.dictionary_id).unwrap().unwrap();
    assert_eq!(record.import_status, ImportStatus::Completed);
    assert_eq!(record.import_progress, 1.0);
    assert_eq!(record.entry_count, 2500);
}

#[test]
fn test_progress_is_monotonic_and_capped() {
    let (_db, db_path) = create_test_db().unwrap();
    let (repo, importer) = importer_with(RecordingRepository::new(&db_path));
    let source = generic_csv(12_000);

    let seen: Mutex<Vec<ImportProgress>> = Mutex::new(Vec::new());
    let callback = |p: ImportProgress| seen.lock().unwrap().push(p);
    importer
        .import_sync(&ImportRequest::new(source.path(), "进度"), Some(&callback))
        .unwrap();

    let seen = seen.into_inner().unwrap();
    let counts: Vec<u64> = seen.iter().map(|p| p.entry_count).collect();
    assert_eq!(counts, vec![5000, 10_000, 12_000], "每累计 5000 条上报一次, 收尾再上报一次");

    let values: Vec<f64> = seen.iter().map(|p| p.progress).collect();
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "进度应单调不减: {:?}", values);
    assert_eq!(values.last().copied(), Some(1.0));
    assert!(values[..values.len() - 1].iter().all(|v| *v <= 0.99));

    let updates = repo.progress_updates();
    assert_eq!(updates.len(), 3);
    assert_eq!(updates[0].status, ImportStatus::Importing);
    assert_eq!(updates[0].entry_count, Some(5000));
    assert_eq!(updates[2].status, ImportStatus::Completed);
}

#[test]
fn test_persistence_failure_keeps_committed_batches() {
    let (_db, db_path) = create_test_db().unwrap();
    let (repo, importer) = importer_with(RecordingRepository::failing_on_batch(&db_path, 3));
    let source = generic_csv(2500);

    let err = importer
        .import_sync(&ImportRequest::new(source.path(), "失败"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::PersistenceFailure);

    let record = repo.find_by_name("失败").unwrap().expect("记录应保留");
    assert_eq!(record.import_status, ImportStatus::Failed);
    assert_eq!(record.import_progress, 0.0);
    assert_eq!(record.entry_count, 2000, "只计入已成功落库的两批");
    assert!(record.import_error.as_deref().map_or(false, |e| !e.is_empty()));
    assert_eq!(repo.count_entries(record.id).unwrap(), 2000, "已落库批次不回滚");

    let task = importer.get_import_status(record.id).unwrap().unwrap();
    assert_eq!(task.status, ImportStatus::Failed);
    assert_eq!(task.progress, 0.0);
    assert_eq!(task.entry_count, 2000);
    assert!(task.error.is_some());
}

#[test]
fn test_duplicate_name_rejected_before_record() {
    let (_db, db_path) = create_test_db().unwrap();
    let (repo, importer) = importer_with(RecordingRepository::new(&db_path));
    let first = generic_csv(3);
    let second = generic_csv(5);

    importer
        .import_sync(&ImportRequest::new(first.path(), "ECDICT"), None)
        .unwrap();
    let err = importer
        .import_sync(&ImportRequest::new(second.path(), "ECDICT"), None)
        .unwrap_err();

    assert!(matches!(err, ImportError::DuplicateName(ref name) if name == "ECDICT"));
    assert_eq!(err.kind(), ImportErrorKind::Conflict);
    assert_eq!(repo.get_all_dictionaries(false).unwrap().len(), 1, "冲突时不应新建记录");
}

#[test]
fn test_structural_error_marks_record_failed() {
    let (_db, db_path) = create_test_db().unwrap();
    let (repo, importer) = importer_with(RecordingRepository::new(&db_path));
    let source = write_source(".csv", b"term,notes\nhello,hi\n");

    let err = importer
        .import_sync(&ImportRequest::new(source.path(), "缺列"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::MalformedInput);

    let record = repo.find_by_name("缺列").unwrap().unwrap();
    assert_eq!(record.import_status, ImportStatus::Failed);
    assert_eq!(record.entry_count, 0);
    assert!(repo.batch_sizes().is_empty());
}

#[test]
fn test_missing_file_is_not_found() {
    let (_db, db_path) = create_test_db().unwrap();
    let (repo, importer) = importer_with(RecordingRepository::new(&db_path));

    let err = importer
        .import_sync(&ImportRequest::new("/nonexistent/dict.csv", "无"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::NotFound);
    assert!(repo.get_all_dictionaries(false).unwrap().is_empty());
}

#[test]
fn test_malformed_container_marks_record_failed() {
    let (_db, db_path) = create_test_db().unwrap();
    let (repo, importer) = importer_with(RecordingRepository::new(&db_path));
    let options = MdxOptions {
        record_block_size_override: Some((1u64 << 63) + 5),
        ..MdxOptions::default()
    };
    let source = write_mdx(&[("hello", "你好"), ("world", "世界")], &options);

    let err = importer
        .import_sync(&ImportRequest::new(source.path(), "损坏容器"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::MalformedInput);

    let record = repo.find_by_name("损坏容器").unwrap().unwrap();
    assert_eq!(record.import_status, ImportStatus::Failed, "记录不应停留在 importing");
    assert_eq!(record.import_progress, 0.0);
}

#[test]
fn test_panic_during_run_marks_record_failed() {
    let (_db, db_path) = create_test_db().unwrap();
    let (repo, importer) = importer_with(RecordingRepository::panicking_on_batch(&db_path, 2));
    let source = generic_csv(1500);

    let err = importer
        .import_sync(&ImportRequest::new(source.path(), "崩溃"), None)
        .unwrap_err();
    assert!(matches!(err, ImportError::InternalError(_)));

    let record = repo.find_by_name("崩溃").unwrap().unwrap();
    assert_eq!(record.import_status, ImportStatus::Failed);
    assert_eq!(record.entry_count, 1000, "崩溃前已落库的一批保留");

    let task = importer.get_import_status(record.id).unwrap().unwrap();
    assert_eq!(task.status, ImportStatus::Failed);
}
