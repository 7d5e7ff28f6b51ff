use super::*;
use tempfile::TempDir;

const SAMPLE: &str = r#"{
    "dataset": [
        {"id": 1, "block": "admissions", "subblock": "apply", "question": "How do I apply?", "answer": "Submit form X.", "tags": ["apply", "forms"]},
        {"id": 2, "block": "housing", "subblock": "dorms", "question": "Where do I get a dorm room?", "answer": "Contact housing office.", "tags": []},
        {"id": 3, "block": "admissions", "subblock": "deadlines", "question": "When is the application deadline?", "answer": "July 20.", "tags": ["dates"]}
    ]
}"#;

fn record(id: i64, block: &str, question: &str) -> FaqRecord {
    FaqRecord {
        id: RecordId::Int(id),
        block: block.to_string(),
        subblock: "general".to_string(),
        question: question.to_string(),
        answer: format!("answer {id}"),
        tags: Vec::new(),
    }
}

#[test]
fn parses_well_formed_dataset() {
    let dataset = Dataset::from_json_str(SAMPLE).expect("sample should parse");

    assert_eq!(dataset.len(), 3);
    assert!(dataset.warnings().is_empty());
    assert_eq!(
        dataset.questions(),
        vec![
            "How do I apply?",
            "Where do I get a dorm room?",
            "When is the application deadline?"
        ]
    );
    let first = dataset.get(&RecordId::Int(1)).expect("record 1 exists");
    assert_eq!(first.answer, "Submit form X.");
    assert!(first.has_tag("forms"));
}

#[test]
fn blocks_are_distinct_and_sorted() {
    let dataset = Dataset::from_json_str(SAMPLE).expect("sample should parse");
    let blocks: Vec<String> = dataset.blocks().into_iter().collect();
    assert_eq!(blocks, vec!["admissions", "housing"]);

    let counts = dataset.block_counts();
    assert_eq!(counts.get("admissions"), Some(&2));
    assert_eq!(counts.get("housing"), Some(&1));
}

#[test]
fn missing_top_level_key_is_format_error() {
    let result = Dataset::from_json_str(r#"{"faq": []}"#);
    assert!(matches!(result, Err(FaqError::DataFormat(msg)) if msg.contains("dataset")));
}

#[test]
fn missing_required_field_fails_whole_dataset() {
    let json = r#"{"dataset": [
        {"id": 1, "block": "a", "subblock": "b", "question": "q", "answer": "x"},
        {"id": 2, "block": "a", "subblock": "b", "question": "q2"}
    ]}"#;

    let result = Dataset::from_json_str(json);
    match result {
        Err(FaqError::DataFormat(msg)) => {
            assert!(msg.contains("record #1"), "unexpected message: {msg}");
            assert!(msg.contains("answer"), "unexpected message: {msg}");
        }
        other => panic!("expected DataFormat error, got {other:?}"),
    }
}

#[test]
fn tags_are_optional() {
    let json = r#"{"dataset": [
        {"id": "faq-1", "block": "a", "subblock": "b", "question": "q", "answer": "x"}
    ]}"#;

    let dataset = Dataset::from_json_str(json).expect("tags may be omitted");
    assert_eq!(dataset.records()[0].id, RecordId::from("faq-1"));
    assert!(dataset.records()[0].tags.is_empty());
}

#[test]
fn invalid_json_is_format_error() {
    assert!(matches!(
        Dataset::from_json_str("{not json"),
        Err(FaqError::DataFormat(_))
    ));
}

#[test]
fn duplicate_ids_keep_first_occurrence() {
    let dataset = Dataset::from_records(vec![
        record(1, "a", "first"),
        record(2, "a", "second"),
        record(1, "b", "duplicate of first"),
        record(3, "b", "third"),
    ]);

    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.questions(), vec!["first", "second", "third"]);
    assert_eq!(
        dataset.get(&RecordId::Int(1)).map(|r| r.question.as_str()),
        Some("first")
    );
    assert_eq!(
        dataset.warnings(),
        &[DataQualityWarning::DuplicateId {
            id: RecordId::Int(1),
            first_position: 0,
            duplicate_position: 2,
        }]
    );

    let report = dataset.report();
    assert_eq!(report.duplicate_ids, vec![RecordId::Int(1)]);
    assert!(report.summary().contains("1 duplicate ids skipped"));
}

#[test]
fn fingerprint_tracks_ids_and_questions() {
    let base = Dataset::from_records(vec![record(1, "a", "q1"), record(2, "a", "q2")]);
    let same = Dataset::from_records(vec![record(1, "z", "q1"), record(2, "z", "q2")]);
    let reordered = Dataset::from_records(vec![record(2, "a", "q2"), record(1, "a", "q1")]);
    let edited = Dataset::from_records(vec![record(1, "a", "q1"), record(2, "a", "q2 edited")]);

    assert_eq!(base.fingerprint(), same.fingerprint());
    assert_ne!(base.fingerprint(), reordered.fingerprint());
    assert_ne!(base.fingerprint(), edited.fingerprint());
}

#[test]
fn load_from_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("faq.json");
    std::fs::write(&path, SAMPLE).expect("should write dataset");

    let dataset = Dataset::load(&path).expect("should load dataset");
    assert_eq!(dataset.len(), 3);
    assert!(dataset.report().summary().starts_with("3 records in 2 blocks"));
}

#[test]
fn load_missing_file_is_format_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = Dataset::load(temp_dir.path().join("absent.json"));
    assert!(matches!(result, Err(FaqError::DataFormat(_))));
}
