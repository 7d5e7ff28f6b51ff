use super::*;
use tempfile::TempDir;

fn provenance() -> Provenance {
    Provenance {
        model_id: "hashing-v1-8".to_string(),
        dataset_fingerprint: "abc123".to_string(),
    }
}

fn sample_index() -> VectorIndex {
    VectorIndex::build(
        vec![vec![1.0, 2.0, 3.0], vec![-1.0, 0.5, 0.25], vec![0.0, 0.0, 1.0]],
        vec![RecordId::Int(10), RecordId::from("faq-b"), RecordId::Int(7)],
        Metric::Cosine,
    )
    .expect("index builds")
}

#[test]
fn save_then_load_restores_identical_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("faq_index");
    let index = sample_index();

    let manifest = index.save(&dir, &provenance()).expect("save succeeds");
    assert_eq!(manifest.count, 3);
    assert_eq!(manifest.dimension, 3);
    assert_eq!(manifest.format_version, FORMAT_VERSION);

    let loaded = VectorIndex::load(&dir).expect("load succeeds");
    assert_eq!(loaded.index, index);
    assert_eq!(loaded.manifest, manifest);
    assert_eq!(loaded.manifest.model_id, "hashing-v1-8");
}

#[test]
fn saving_twice_replaces_previous_artifact() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("faq_index");

    let first = sample_index().save(&dir, &provenance()).expect("first save");
    let smaller = VectorIndex::build(vec![vec![1.0, 0.0]], vec![RecordId::Int(1)], Metric::InnerProduct)
        .expect("index builds");
    let second = smaller.save(&dir, &provenance()).expect("second save");

    assert_ne!(first.build_id, second.build_id);
    let loaded = VectorIndex::load(&dir).expect("load succeeds");
    assert_eq!(loaded.index, smaller);
    assert_eq!(loaded.manifest.metric, Metric::InnerProduct);

    // no staging or retired directories left behind
    let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
        .expect("read temp dir")
        .flatten()
        .filter(|entry| entry.file_name() != "faq_index")
        .collect();
    assert!(leftovers.is_empty(), "unexpected leftovers: {leftovers:?}");
}

#[test]
fn empty_index_round_trips() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("empty");
    let index = VectorIndex::build(Vec::new(), Vec::new(), Metric::Cosine).expect("empty builds");

    index.save(&dir, &provenance()).expect("save succeeds");
    let loaded = VectorIndex::load(&dir).expect("load succeeds");
    assert!(loaded.index.is_empty());
    assert!(loaded.index.search(&[1.0], 3).expect("search succeeds").is_empty());
}

#[test]
fn missing_artifact_is_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = VectorIndex::load(&temp_dir.path().join("nothing_here"));
    assert!(matches!(result, Err(FaqError::IndexNotFound(_))));
}

#[test]
fn directory_without_manifest_is_corrupt() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("partial");
    fs::create_dir_all(&dir).expect("create dir");
    fs::write(dir.join(VECTORS_FILE), [0_u8; 12]).expect("write vectors");

    assert!(matches!(
        VectorIndex::load(&dir),
        Err(FaqError::IndexCorrupt(_))
    ));
}

#[test]
fn truncated_vectors_are_corrupt() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("faq_index");
    sample_index().save(&dir, &provenance()).expect("save succeeds");

    let vectors_path = dir.join(VECTORS_FILE);
    let bytes = fs::read(&vectors_path).expect("read vectors");
    fs::write(&vectors_path, &bytes[..bytes.len() - 4]).expect("truncate vectors");

    match VectorIndex::load(&dir) {
        Err(FaqError::IndexCorrupt(msg)) => assert!(msg.contains("bytes"), "{msg}"),
        other => panic!("expected IndexCorrupt, got {other:?}"),
    }
}

#[test]
fn flipped_vector_bytes_fail_checksum() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("faq_index");
    sample_index().save(&dir, &provenance()).expect("save succeeds");

    let vectors_path = dir.join(VECTORS_FILE);
    let mut bytes = fs::read(&vectors_path).expect("read vectors");
    bytes[0] ^= 0xff;
    fs::write(&vectors_path, &bytes).expect("rewrite vectors");

    match VectorIndex::load(&dir) {
        Err(FaqError::IndexCorrupt(msg)) => assert!(msg.contains("checksum"), "{msg}"),
        other => panic!("expected IndexCorrupt, got {other:?}"),
    }
}

#[test]
fn id_count_disagreement_is_corrupt() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("faq_index");
    let mut manifest = sample_index().save(&dir, &provenance()).expect("save succeeds");

    manifest.ids.pop();
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_vec(&manifest).expect("manifest serializes"),
    )
    .expect("rewrite manifest");

    assert!(matches!(
        VectorIndex::load(&dir),
        Err(FaqError::IndexCorrupt(msg)) if msg.contains("id mapping")
    ));
}

#[test]
fn oversized_dimension_is_corrupt() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("faq_index");
    let mut manifest = sample_index().save(&dir, &provenance()).expect("save succeeds");

    manifest.dimension = usize::MAX / 2;
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_vec(&manifest).expect("manifest serializes"),
    )
    .expect("rewrite manifest");

    assert!(matches!(
        VectorIndex::load(&dir),
        Err(FaqError::IndexCorrupt(msg)) if msg.contains("overflow")
    ));
}

#[test]
fn unknown_format_version_is_corrupt() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("faq_index");
    let mut manifest = sample_index().save(&dir, &provenance()).expect("save succeeds");

    manifest.format_version = FORMAT_VERSION + 1;
    fs::write(
        dir.join(MANIFEST_FILE),
        serde_json::to_vec(&manifest).expect("manifest serializes"),
    )
    .expect("rewrite manifest");

    assert!(matches!(
        read_manifest(&dir),
        Err(FaqError::IndexCorrupt(_))
    ));
}

#[test]
fn garbage_manifest_is_corrupt() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path().join("faq_index");
    sample_index().save(&dir, &provenance()).expect("save succeeds");
    fs::write(dir.join(MANIFEST_FILE), b"{ nope").expect("rewrite manifest");

    assert!(matches!(
        VectorIndex::load(&dir),
        Err(FaqError::IndexCorrupt(_))
    ));
}

#[test]
fn relative_location_without_parent_is_supported() {
    let (parent, name) = split_dir(Path::new("faq_index")).expect("split succeeds");
    assert_eq!(parent, PathBuf::from("."));
    assert_eq!(name, "faq_index");
}
