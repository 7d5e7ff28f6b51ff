use super::*;

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn identical_text_yields_identical_vector() {
    let embedder = HashingEmbedder::new(128);
    let first = embedder.embed("How do I apply?").expect("embedding succeeds");
    let second = embedder.embed("How do I apply?").expect("embedding succeeds");

    assert_eq!(first, second);
    assert_eq!(first.len(), 128);
}

#[test]
fn vectors_are_unit_length() {
    let embedder = HashingEmbedder::new(64);
    let vector = embedder
        .embed("Where do I get a dorm room?")
        .expect("embedding succeeds");
    let norm = dot(&vector, &vector).sqrt();
    assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
}

#[test]
fn empty_text_is_zero_vector() {
    let embedder = HashingEmbedder::new(32);
    let vector = embedder.embed("  ?! ").expect("embedding succeeds");
    assert!(vector.iter().all(|&v| v == 0.0));
}

#[test]
fn case_and_punctuation_do_not_matter() {
    let embedder = HashingEmbedder::new(256);
    let a = embedder.embed("How do I APPLY?").expect("embedding succeeds");
    let b = embedder.embed("how do i apply").expect("embedding succeeds");
    assert_eq!(a, b);
}

#[test]
fn shared_vocabulary_scores_higher() {
    let embedder = HashingEmbedder::new(1024);
    let query = embedder.embed("apply for admission").expect("embedding succeeds");
    let related = embedder.embed("How do I apply?").expect("embedding succeeds");
    let unrelated = embedder
        .embed("Where do I get a dorm room?")
        .expect("embedding succeeds");

    assert!(dot(&query, &related) > dot(&query, &unrelated));
}

#[test]
fn batch_matches_single_in_order() {
    let embedder = HashingEmbedder::new(64);
    let texts = vec!["first question".to_string(), "second one".to_string()];
    let batch = embedder.embed_batch(&texts).expect("batch succeeds");

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0], embedder.embed("first question").expect("embedding succeeds"));
    assert_eq!(batch[1], embedder.embed("second one").expect("embedding succeeds"));
}

#[test]
fn model_id_includes_dimension() {
    assert_eq!(HashingEmbedder::new(96).model_id(), "hashing-v1-96");
    assert_ne!(
        HashingEmbedder::new(96).model_id(),
        HashingEmbedder::new(128).model_id()
    );
}
