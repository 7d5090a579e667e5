//! Cache short-circuiting against a JSON artifact directory

use std::collections::BTreeMap;

use sil_selectivity::prelude::*;

fn inputs() -> (BTreeMap<String, ResponseMatrix>, BTreeMap<String, Vec<usize>>) {
    // 3 identities x 2 samples
    let columns = vec![
        vec![0.0, 0.0, 0.0, 0.0, 9.0, 9.0],
        vec![5.0, 5.0, 0.0, 0.0, 5.0, 5.0],
        vec![2.0; 6],
        vec![1.0, 3.0, 1.0, 3.0, 1.0, 3.0],
    ];
    let mut features = BTreeMap::new();
    features.insert("l1".to_string(), ResponseMatrix::from_columns(&columns).unwrap());
    features.insert("l2".to_string(), ResponseMatrix::from_columns(&columns[..2]).unwrap());

    let mut significance = BTreeMap::new();
    significance.insert("l1".to_string(), vec![0, 1]);
    significance.insert("l2".to_string(), vec![1]);
    (features, significance)
}

fn layers() -> Vec<LayerSpec> {
    vec![LayerSpec::new("l1", 4), LayerSpec::new("l2", 2)]
}

fn config() -> EncodeConfig {
    EncodeConfig::new(3, 2).with_n(1.0)
}

#[test]
fn test_second_run_skips_classification() {
    let dir = tempfile::tempdir().unwrap();
    let (features, significance) = inputs();

    let mut first = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    first.run_encode(&features, &significance).unwrap();
    let expected = first.sort_dict(["qualified", "encode"]).unwrap();
    assert!(first.store().contains(Artifact::Sort));
    assert!(first.store().contains(Artifact::Encode));

    // no inputs available: a cache miss would fail
    let empty_features: BTreeMap<String, ResponseMatrix> = BTreeMap::new();
    let empty_significance: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut second = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    second.run_encode(&empty_features, &empty_significance).unwrap();

    assert_eq!(second.sort_dict(["qualified", "encode"]).unwrap(), expected);
}

#[test]
fn test_missing_artifacts_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut analysis = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    assert!(matches!(
        analysis.freq_map_all(),
        Err(SelectivityError::MissingDependency(_))
    ));
    assert!(!analysis.store().contains(Artifact::Frequency));
}

#[test]
fn test_frequency_reused_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let (features, significance) = inputs();

    let mut first = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    first.run_encode(&features, &significance).unwrap();
    let built = first.freq_map(["hs"]).unwrap().clone();

    // a different request still returns the stored map
    let mut second = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    let cached = second.freq_map(["qualified"]).unwrap();
    assert_eq!(cached, &built);
    assert!(cached.get("qualified").is_none());
}

#[test]
fn test_removing_artifact_forces_recompute() {
    let dir = tempfile::tempdir().unwrap();
    let (features, significance) = inputs();

    let mut first = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    first.run_encode(&features, &significance).unwrap();
    first.freq_map(["hs"]).unwrap();

    let mut store = JsonDirStore::new(dir.path());
    store.remove(Artifact::Frequency).unwrap();

    let mut second = EncodeAnalysis::new(config(), layers(), store).unwrap();
    let rebuilt = second.freq_map(["qualified"]).unwrap();
    assert!(rebuilt.get("qualified").is_some());
}

#[test]
fn test_stale_frequency_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (features, significance) = inputs();

    let mut first = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    first.run_encode(&features, &significance).unwrap();
    first.freq_map_all().unwrap();

    let mut narrower =
        EncodeAnalysis::new(config(), vec![LayerSpec::new("l1", 4)], JsonDirStore::new(dir.path())).unwrap();
    assert!(matches!(
        narrower.freq_map_all(),
        Err(SelectivityError::StaleArtifact(_))
    ));
}

#[test]
fn test_loaded_frequency_matches_layout() {
    let dir = tempfile::tempdir().unwrap();
    let (features, significance) = inputs();

    let mut analysis = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    analysis.run_encode(&features, &significance).unwrap();
    let freq = analysis.freq_map_all().unwrap();

    let qualified = freq.get("qualified").unwrap();
    assert_eq!(qualified.num_classes(), 3);
    assert_eq!(qualified.num_layers(), 2);

    // l1 unit 0 strongly encodes identity 2 (mean 9 > 3 + 4.24)
    let a_hs = freq.get("a_hs").unwrap();
    assert_eq!(a_hs.column(0), vec![0.0, 0.0, 0.25]);
}

#[test]
fn test_stored_unit_count_mismatch_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let (features, significance) = inputs();

    let mut first = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    first.run_encode(&features, &significance).unwrap();

    let resized = vec![LayerSpec::new("l1", 2), LayerSpec::new("l2", 2)];
    let mut second = EncodeAnalysis::new(config(), resized, JsonDirStore::new(dir.path())).unwrap();
    assert!(matches!(
        second.run_encode(&features, &significance),
        Err(SelectivityError::StaleArtifact(_))
    ));
    assert!(matches!(
        second.units_pct(["qualified"]),
        Err(SelectivityError::StaleArtifact(_))
    ));
}

#[test]
fn test_truncated_frequency_artifact_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (features, significance) = inputs();

    let mut analysis = EncodeAnalysis::new(config(), layers(), JsonDirStore::new(dir.path())).unwrap();
    analysis.run_encode(&features, &significance).unwrap();

    let store = JsonDirStore::new(dir.path());
    std::fs::write(
        store.path(Artifact::Frequency),
        r#"{"layers":["l1","l2"],"categories":{"a_hs":{"num_classes":3,"num_layers":1,"data":[0.0]}}}"#,
    )
    .unwrap();

    let mut reloaded = EncodeAnalysis::new(config(), layers(), store).unwrap();
    assert!(matches!(
        reloaded.freq_map_all(),
        Err(SelectivityError::Serialization(_))
    ));
}

#[test]
fn test_frequency_artifact_with_other_class_count_is_stale() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonDirStore::new(dir.path());
    std::fs::write(
        store.path(Artifact::Frequency),
        r#"{"layers":["l1","l2"],"categories":{"a_hs":{"num_classes":2,"num_layers":2,"data":[0.0,0.0,0.0,0.0]}}}"#,
    )
    .unwrap();

    let mut analysis = EncodeAnalysis::new(config(), layers(), store).unwrap();
    assert!(matches!(
        analysis.freq_map_all(),
        Err(SelectivityError::StaleArtifact(_))
    ));
}
