//! Integration tests for bundle registries

use std::sync::Arc;
use std::thread;

use propval::export::{
    FsModelRegistry, InMemoryModelRegistry, ModelBundle, ModelRegistry, ModelVersion, VersionSpec,
};
use propval::inference::Predictor;
use propval::property::PropertyRecord;
use propval::synthetic::SyntheticHousingGenerator;
use propval::training::{ModelType, TrainEngine, TrainingConfig};
use propval::PropvalError;
use tempfile::TempDir;

fn small_bundle(version: ModelVersion) -> ModelBundle {
    let data = SyntheticHousingGenerator::new(80).generate().unwrap();
    let config = TrainingConfig::default()
        .with_cv_folds(0)
        .with_candidates(vec![ModelType::LinearRegression]);
    TrainEngine::new(config).train(&data, version).unwrap().bundle
}

fn house() -> PropertyRecord {
    PropertyRecord::new()
        .with_number("area_sqft", 1800.0)
        .with_number("bedrooms", 3.0)
        .with_number("bathrooms", 2.0)
        .with_number("age_years", 25.0)
        .with_category("property_type", "condo")
}

// ============================================================================
// Filesystem registry
// ============================================================================

#[test]
fn test_fs_save_and_load_exact() {
    let dir = TempDir::new().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    let bundle = small_bundle(ModelVersion::new(1, 0, 0));

    let saved = registry.save(&bundle).unwrap();
    assert_eq!(saved, ModelVersion::new(1, 0, 0));
    assert!(dir.path().join("v1.0.0.bin").exists());
    assert!(dir.path().join("index.json").exists());

    let loaded = registry.load(&VersionSpec::Exact(saved)).unwrap();
    assert_eq!(loaded.version, bundle.version);
    assert_eq!(loaded.model_name, bundle.model_name);
    assert_eq!(loaded.feature_names, bundle.feature_names);
}

#[test]
fn test_loaded_bundle_serves_like_original() {
    let dir = TempDir::new().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    let bundle = small_bundle(ModelVersion::default());
    registry.save(&bundle).unwrap();

    let original = Predictor::new(Arc::new(bundle)).predict(&house()).unwrap();
    let reopened = FsModelRegistry::open(dir.path()).unwrap();
    let loaded = reopened.load(&VersionSpec::Latest).unwrap();
    let restored = Predictor::new(loaded).predict(&house()).unwrap();

    assert_eq!(original.predicted_price, restored.predicted_price);
    assert_eq!(original.confidence_score, restored.confidence_score);
    assert_eq!(original.narrative, restored.narrative);
    assert_eq!(original.feature_importance, restored.feature_importance);
}

#[test]
fn test_fs_duplicate_version_conflicts() {
    let dir = TempDir::new().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    let bundle = small_bundle(ModelVersion::new(2, 0, 0));

    registry.save(&bundle).unwrap();
    let err = registry.save(&bundle).unwrap_err();
    assert!(matches!(err, PropvalError::VersionConflict(_)));
    assert_eq!(registry.list().unwrap().len(), 1);
}

#[test]
fn test_fs_concurrent_saves_of_one_version() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(FsModelRegistry::open(dir.path()).unwrap());
    let bundle = Arc::new(small_bundle(ModelVersion::new(1, 0, 0)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let bundle = Arc::clone(&bundle);
            thread::spawn(move || registry.save(&bundle))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, PropvalError::VersionConflict(_))));
}

#[test]
fn test_fs_latest_is_numeric() {
    let dir = TempDir::new().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    let base = small_bundle(ModelVersion::new(1, 9, 0));
    let mut newer = base.clone();
    newer.version = ModelVersion::new(1, 10, 0);

    registry.save(&newer).unwrap();
    registry.save(&base).unwrap();

    assert_eq!(registry.latest().unwrap(), Some(ModelVersion::new(1, 10, 0)));
    assert_eq!(registry.load(&VersionSpec::Latest).unwrap().version, ModelVersion::new(1, 10, 0));
    assert_eq!(registry.next_version().unwrap(), ModelVersion::new(1, 11, 0));
    assert_eq!(
        registry.list().unwrap(),
        vec![ModelVersion::new(1, 9, 0), ModelVersion::new(1, 10, 0)]
    );
}

#[test]
fn test_fs_missing_version_not_found() {
    let dir = TempDir::new().unwrap();
    let registry = FsModelRegistry::open(dir.path()).unwrap();
    assert!(matches!(registry.load(&VersionSpec::Latest), Err(PropvalError::NotFound(_))));

    registry.save(&small_bundle(ModelVersion::default())).unwrap();
    let missing = VersionSpec::parse("4.0.0").unwrap();
    assert!(matches!(registry.load(&missing), Err(PropvalError::NotFound(_))));
}

#[test]
fn test_fs_index_rebuilt_when_missing() {
    let dir = TempDir::new().unwrap();
    {
        let registry = FsModelRegistry::open(dir.path()).unwrap();
        registry.save(&small_bundle(ModelVersion::new(1, 2, 0))).unwrap();
    }
    std::fs::remove_file(dir.path().join("index.json")).unwrap();

    let registry = FsModelRegistry::open(dir.path()).unwrap();
    let index = registry.index().unwrap();
    let entry = &index.entries["1.2.0"];
    assert_eq!(entry.version, ModelVersion::new(1, 2, 0));
    assert_eq!(entry.path, "v1.2.0.bin");
}

#[test]
fn test_invalid_version_strings() {
    assert!(matches!(VersionSpec::parse("v1"), Err(PropvalError::InvalidVersion(_))));
    assert!(matches!(ModelVersion::parse("1.2.3.4"), Err(PropvalError::InvalidVersion(_))));
}

// ============================================================================
// In-memory registry
// ============================================================================

#[test]
fn test_memory_registry_semantics() {
    let registry = InMemoryModelRegistry::new();
    let v1 = small_bundle(ModelVersion::new(1, 0, 0));
    let mut v2 = v1.clone();
    v2.version = ModelVersion::new(1, 1, 0);

    registry.save(&v2).unwrap();
    registry.save(&v1).unwrap();
    assert!(matches!(registry.save(&v1), Err(PropvalError::VersionConflict(_))));

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.load(&VersionSpec::Latest).unwrap().version, v2.version);
    assert_eq!(
        registry.load(&VersionSpec::Exact(v1.version)).unwrap().version,
        v1.version
    );
    assert!(matches!(
        registry.load(&VersionSpec::Exact(ModelVersion::new(9, 9, 9))),
        Err(PropvalError::NotFound(_))
    ));
}
