//! Bundle versioning and registries
//!
//! Bundles are addressed by semantic version. The filesystem registry keeps
//! one bincode file per version plus a JSON index; the in-memory registry
//! backs tests and embedded services.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::bundle::ModelBundle;
use crate::error::{PropvalError, Result};

/// Semantic version, ordered numerically by (major, minor, patch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ModelVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse `MAJOR.MINOR.PATCH`
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(PropvalError::InvalidVersion(format!(
                "expected MAJOR.MINOR.PATCH, got '{}'",
                s
            )));
        }

        let component = |part: &str, label: &str| -> Result<u32> {
            part.parse().map_err(|_| {
                PropvalError::InvalidVersion(format!("invalid {} component '{}' in '{}'", label, part, s))
            })
        };

        Ok(Self {
            major: component(parts[0], "major")?,
            minor: component(parts[1], "minor")?,
            patch: component(parts[2], "patch")?,
        })
    }

    pub fn bump_major(&self) -> Self {
        Self::new(self.major + 1, 0, 0)
    }

    pub fn bump_minor(&self) -> Self {
        Self::new(self.major, self.minor + 1, 0)
    }

    pub fn bump_patch(&self) -> Self {
        Self::new(self.major, self.minor, self.patch + 1)
    }

    fn file_name(&self) -> String {
        format!("v{}.bin", self)
    }

    fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_prefix('v')?.strip_suffix(".bin")?;
        Self::parse(stem).ok()
    }
}

impl std::fmt::Display for ModelVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Default for ModelVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl std::str::FromStr for ModelVersion {
    type Err = PropvalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Which bundle to load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Exact(ModelVersion),
}

impl VersionSpec {
    /// `"latest"` or `"MAJOR.MINOR.PATCH"`
    pub fn parse(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("latest") {
            Ok(VersionSpec::Latest)
        } else {
            ModelVersion::parse(s).map(VersionSpec::Exact)
        }
    }
}

impl std::fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionSpec::Latest => f.write_str("latest"),
            VersionSpec::Exact(v) => write!(f, "{}", v),
        }
    }
}

/// Versioned bundle storage
pub trait ModelRegistry: Send + Sync {
    /// Persist a bundle under its own version; an existing version is a conflict
    fn save(&self, bundle: &ModelBundle) -> Result<ModelVersion>;

    fn load(&self, spec: &VersionSpec) -> Result<Arc<ModelBundle>>;

    /// All stored versions in ascending order
    fn list(&self) -> Result<Vec<ModelVersion>>;

    fn latest(&self) -> Result<Option<ModelVersion>> {
        Ok(self.list()?.into_iter().max())
    }

    /// Version a new bundle should take: next minor after the latest, or 1.0.0
    fn next_version(&self) -> Result<ModelVersion> {
        Ok(self
            .latest()?
            .map(|v| v.bump_minor())
            .unwrap_or_default())
    }
}

/// Index entry (metadata only, without model data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub version: ModelVersion,
    pub model_name: String,
    /// File name relative to the registry root
    pub path: String,
    pub trained_at: DateTime<Utc>,
    pub test_rmse: Option<f64>,
    pub test_r2: Option<f64>,
    pub below_threshold: bool,
}

impl RegistryEntry {
    fn for_bundle(bundle: &ModelBundle) -> Self {
        let score = bundle.selected_score();
        Self {
            version: bundle.version,
            model_name: bundle.model_name.clone(),
            path: bundle.version.file_name(),
            trained_at: bundle.trained_at,
            test_rmse: score.map(|s| s.test_rmse),
            test_r2: score.map(|s| s.test_r2),
            below_threshold: bundle.below_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegistryIndex {
    pub entries: BTreeMap<String, RegistryEntry>,
}

const INDEX_FILE: &str = "index.json";

/// Directory-backed registry: `v{version}.bin` per bundle plus `index.json`
pub struct FsModelRegistry {
    root: PathBuf,
    /// Serializes index rewrites; version files themselves are create-new
    index_lock: Mutex<()>,
}

impl FsModelRegistry {
    /// Create or open a registry rooted at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        let registry = Self {
            root,
            index_lock: Mutex::new(()),
        };
        if !registry.root.join(INDEX_FILE).exists() {
            registry.rebuild_index()?;
        }
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the JSON index
    pub fn index(&self) -> Result<RegistryIndex> {
        let path = self.root.join(INDEX_FILE);
        if !path.exists() {
            return Ok(RegistryIndex::default());
        }
        let file = File::open(&path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn write_index(&self, index: &RegistryIndex) -> Result<()> {
        let tmp = self.root.join(format!("{}.{}.tmp", INDEX_FILE, uuid::Uuid::new_v4()));
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, index)?;
            writer.flush()?;
        }
        fs::rename(&tmp, self.root.join(INDEX_FILE))?;
        Ok(())
    }

    /// Recreate `index.json` from the bundle files on disk
    fn rebuild_index(&self) -> Result<()> {
        let _guard = self.index_lock.lock();
        let mut index = RegistryIndex::default();
        for version in self.scan_versions()? {
            match self.read_bundle(&version) {
                Ok(bundle) => {
                    index
                        .entries
                        .insert(version.to_string(), RegistryEntry::for_bundle(&bundle));
                }
                Err(e) => warn!(version = %version, error = %e, "Skipping unreadable bundle"),
            }
        }
        debug!(root = %self.root.display(), entries = index.entries.len(), "Rebuilt registry index");
        self.write_index(&index)
    }

    fn scan_versions(&self) -> Result<Vec<ModelVersion>> {
        let mut versions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(version) = entry.file_name().to_str().and_then(ModelVersion::from_file_name) {
                versions.push(version);
            }
        }
        versions.sort();
        Ok(versions)
    }

    fn read_bundle(&self, version: &ModelVersion) -> Result<ModelBundle> {
        let path = self.root.join(version.file_name());
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PropvalError::NotFound(format!("model version {}", version)));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(bincode::deserialize_from(BufReader::new(file))?)
    }
}

impl ModelRegistry for FsModelRegistry {
    fn save(&self, bundle: &ModelBundle) -> Result<ModelVersion> {
        let version = bundle.version;
        let target = self.root.join(version.file_name());
        if target.exists() {
            return Err(PropvalError::VersionConflict(version.to_string()));
        }

        let tmp = self.root.join(format!("{}.{}.tmp", version.file_name(), uuid::Uuid::new_v4()));
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            bincode::serialize_into(&mut writer, bundle)?;
            writer.flush()?;
        }

        // Hard-linking fails if the target exists, so two concurrent saves of
        // the same version cannot both win.
        let linked = fs::hard_link(&tmp, &target);
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(PropvalError::VersionConflict(version.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        {
            let _guard = self.index_lock.lock();
            let mut index = self.index()?;
            index
                .entries
                .insert(version.to_string(), RegistryEntry::for_bundle(bundle));
            self.write_index(&index)?;
        }

        info!(
            version = %version,
            model = %bundle.model_name,
            path = %target.display(),
            "Saved model bundle"
        );
        Ok(version)
    }

    fn load(&self, spec: &VersionSpec) -> Result<Arc<ModelBundle>> {
        let version = match spec {
            VersionSpec::Exact(v) => *v,
            VersionSpec::Latest => self
                .latest()?
                .ok_or_else(|| PropvalError::NotFound("no model versions in registry".to_string()))?,
        };
        let bundle = self.read_bundle(&version)?;
        debug!(version = %version, "Loaded model bundle");
        Ok(Arc::new(bundle))
    }

    fn list(&self) -> Result<Vec<ModelVersion>> {
        self.scan_versions()
    }
}

/// Registry held entirely in memory
#[derive(Default)]
pub struct InMemoryModelRegistry {
    bundles: RwLock<BTreeMap<ModelVersion, Arc<ModelBundle>>>,
}

impl InMemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bundles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.read().is_empty()
    }
}

impl ModelRegistry for InMemoryModelRegistry {
    fn save(&self, bundle: &ModelBundle) -> Result<ModelVersion> {
        let mut bundles = self.bundles.write();
        if bundles.contains_key(&bundle.version) {
            return Err(PropvalError::VersionConflict(bundle.version.to_string()));
        }
        bundles.insert(bundle.version, Arc::new(bundle.clone()));
        Ok(bundle.version)
    }

    fn load(&self, spec: &VersionSpec) -> Result<Arc<ModelBundle>> {
        let bundles = self.bundles.read();
        let found = match spec {
            VersionSpec::Exact(v) => bundles.get(v),
            VersionSpec::Latest => bundles.values().next_back(),
        };
        found
            .cloned()
            .ok_or_else(|| PropvalError::NotFound(format!("model version {}", spec)))
    }

    fn list(&self) -> Result<Vec<ModelVersion>> {
        Ok(self.bundles.read().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parsing() {
        let v = ModelVersion::parse("1.2.3").unwrap();
        assert_eq!(v, ModelVersion::new(1, 2, 3));
        assert!(matches!(ModelVersion::parse("1.2"), Err(PropvalError::InvalidVersion(_))));
        assert!(matches!(ModelVersion::parse("1.x.0"), Err(PropvalError::InvalidVersion(_))));
    }

    #[test]
    fn test_version_bumping() {
        let v = ModelVersion::new(1, 2, 3);
        assert_eq!(v.bump_patch().to_string(), "1.2.4");
        assert_eq!(v.bump_minor().to_string(), "1.3.0");
        assert_eq!(v.bump_major().to_string(), "2.0.0");
    }

    #[test]
    fn test_numeric_ordering() {
        let v9 = ModelVersion::parse("1.9.0").unwrap();
        let v10 = ModelVersion::parse("1.10.0").unwrap();
        assert!(v10 > v9);
        assert_eq!(vec![v10, v9].into_iter().max(), Some(v10));
    }

    #[test]
    fn test_version_spec() {
        assert_eq!(VersionSpec::parse("latest").unwrap(), VersionSpec::Latest);
        assert_eq!(
            VersionSpec::parse("2.0.1").unwrap(),
            VersionSpec::Exact(ModelVersion::new(2, 0, 1))
        );
        assert!(VersionSpec::parse("newest").is_err());
    }

    #[test]
    fn test_file_names() {
        let v = ModelVersion::new(1, 10, 0);
        assert_eq!(v.file_name(), "v1.10.0.bin");
        assert_eq!(ModelVersion::from_file_name("v1.10.0.bin"), Some(v));
        assert_eq!(ModelVersion::from_file_name("index.json"), None);
        assert_eq!(ModelVersion::from_file_name("v1.0.0.bin.abc.tmp"), None);
    }

    #[test]
    fn test_empty_registries() {
        let mem = InMemoryModelRegistry::new();
        assert!(matches!(mem.load(&VersionSpec::Latest), Err(PropvalError::NotFound(_))));
        assert_eq!(mem.next_version().unwrap(), ModelVersion::new(1, 0, 0));

        let dir = tempfile::tempdir().unwrap();
        let fs_registry = FsModelRegistry::open(dir.path()).unwrap();
        assert!(fs_registry.list().unwrap().is_empty());
        assert!(dir.path().join(INDEX_FILE).exists());
        assert!(matches!(
            fs_registry.load(&VersionSpec::Exact(ModelVersion::new(3, 0, 0))),
            Err(PropvalError::NotFound(_))
        ));
    }
}
