//! Model bundle persistence
//!
//! - `ModelBundle`: the self-describing output of a training run
//! - Semantic versions and `latest` resolution
//! - Filesystem (bincode + JSON index) and in-memory registries

mod bundle;
mod versioning;

pub use bundle::ModelBundle;
pub use versioning::{
    FsModelRegistry, InMemoryModelRegistry, ModelRegistry, ModelVersion, RegistryEntry, RegistryIndex,
    VersionSpec,
};
