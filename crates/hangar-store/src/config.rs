use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::file::FileBackend;
use crate::memory::MemoryBackend;
use crate::traits::Backend;

/// Top-level store configuration, usually read from a TOML file.
///
/// ```toml
/// [backend]
/// kind = "file"
/// root = "/var/lib/hangar"
/// sync = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Which storage engine to construct.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    #[default]
    Memory,
    File(FileBackendConfig),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBackendConfig {
    pub root: PathBuf,
    /// `fsync` every record and blob before it is renamed into place.
    #[serde(default = "default_sync")]
    pub sync: bool,
}

fn default_sync() -> bool {
    true
}

impl FileBackendConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sync: default_sync(),
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Construct the configured backend.
    pub fn open(&self) -> StoreResult<Box<dyn Backend>> {
        match &self.backend {
            BackendConfig::Memory => Ok(Box::new(MemoryBackend::new())),
            BackendConfig::File(config) => Ok(Box::new(FileBackend::open(config)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangar_types::{Dev, DevLookup};

    #[test]
    fn default_is_memory() {
        let c = StoreConfig::default();
        assert_eq!(c.backend, BackendConfig::Memory);
        assert_eq!(StoreConfig::from_toml_str("").unwrap(), c);
    }

    #[test]
    fn parses_file_backend() {
        let c = StoreConfig::from_toml_str(
            r#"
            [backend]
            kind = "file"
            root = "/var/lib/hangar"
            sync = false
            "#,
        )
        .unwrap();
        assert_eq!(
            c.backend,
            BackendConfig::File(FileBackendConfig {
                root: PathBuf::from("/var/lib/hangar"),
                sync: false,
            })
        );
    }

    #[test]
    fn sync_defaults_to_true() {
        let c = StoreConfig::from_toml_str(
            r#"
            [backend]
            kind = "file"
            root = "data"
            "#,
        )
        .unwrap();
        assert_eq!(c.backend, BackendConfig::File(FileBackendConfig::new("data")));
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        let err = StoreConfig::from_toml_str("[backend]\nkind = \"postgres\"\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StoreConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn load_and_open_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        let config_path = dir.path().join("hangar.toml");
        std::fs::write(
            &config_path,
            format!("[backend]\nkind = \"file\"\nroot = {:?}\n", root.display().to_string()),
        )
        .unwrap();

        let backend = StoreConfig::load(&config_path).unwrap().open().unwrap();
        let dev = backend.put_dev(Dev::new(DevLookup::new("app"))).unwrap();
        assert_eq!(backend.get_dev(&DevLookup::new("app")).unwrap(), Some(dev));
        assert!(root.join("dev").is_dir());
    }
}
