//! Persistence of the cargo configuration file.
//!
//! Resolution communicates with the downstream `cargo build` through a single
//! `.cargo/config.toml` in the project root. Its presence means "cross
//! compiling", its absence means "build for the host". Access goes through the
//! [`ConfigStore`] trait so builds can run against [`MemoryStore`] in tests.
//!
//! The rendered file looks like:
//!
//! ```toml
//! [build]
//! target = "aarch64-linux-android"
//!
//! [target.aarch64-linux-android]
//! linker = "/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/aarch64-linux-android24-clang"
//!
//! [env]
//! AR = "/ndk/toolchains/llvm/prebuilt/linux-x86_64/bin/llvm-ar"
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::BuildError;

/// Location of the configuration file relative to the project root.
pub const CARGO_CONFIG_PATH: &str = ".cargo/config.toml";

/// Contents of `.cargo/config.toml` as written by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoConfig {
    pub build: BuildSection,
    /// Per-triple sections, keyed by target triple.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub target: BTreeMap<String, TargetSection>,
    /// Environment variables cargo exports to build scripts and the compiler.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSection {
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linker: Option<String>,
}

impl CargoConfig {
    pub fn to_toml(&self) -> Result<String, BuildError> {
        toml::to_string(self).map_err(|e| {
            BuildError::Config(format!("Failed to serialize cargo configuration: {}", e))
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, BuildError> {
        toml::from_str(contents)
            .map_err(|e| BuildError::Config(format!("Failed to parse cargo configuration: {}", e)))
    }
}

/// Read/write/delete access to the single cargo configuration.
///
/// Each `write` replaces the whole configuration. Implementations are not
/// expected to be shared between concurrent resolutions.
pub trait ConfigStore {
    /// Returns the current configuration, or `None` when none is persisted.
    fn read(&self) -> Result<Option<CargoConfig>, BuildError>;

    fn write(&self, config: &CargoConfig) -> Result<(), BuildError>;

    /// Removes the configuration. Removing an absent configuration succeeds.
    fn delete(&self) -> Result<(), BuildError>;
}

/// Store backed by `<project_root>/.cargo/config.toml`.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the standard location inside `project_root`.
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(CARGO_CONFIG_PATH))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileStore {
    fn read(&self) -> Result<Option<CargoConfig>, BuildError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => CargoConfig::from_toml(&contents).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, config: &CargoConfig) -> Result<(), BuildError> {
        let contents = config.to_toml()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, contents)?;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }

    fn delete(&self) -> Result<(), BuildError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, for running resolutions without touching disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: RefCell<Option<CargoConfig>>,
    writes: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `write` calls so far.
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self) -> Result<Option<CargoConfig>, BuildError> {
        Ok(self.config.borrow().clone())
    }

    fn write(&self, config: &CargoConfig) -> Result<(), BuildError> {
        *self.config.borrow_mut() = Some(config.clone());
        *self.writes.borrow_mut() += 1;
        Ok(())
    }

    fn delete(&self) -> Result<(), BuildError> {
        self.config.borrow_mut().take();
        Ok(())
    }
}

impl<S: ConfigStore + ?Sized> ConfigStore for &S {
    fn read(&self) -> Result<Option<CargoConfig>, BuildError> {
        (**self).read()
    }

    fn write(&self, config: &CargoConfig) -> Result<(), BuildError> {
        (**self).write(config)
    }

    fn delete(&self) -> Result<(), BuildError> {
        (**self).delete()
    }
}
