//! Toolchain resolution and build automation for Rust libraries embedded in
//! mobile apps.
//!
//! `mobuild-sdk` prepares a project for cross-compilation to iOS and Android,
//! drives `cargo`, and installs the produced shared library into the app's
//! build tree. It is meant to be invoked from Xcode build phases or Android
//! Studio through the `mobuild` CLI.
//!
//! # Architecture
//!
//! - **Targets** ([`target`]): the fixed set of logical targets and their triples
//! - **Resolver** ([`toolchain`]): target -> toolchain configuration, persisted
//!   as `.cargo/config.toml` through a [`ConfigStore`]
//! - **NDK discovery** ([`ndk`]): Android toolchain paths and linker naming
//! - **Builders** ([`builders`]): per-platform build sequences
//! - **Runner** ([`runner`]): external tool execution
//!
//! # Example
//!
//! ```ignore
//! use mobuild_sdk::{FileStore, Resolver, SystemRunner, TargetId, ToolPaths};
//! use mobuild_sdk::ndk::ndk_home_from_env;
//!
//! let root = std::env::current_dir()?;
//! let resolver = Resolver::new(FileStore::for_project(&root), SystemRunner, ToolPaths::from_env()?)
//!     .ndk_home(ndk_home_from_env());
//!
//! let config = resolver.resolve(TargetId::Arm64Android)?;
//! println!("linker: {:?}", config.linker);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builders;
pub mod ndk;
pub mod runner;
pub mod store;
pub mod target;
pub mod toolchain;
pub mod types;

pub use builders::{BuildDriver, ProjectLayout};
pub use runner::{CommandRunner, SystemRunner, ToolCommand};
pub use store::{CargoConfig, ConfigStore, FileStore, MemoryStore};
pub use target::{TargetId, TargetOs};
pub use toolchain::{Resolver, ToolPaths, ToolchainConfiguration};
pub use types::{BuildError, BuildOutput, BuildProfile, HostPlatform, PathKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
