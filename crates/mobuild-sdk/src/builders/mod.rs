//! Build automation for mobile platforms.
//!
//! [`BuildDriver`] turns a platform request into a fixed sequence of
//! resolutions and external tool invocations, then places the resulting
//! library in the app tree.
//!
//! ## Platforms
//!
//! | Platform | Targets | Output |
//! |----------|---------|--------|
//! | `iphoneos` | `device-arm64-ios` | `libgame.dylib` copied into the app tree |
//! | `iphonesimulator` | `sim-arm64-ios`, `sim-x64-ios` | universal `libgame.dylib` (lipo) |
//! | `android` | `arm64-android`, `armv7-android` | per-ABI `libgame.so`, left in `target/` |
//! | `host` | `host-native` | host library, left in `target/` |
//!
//! ## Example
//!
//! ```ignore
//! use mobuild_sdk::builders::{BuildDriver, ProjectLayout};
//! use mobuild_sdk::{BuildProfile, FileStore, HostPlatform, Resolver, SystemRunner, ToolPaths};
//!
//! let root = std::env::current_dir()?;
//! let resolver = Resolver::new(FileStore::for_project(&root), SystemRunner, ToolPaths::from_env()?);
//! let driver = BuildDriver::new(ProjectLayout::new(&root), resolver);
//! let output = driver.build(HostPlatform::IphoneSimulator, BuildProfile::Release)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod android;
pub mod common;
pub mod ios;

use std::path::{Path, PathBuf};

use log::info;

use crate::runner::CommandRunner;
use crate::store::ConfigStore;
use crate::target::TargetId;
use crate::toolchain::Resolver;
use crate::types::{BuildError, BuildOutput, BuildProfile, HostPlatform};

pub use common::{artifact_file_name, artifact_path};

/// Library built when no name is configured.
pub const DEFAULT_LIBRARY_NAME: &str = "game";

/// Directory, relative to the project root, that receives iOS libraries.
pub const DEFAULT_DESTINATION: &str = "iOS/libs";

/// Where things live in the project being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    library_name: String,
    destination: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            library_name: DEFAULT_LIBRARY_NAME.to_string(),
            destination: PathBuf::from(DEFAULT_DESTINATION),
        }
    }

    /// Sets the cargo library name (the `game` in `libgame.dylib`).
    pub fn library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    /// Sets the destination directory, relative to the root unless absolute.
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get_library_name(&self) -> &str {
        &self.library_name
    }

    pub fn destination_dir(&self) -> PathBuf {
        self.root.join(&self.destination)
    }

    /// Artifact cargo produces for `target`.
    pub fn artifact(&self, target: TargetId, profile: BuildProfile) -> PathBuf {
        artifact_path(
            &self.root,
            target.triple(),
            profile,
            &artifact_file_name(&self.library_name, target.os()),
        )
    }
}

/// Builds the library for a platform and installs it into the app tree.
///
/// Every step is sequential and blocking. A failed step aborts the build and
/// leaves whatever earlier steps produced.
pub struct BuildDriver<S, R> {
    layout: ProjectLayout,
    resolver: Resolver<S, R>,
}

impl<S: ConfigStore, R: CommandRunner> BuildDriver<S, R> {
    pub fn new(layout: ProjectLayout, resolver: Resolver<S, R>) -> Self {
        Self { layout, resolver }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn resolver(&self) -> &Resolver<S, R> {
        &self.resolver
    }

    /// Builds for `platform`.
    pub fn build(
        &self,
        platform: HostPlatform,
        profile: BuildProfile,
    ) -> Result<BuildOutput, BuildError> {
        info!("Building {} ({})", platform, profile.as_str());
        match platform {
            HostPlatform::IphoneOs => self.build_ios_device(profile),
            HostPlatform::IphoneSimulator => self.build_ios_simulator(profile),
            HostPlatform::Android => self.build_android(profile),
            HostPlatform::Host => self.build_host(profile),
        }
    }

    /// Builds for a platform given by name, e.g. Xcode's `PLATFORM_NAME`.
    ///
    /// # Errors
    ///
    /// [`BuildError::UnsupportedPlatform`] for unrecognized names.
    pub fn build_named(
        &self,
        platform_name: &str,
        profile: BuildProfile,
    ) -> Result<BuildOutput, BuildError> {
        let platform: HostPlatform = platform_name.parse()?;
        self.build(platform, profile)
    }

    /// Resolves `target`, runs cargo, and returns the artifact path.
    pub(crate) fn build_target(
        &self,
        target: TargetId,
        profile: BuildProfile,
    ) -> Result<PathBuf, BuildError> {
        self.resolver.resolve(target)?;

        let cmd = common::cargo_build_command(&self.resolver.tools().cargo, self.layout.root(), profile);
        self.resolver
            .runner()
            .run(&format!("Build for {}", target), &cmd)?;

        let artifact = self.layout.artifact(target, profile);
        common::ensure_artifact(&artifact)?;
        Ok(artifact)
    }

    fn build_host(&self, profile: BuildProfile) -> Result<BuildOutput, BuildError> {
        let artifact = self.build_target(TargetId::HostNative, profile)?;
        Ok(BuildOutput {
            platform: HostPlatform::Host,
            profile,
            artifacts: vec![artifact],
            installed: None,
        })
    }
}
