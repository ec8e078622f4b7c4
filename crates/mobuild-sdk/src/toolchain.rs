//! Toolchain resolution.
//!
//! [`Resolver::resolve`] turns a [`TargetId`] into a [`ToolchainConfiguration`]
//! and persists it through a [`ConfigStore`], so that a subsequent plain
//! `cargo build` compiles for that target:
//!
//! 1. Make sure the Rust toolchain is installed and knows the triple.
//! 2. For Android, locate the NDK tools (see [`crate::ndk`]).
//! 3. Write `.cargo/config.toml`, or delete it for host-native builds.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::ndk::{AndroidToolchain, DEFAULT_API_LEVEL, HostOs, NDK_ENV_VARS};
use crate::runner::{CommandRunner, ToolCommand};
use crate::store::{BuildSection, CargoConfig, ConfigStore, TargetSection};
use crate::target::{TargetId, TargetOs};
use crate::types::BuildError;

/// Rust toolchain channel installed by default.
pub const DEFAULT_CHANNEL: &str = "stable";

/// Locations of the rustup-managed binaries.
///
/// IDEs do not see the user's shell `PATH`, so tools are invoked by full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub rustup: PathBuf,
    pub cargo: PathBuf,
}

impl ToolPaths {
    /// Tools inside `bin_dir`.
    pub fn in_dir(bin_dir: &Path) -> Self {
        Self {
            rustup: bin_dir.join("rustup"),
            cargo: bin_dir.join("cargo"),
        }
    }

    /// Tools inside `<home>/.cargo/bin`.
    pub fn from_home(home: &Path) -> Self {
        Self::in_dir(&home.join(".cargo").join("bin"))
    }

    /// Tools inside `$HOME/.cargo/bin`.
    pub fn from_env() -> Result<Self, BuildError> {
        let home = env::var_os("HOME").ok_or_else(|| {
            BuildError::Config(
                "HOME is not set; cannot locate ~/.cargo/bin/rustup and ~/.cargo/bin/cargo"
                    .to_string(),
            )
        })?;
        Ok(Self::from_home(Path::new(&home)))
    }
}

/// Everything cargo needs to build for one target.
///
/// Produced fresh by each [`Resolver::resolve`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainConfiguration {
    /// Canonical target identifier.
    pub target: String,
    /// Rust target triple; `None` for host-native builds.
    pub triple: Option<String>,
    /// Linker override (Android only).
    pub linker: Option<PathBuf>,
    /// Environment block (Android only).
    pub env: Option<BTreeMap<String, String>>,
}

impl ToolchainConfiguration {
    /// The cargo configuration to persist, or `None` when cargo should fall
    /// back to its default host target.
    pub fn to_cargo_config(&self) -> Option<CargoConfig> {
        let triple = self.triple.as_ref()?;

        let mut target = BTreeMap::new();
        if let Some(linker) = &self.linker {
            target.insert(
                triple.clone(),
                TargetSection {
                    linker: Some(linker.display().to_string()),
                },
            );
        }

        Some(CargoConfig {
            build: BuildSection {
                target: triple.clone(),
            },
            target,
            env: self.env.clone().unwrap_or_default(),
        })
    }
}

/// Resolves targets and persists the resulting cargo configuration.
///
/// Owns the configuration store, so only one resolution can be in flight.
pub struct Resolver<S, R> {
    store: S,
    runner: R,
    tools: ToolPaths,
    channel: String,
    setup_toolchain: bool,
    api_level: u32,
    ndk_home: Option<PathBuf>,
    host_os: Option<HostOs>,
}

impl<S: ConfigStore, R: CommandRunner> Resolver<S, R> {
    /// Creates a resolver with default settings.
    ///
    /// No NDK location is set; use [`Resolver::ndk_home`] (typically with
    /// [`crate::ndk::ndk_home_from_env`]) before resolving Android targets.
    pub fn new(store: S, runner: R, tools: ToolPaths) -> Self {
        Self {
            store,
            runner,
            tools,
            channel: DEFAULT_CHANNEL.to_string(),
            setup_toolchain: true,
            api_level: DEFAULT_API_LEVEL,
            ndk_home: None,
            host_os: None,
        }
    }

    /// Sets the rustup channel to install and register targets with.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Enables or disables the rustup install/target/update steps.
    pub fn setup_toolchain(mut self, setup: bool) -> Self {
        self.setup_toolchain = setup;
        self
    }

    /// Sets the Android API level of the linker wrapper.
    pub fn api_level(mut self, api_level: u32) -> Self {
        self.api_level = api_level;
        self
    }

    pub fn ndk_home(mut self, ndk_home: Option<PathBuf>) -> Self {
        self.ndk_home = ndk_home;
        self
    }

    /// Overrides host OS detection for NDK prebuilt lookups.
    pub fn host_os(mut self, host_os: HostOs) -> Self {
        self.host_os = Some(host_os);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// Resolves `target` and rewrites the persisted cargo configuration.
    ///
    /// # Errors
    ///
    /// * [`BuildError::ToolInvocation`] if a rustup step fails
    /// * [`BuildError::MissingNdk`] for Android targets without an NDK location
    /// * [`BuildError::MissingTool`] if an NDK file or directory is missing
    ///
    /// Nothing is written or deleted when an error is returned.
    pub fn resolve(&self, target: TargetId) -> Result<ToolchainConfiguration, BuildError> {
        let triple = target.triple();

        if self.setup_toolchain {
            self.install_toolchain(triple)?;
        }

        let android = match target.os() {
            TargetOs::Android => {
                let triple = triple.ok_or_else(|| {
                    BuildError::Config(format!("Android target {} has no triple", target))
                })?;
                Some(self.locate_android(triple)?)
            }
            TargetOs::Ios | TargetOs::Host => None,
        };

        let config = ToolchainConfiguration {
            target: target.as_str().to_string(),
            triple: triple.map(str::to_string),
            linker: android.as_ref().map(|a| a.linker.clone()),
            env: android.as_ref().map(AndroidToolchain::env_vars),
        };

        match config.to_cargo_config() {
            Some(cargo_config) => {
                self.store.write(&cargo_config)?;
                info!("Configured cargo for {} ({})", target, cargo_config.build.target);
            }
            None => {
                self.store.delete()?;
                info!("Configured cargo for {} (host default)", target);
            }
        }

        Ok(config)
    }

    fn install_toolchain(&self, triple: Option<&str>) -> Result<(), BuildError> {
        let rustup = &self.tools.rustup;
        let channel = self.channel.as_str();

        self.runner.run(
            &format!("Install rust {}", channel),
            &ToolCommand::new(rustup).args(["install", channel]),
        )?;
        if let Some(triple) = triple {
            self.runner.run(
                "Add rust target",
                &ToolCommand::new(rustup).args(["target", "add", triple, "--toolchain", channel]),
            )?;
        }
        self.runner.run(
            &format!("Update rust {}", channel),
            &ToolCommand::new(rustup).args(["update", channel]),
        )
    }

    fn locate_android(&self, triple: &str) -> Result<AndroidToolchain, BuildError> {
        let ndk_home = self.ndk_home.as_deref().ok_or_else(|| BuildError::MissingNdk {
            vars: NDK_ENV_VARS.to_vec(),
        })?;
        let host_os = match self.host_os {
            Some(host_os) => host_os,
            None => HostOs::current()?,
        };
        debug!(
            "Locating NDK tools for {} (API {}) in {}",
            triple,
            self.api_level,
            ndk_home.display()
        );
        AndroidToolchain::locate(ndk_home, triple, self.api_level, host_os)
    }
}
