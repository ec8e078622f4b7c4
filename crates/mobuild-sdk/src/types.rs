//! Core types for mobuild-sdk.
//!
//! This module defines the fundamental types used throughout the SDK:
//!
//! - [`BuildError`] - Error types for resolution and build operations
//! - [`PathKind`] - The kind of filesystem entry a lookup expected
//! - [`BuildProfile`] - Debug or release compilation
//! - [`HostPlatform`] - The platform a build is requested for
//! - [`BuildOutput`] - Output from build operations

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Error types for mobuild-sdk operations.
///
/// Every error is fatal: nothing in the SDK retries. The CLI renders the
/// error chain and maps it to an exit code.
///
/// # Example
///
/// ```ignore
/// use mobuild_sdk::{BuildError, TargetId};
///
/// match resolver.resolve(TargetId::Arm64Android) {
///     Ok(config) => println!("linker: {:?}", config.linker),
///     Err(BuildError::MissingNdk { .. }) => eprintln!("set NDK_HOME first"),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The target identifier is not one of the known targets.
    ///
    /// The message lists the accepted identifiers.
    #[error("invalid target '{0}'. Valid targets: {valid}", valid = crate::target::TargetId::names().join(", "))]
    UnknownTarget(String),

    /// An Android target was requested but no NDK location is configured.
    #[error("no Android NDK location set. Define one of: {}", .vars.join(", "))]
    MissingNdk {
        /// The environment variables that were checked, in order.
        vars: Vec<&'static str>,
    },

    /// A required toolchain file or directory is missing, or has the wrong kind.
    #[error("{}", missing_tool_message(.path, .expected, .found))]
    MissingTool {
        /// The exact path that was looked up.
        path: PathBuf,
        /// What the lookup expected to find there.
        expected: PathKind,
        /// Whether something else exists at the path.
        found: bool,
    },

    /// The requested host platform is not supported.
    #[error("unsupported platform '{0}'")]
    UnsupportedPlatform(String),

    /// An external tool exited unsuccessfully or could not be started.
    ///
    /// `status` is `None` when the process could not be spawned or was
    /// terminated by a signal.
    #[error("failed to {}: `{command}` {}", .purpose.to_lowercase(), status_message(.status))]
    ToolInvocation {
        /// What the invocation was for, e.g. "Build for sim-x64-ios".
        purpose: String,
        /// The full command line.
        command: String,
        /// The exit code, if the process exited normally.
        status: Option<i32>,
    },

    /// The compiler reported success but the expected artifact is absent.
    #[error("build artifact not found at {}", .path.display())]
    MissingArtifact {
        /// Where the artifact was expected.
        path: PathBuf,
    },

    /// An I/O error occurred while reading or writing project files.
    #[error("I/O error: {0}. Check file paths and permissions")]
    Io(#[from] std::io::Error),

    /// The cargo configuration file could not be serialized or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

fn missing_tool_message(path: &std::path::Path, expected: &PathKind, found: &bool) -> String {
    if *found {
        format!("found {} but it's not a {}", path.display(), expected)
    } else {
        format!("cannot find {} {}", expected, path.display())
    }
}

fn status_message(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exited with status {}", code),
        None => "did not run to completion".to_string(),
    }
}

/// The kind of filesystem entry a toolchain lookup expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// A regular file (executables, the CMake toolchain file).
    File,
    /// A directory (prebuilt toolchain, sysroot, bin).
    Directory,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::File => f.write_str("file"),
            PathKind::Directory => f.write_str("directory"),
        }
    }
}

/// Build profile controlling optimization and debug info.
///
/// Mirrors Cargo's `--release` flag and selects the `debug` or `release`
/// subdirectory of the target directory.
///
/// # Example
///
/// ```
/// use mobuild_sdk::BuildProfile;
///
/// assert_eq!(BuildProfile::Debug.as_str(), "debug");
/// assert_eq!(BuildProfile::from_configuration("Release"), BuildProfile::Release);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProfile {
    /// Debug build with debug symbols and no optimizations.
    Debug,
    /// Release build with optimizations enabled.
    Release,
}

impl BuildProfile {
    /// Returns the string representation of the profile.
    ///
    /// This is also the name of the profile's directory under `target/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
        }
    }

    /// Maps an Xcode `CONFIGURATION` value to a profile.
    ///
    /// Only the exact value `Release` selects a release build.
    pub fn from_configuration(configuration: &str) -> Self {
        if configuration == "Release" {
            BuildProfile::Release
        } else {
            BuildProfile::Debug
        }
    }

    pub fn is_release(&self) -> bool {
        matches!(self, BuildProfile::Release)
    }
}

/// Platform a build is requested for.
///
/// The names match Xcode's `PLATFORM_NAME` values for the Apple platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    /// Physical iOS device (`iphoneos`).
    IphoneOs,
    /// iOS simulator, both architectures (`iphonesimulator`).
    IphoneSimulator,
    /// Android, both ABIs (`android`).
    Android,
    /// The machine running the build (`host`).
    Host,
}

impl HostPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostPlatform::IphoneOs => "iphoneos",
            HostPlatform::IphoneSimulator => "iphonesimulator",
            HostPlatform::Android => "android",
            HostPlatform::Host => "host",
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostPlatform {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iphoneos" => Ok(HostPlatform::IphoneOs),
            "iphonesimulator" => Ok(HostPlatform::IphoneSimulator),
            "android" => Ok(HostPlatform::Android),
            "host" => Ok(HostPlatform::Host),
            other => Err(BuildError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Result of a successful build operation.
///
/// # Example
///
/// ```ignore
/// let output = driver.build(HostPlatform::IphoneSimulator, BuildProfile::Debug)?;
/// if let Some(installed) = &output.installed {
///     println!("Universal binary at {}", installed.display());
/// }
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildOutput {
    /// Platform that was built.
    pub platform: HostPlatform,
    /// Profile that was built.
    pub profile: BuildProfile,
    /// Per-target artifacts produced by cargo, in build order.
    pub artifacts: Vec<PathBuf>,
    /// Where the final library was placed inside the app tree.
    ///
    /// `None` for platforms that have no install step.
    pub installed: Option<PathBuf>,
}
