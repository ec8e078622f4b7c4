//! Logical build targets and their compiler target triples.
//!
//! Every [`TargetId`] maps to a fixed [`TargetSpec`] through an exhaustive
//! `match`, so adding a target without a triple mapping does not compile.

use std::fmt;
use std::str::FromStr;

use crate::types::BuildError;

/// Operating system family of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    Ios,
    Android,
    /// Whatever the machine running cargo is.
    Host,
}

/// Static description of a [`TargetId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSpec {
    /// Rust target triple, or `None` for host-native builds.
    pub triple: Option<&'static str>,
    pub os: TargetOs,
}

/// A logical build target.
///
/// # Example
///
/// ```
/// use mobuild_sdk::TargetId;
///
/// let target: TargetId = "armv7-android".parse().unwrap();
/// assert_eq!(target.triple(), Some("armv7-linux-androideabi"));
/// assert_eq!(TargetId::HostNative.triple(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    DeviceArm64Ios,
    SimArm64Ios,
    SimX64Ios,
    Arm64Android,
    Armv7Android,
    HostNative,
}

impl TargetId {
    /// All targets, in the order they are listed to users.
    pub const ALL: [TargetId; 6] = [
        TargetId::DeviceArm64Ios,
        TargetId::SimArm64Ios,
        TargetId::SimX64Ios,
        TargetId::Arm64Android,
        TargetId::Armv7Android,
        TargetId::HostNative,
    ];

    pub fn spec(&self) -> TargetSpec {
        match self {
            TargetId::DeviceArm64Ios => TargetSpec {
                triple: Some("aarch64-apple-ios"),
                os: TargetOs::Ios,
            },
            TargetId::SimArm64Ios => TargetSpec {
                triple: Some("aarch64-apple-ios-sim"),
                os: TargetOs::Ios,
            },
            TargetId::SimX64Ios => TargetSpec {
                triple: Some("x86_64-apple-ios"),
                os: TargetOs::Ios,
            },
            TargetId::Arm64Android => TargetSpec {
                triple: Some("aarch64-linux-android"),
                os: TargetOs::Android,
            },
            TargetId::Armv7Android => TargetSpec {
                triple: Some("armv7-linux-androideabi"),
                os: TargetOs::Android,
            },
            TargetId::HostNative => TargetSpec {
                triple: None,
                os: TargetOs::Host,
            },
        }
    }

    pub fn triple(&self) -> Option<&'static str> {
        self.spec().triple
    }

    pub fn os(&self) -> TargetOs {
        self.spec().os
    }

    /// Canonical identifier, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetId::DeviceArm64Ios => "device-arm64-ios",
            TargetId::SimArm64Ios => "sim-arm64-ios",
            TargetId::SimX64Ios => "sim-x64-ios",
            TargetId::Arm64Android => "arm64-android",
            TargetId::Armv7Android => "armv7-android",
            TargetId::HostNative => "host-native",
        }
    }

    /// Short names used by older build scripts.
    fn legacy_name(&self) -> &'static str {
        match self {
            TargetId::DeviceArm64Ios => "ios",
            TargetId::SimArm64Ios => "ios-sim-arm64",
            TargetId::SimX64Ios => "ios-sim-x64",
            TargetId::Arm64Android => "android",
            TargetId::Armv7Android => "android32",
            TargetId::HostNative => "native",
        }
    }

    /// Canonical identifiers of every target.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(TargetId::as_str).collect()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetId {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetId::ALL
            .into_iter()
            .find(|target| target.as_str() == s || target.legacy_name() == s)
            .ok_or_else(|| BuildError::UnknownTarget(s.to_string()))
    }
}
