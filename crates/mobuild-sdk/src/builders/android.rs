//! Android build automation
//!
//! Builds the library for each supported ABI through the NDK linker wrappers
//! configured by the resolver.

use log::warn;

use super::BuildDriver;
use crate::runner::CommandRunner;
use crate::store::ConfigStore;
use crate::target::TargetId;
use crate::types::{BuildError, BuildOutput, BuildProfile, HostPlatform};

/// Android targets, in build order.
pub const ANDROID_TARGETS: [TargetId; 2] = [TargetId::Arm64Android, TargetId::Armv7Android];

impl<S: ConfigStore, R: CommandRunner> BuildDriver<S, R> {
    /// Builds the library for every Android ABI.
    ///
    /// The `.so` files stay in `target/<triple>/<profile>/`; nothing is
    /// copied into an app tree.
    pub fn build_android(&self, profile: BuildProfile) -> Result<BuildOutput, BuildError> {
        let mut artifacts = Vec::with_capacity(ANDROID_TARGETS.len());
        for target in ANDROID_TARGETS {
            artifacts.push(self.build_target(target, profile)?);
        }

        // TODO: install per-ABI libraries once the Android app tree's jniLibs location is settled
        warn!("Android libraries are not installed into an app tree; they remain in target/");

        Ok(BuildOutput {
            platform: HostPlatform::Android,
            profile,
            artifacts,
            installed: None,
        })
    }
}
