//! iOS build automation
//!
//! Device builds copy a single arm64 library into the app tree. Simulator
//! builds compile both simulator architectures and merge them with `lipo`
//! into one universal library.

use std::path::Path;

use log::info;

use super::BuildDriver;
use super::common::{ensure_dir, install_artifact};
use crate::runner::{CommandRunner, ToolCommand};
use crate::store::ConfigStore;
use crate::target::{TargetId, TargetOs};
use crate::types::{BuildError, BuildOutput, BuildProfile, HostPlatform};

/// Simulator slices merged into the universal library, in `lipo` order.
pub const SIMULATOR_TARGETS: [TargetId; 2] = [TargetId::SimArm64Ios, TargetId::SimX64Ios];

impl<S: ConfigStore, R: CommandRunner> BuildDriver<S, R> {
    /// Builds for a physical device and copies the library into the app tree.
    pub fn build_ios_device(&self, profile: BuildProfile) -> Result<BuildOutput, BuildError> {
        let artifact = self.build_target(TargetId::DeviceArm64Ios, profile)?;

        let dest = self.ios_destination()?;
        install_artifact(&artifact, &dest)?;

        Ok(BuildOutput {
            platform: HostPlatform::IphoneOs,
            profile,
            artifacts: vec![artifact],
            installed: Some(dest),
        })
    }

    /// Builds both simulator architectures and merges them into a universal library.
    ///
    /// This performs the following steps:
    /// 1. Resolve and build `sim-arm64-ios`, then `sim-x64-ios`
    /// 2. `lipo -create` the two slices at the destination
    /// 3. `install_name_tool -id` so the merged library names its final path
    ///
    /// If merging fails, the per-architecture libraries stay in `target/` and
    /// no destination library is produced.
    pub fn build_ios_simulator(&self, profile: BuildProfile) -> Result<BuildOutput, BuildError> {
        let dest = self.ios_destination()?;

        let mut artifacts = Vec::with_capacity(SIMULATOR_TARGETS.len());
        for target in SIMULATOR_TARGETS {
            artifacts.push(self.build_target(target, profile)?);
        }

        if let Some(parent) = dest.parent() {
            ensure_dir(parent)?;
        }
        let runner = self.resolver().runner();
        runner.run(
            "Create fat ios-sim binary",
            &lipo_create_command(&dest, &artifacts),
        )?;

        // lipo keeps the install name of the first slice, which points into
        // target/; later dylib copying resolves the library by its id.
        runner.run(
            "Fix fat ios-sim binary install name",
            &install_name_command(&dest),
        )?;
        info!("Universal simulator library at {}", dest.display());

        Ok(BuildOutput {
            platform: HostPlatform::IphoneSimulator,
            profile,
            artifacts,
            installed: Some(dest),
        })
    }

    /// Absolute path of the installed library; it doubles as the install name.
    fn ios_destination(&self) -> Result<std::path::PathBuf, BuildError> {
        let layout = self.layout();
        let dest = layout.destination_dir().join(super::artifact_file_name(
            layout.get_library_name(),
            TargetOs::Ios,
        ));
        Ok(std::path::absolute(dest)?)
    }
}

fn lipo_create_command(output: &Path, inputs: &[std::path::PathBuf]) -> ToolCommand {
    ToolCommand::new("lipo")
        .args(["-create", "-output"])
        .arg(output)
        .args(inputs)
}

fn install_name_command(library: &Path) -> ToolCommand {
    ToolCommand::new("install_name_tool")
        .arg("-id")
        .arg(library)
        .arg(library)
}
