//! Common utilities shared between the iOS and Android builders.
//!
//! Artifact paths follow cargo's layout:
//! `<root>/target/<triple>/<profile>/<artifact>` for cross builds and
//! `<root>/target/<profile>/<artifact>` for host builds.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::runner::ToolCommand;
use crate::target::TargetOs;
use crate::types::{BuildError, BuildProfile};

/// File name of the shared library cargo produces for `library_name` on `os`.
///
/// Host builds follow the conventions of the OS running the build.
pub fn artifact_file_name(library_name: &str, os: TargetOs) -> String {
    let stem = library_name.replace('-', "_");
    match os {
        TargetOs::Ios => format!("lib{}.dylib", stem),
        TargetOs::Android => format!("lib{}.so", stem),
        TargetOs::Host => match env::consts::OS {
            "macos" | "ios" => format!("lib{}.dylib", stem),
            "windows" => format!("{}.dll", stem),
            _ => format!("lib{}.so", stem),
        },
    }
}

/// Where cargo places the artifact for `triple` and `profile`.
pub fn artifact_path(
    project_root: &Path,
    triple: Option<&str>,
    profile: BuildProfile,
    file_name: &str,
) -> PathBuf {
    let mut path = project_root.join("target");
    if let Some(triple) = triple {
        path.push(triple);
    }
    path.push(profile.as_str());
    path.push(file_name);
    path
}

/// `cargo build --lib [--release]`, run from the project root so cargo
/// picks up `.cargo/config.toml`.
pub fn cargo_build_command(cargo: &Path, project_root: &Path, profile: BuildProfile) -> ToolCommand {
    let mut cmd = ToolCommand::new(cargo)
        .args(["build", "--lib"])
        .current_dir(project_root);
    if profile.is_release() {
        cmd = cmd.arg("--release");
    }
    cmd
}

/// Fails with [`BuildError::MissingArtifact`] unless `path` is a file.
pub fn ensure_artifact(path: &Path) -> Result<(), BuildError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(BuildError::MissingArtifact {
            path: path.to_path_buf(),
        })
    }
}

/// Creates `dir` and its parents if absent.
pub fn ensure_dir(dir: &Path) -> Result<(), BuildError> {
    if !dir.exists() {
        debug!("Creating {}", dir.display());
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Copies a built artifact into the app tree, replacing any previous copy.
pub fn install_artifact(src: &Path, dest: &Path) -> Result<(), BuildError> {
    ensure_artifact(src)?;
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dest)?;
    info!("Copied {} -> {}", src.display(), dest.display());
    Ok(())
}
