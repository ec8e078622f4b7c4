//! Android NDK discovery.
//!
//! Locates the NDK root from the environment and derives the paths cargo
//! needs to cross-compile and link for an Android triple: the CMake toolchain
//! file, the sysroot, the LLVM binutils, and the API-level specific clang
//! wrapper used as linker.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use log::debug;

use crate::types::{BuildError, PathKind};

/// Environment variables naming the NDK root, in lookup order.
pub const NDK_ENV_VARS: [&str; 3] = ["NDK_HOME", "ANDROID_NDK_HOME", "ANDROID_NDK"];

/// Minimum Android API level the linker wrapper targets.
pub const DEFAULT_API_LEVEL: u32 = 24;

/// Host operating system, as named in the NDK's prebuilt directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    Linux,
    Darwin,
    Windows,
}

impl HostOs {
    /// The OS this process is running on.
    pub fn current() -> Result<Self, BuildError> {
        match env::consts::OS {
            "linux" => Ok(HostOs::Linux),
            "macos" => Ok(HostOs::Darwin),
            "windows" => Ok(HostOs::Windows),
            other => Err(BuildError::UnsupportedPlatform(format!(
                "{} (NDK hosts are linux, macos and windows)",
                other
            ))),
        }
    }

    /// Name of the prebuilt LLVM toolchain directory.
    ///
    /// Apple Silicon hosts still use `darwin-x86_64`: the NDK ships a single
    /// (universal) darwin toolchain under that name.
    pub fn prebuilt_dir(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux-x86_64",
            HostOs::Darwin => "darwin-x86_64",
            HostOs::Windows => "windows-x86_64",
        }
    }

    fn exe_suffix(&self) -> &'static str {
        match self {
            HostOs::Windows => ".exe",
            _ => "",
        }
    }

    /// Suffix of the clang wrapper scripts (batch files on Windows).
    fn script_suffix(&self) -> &'static str {
        match self {
            HostOs::Windows => ".cmd",
            _ => "",
        }
    }
}

/// Returns the NDK root named by the first set variable in [`NDK_ENV_VARS`].
///
/// `lookup` abstracts the environment so callers can test without mutating
/// process state.
pub fn find_ndk_home<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    NDK_ENV_VARS.iter().find_map(|var| {
        lookup(*var).map(|value| {
            debug!("Using NDK from ${}: {}", var, value);
            PathBuf::from(value)
        })
    })
}

/// [`find_ndk_home`] over the process environment.
pub fn ndk_home_from_env() -> Option<PathBuf> {
    find_ndk_home(|var| env::var(var).ok())
}

/// File name of the clang wrapper that links for `triple` at `api_level`.
///
/// The NDK names the 32-bit ARM wrapper `armv7a-linux-androideabi*`, while
/// the Rust triple is `armv7-linux-androideabi`.
pub fn linker_file_name(triple: &str, api_level: u32, host: HostOs) -> String {
    let prefix = if triple == "armv7-linux-androideabi" {
        "armv7a-linux-androideabi"
    } else {
        triple
    };
    format!("{}{}-clang{}", prefix, api_level, host.script_suffix())
}

/// Paths derived from an NDK installation for one Android triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidToolchain {
    pub cmake_toolchain_file: PathBuf,
    pub sysroot: PathBuf,
    pub ar: PathBuf,
    pub assembler: PathBuf,
    pub cc: PathBuf,
    pub cxx: PathBuf,
    pub ld: PathBuf,
    pub linker: PathBuf,
}

impl AndroidToolchain {
    /// Locates every tool for `triple` under `ndk_home`.
    ///
    /// Lookups run in a fixed order and stop at the first missing entry,
    /// reporting its exact path.
    pub fn locate(
        ndk_home: &Path,
        triple: &str,
        api_level: u32,
        host: HostOs,
    ) -> Result<Self, BuildError> {
        let cmake_toolchain_file =
            find_file(&ndk_home.join("build/cmake/android.toolchain.cmake"))?;

        let toolchain = find_dir(
            &ndk_home
                .join("toolchains/llvm/prebuilt")
                .join(host.prebuilt_dir()),
        )?;
        let sysroot = find_dir(&toolchain.join("sysroot"))?;
        let bin_dir = find_dir(&toolchain.join("bin"))?;

        let exe = host.exe_suffix();
        let ar = find_file(&bin_dir.join(format!("llvm-ar{}", exe)))?;
        let assembler = find_file(&bin_dir.join(format!("llvm-as{}", exe)))?;
        let cc = find_file(&bin_dir.join(format!("clang{}", exe)))?;
        let cxx = find_file(&bin_dir.join(format!("clang++{}", exe)))?;
        let ld = find_file(&bin_dir.join(format!("ld{}", exe)))?;
        let linker = find_file(&bin_dir.join(linker_file_name(triple, api_level, host)))?;

        Ok(Self {
            cmake_toolchain_file,
            sysroot,
            ar,
            assembler,
            cc,
            cxx,
            ld,
            linker,
        })
    }

    /// Environment block exported to cargo, excluding the linker.
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        [
            ("CMAKE_TOOLCHAIN_FILE", &self.cmake_toolchain_file),
            ("SYSROOT", &self.sysroot),
            ("AR", &self.ar),
            ("AS", &self.assembler),
            ("CC", &self.cc),
            ("CXX", &self.cxx),
            ("LD", &self.ld),
        ]
        .into_iter()
        .map(|(name, path)| (name.to_string(), path.display().to_string()))
        .collect()
    }
}

/// Returns `path` if it is a regular file.
pub fn find_file(path: &Path) -> Result<PathBuf, BuildError> {
    find(path, PathKind::File)
}

/// Returns `path` if it is a directory.
pub fn find_dir(path: &Path) -> Result<PathBuf, BuildError> {
    find(path, PathKind::Directory)
}

fn find(path: &Path, expected: PathKind) -> Result<PathBuf, BuildError> {
    let matches = match expected {
        PathKind::File => path.is_file(),
        PathKind::Directory => path.is_dir(),
    };
    if matches {
        debug!("Found {} {}", expected, path.display());
        return Ok(path.to_path_buf());
    }
    Err(BuildError::MissingTool {
        path: path.to_path_buf(),
        expected,
        found: path.exists(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fs;

    use super::*;

    /// Creates a fake NDK layout under `root` with every tool for `triples`.
    pub(crate) fn fabricate_ndk(root: &Path, host: HostOs, triples: &[&str]) {
        let cmake = root.join("build/cmake");
        fs::create_dir_all(&cmake).unwrap();
        fs::write(cmake.join("android.toolchain.cmake"), "").unwrap();

        let toolchain = root
            .join("toolchains/llvm/prebuilt")
            .join(host.prebuilt_dir());
        fs::create_dir_all(toolchain.join("sysroot")).unwrap();
        let bin = toolchain.join("bin");
        fs::create_dir_all(&bin).unwrap();

        let exe = host.exe_suffix();
        for tool in ["llvm-ar", "llvm-as", "clang", "clang++", "ld"] {
            fs::write(bin.join(format!("{}{}", tool, exe)), "").unwrap();
        }
        for triple in triples {
            fs::write(
                bin.join(linker_file_name(triple, DEFAULT_API_LEVEL, host)),
                "",
            )
            .unwrap();
        }
    }

    pub(crate) fn bin_dir(root: &Path, host: HostOs) -> PathBuf {
        root.join("toolchains/llvm/prebuilt")
            .join(host.prebuilt_dir())
            .join("bin")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use super::testing::{bin_dir, fabricate_ndk};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_ndk_home_order() {
        let mut vars = HashMap::new();
        vars.insert("ANDROID_NDK", "/opt/ndk-c");
        vars.insert("ANDROID_NDK_HOME", "/opt/ndk-b");
        let lookup = |k: &str| vars.get(k).map(|v| v.to_string());
        assert_eq!(find_ndk_home(lookup), Some(PathBuf::from("/opt/ndk-b")));

        vars.insert("NDK_HOME", "/opt/ndk-a");
        let lookup = |k: &str| vars.get(k).map(|v| v.to_string());
        assert_eq!(find_ndk_home(lookup), Some(PathBuf::from("/opt/ndk-a")));
    }

    #[test]
    fn test_find_ndk_home_none() {
        assert_eq!(find_ndk_home(|_| None), None);
    }

    #[test]
    fn test_linker_name_armv7_quirk() {
        let name = linker_file_name("armv7-linux-androideabi", 24, HostOs::Linux);
        assert_eq!(name, "armv7a-linux-androideabi24-clang");
        assert!(!name.contains("armv7-linux-androideabi"));

        assert_eq!(
            linker_file_name("aarch64-linux-android", 30, HostOs::Darwin),
            "aarch64-linux-android30-clang"
        );
        assert_eq!(
            linker_file_name("aarch64-linux-android", 24, HostOs::Windows),
            "aarch64-linux-android24-clang.cmd"
        );
    }

    #[test]
    fn test_darwin_uses_x86_64_prebuilt() {
        assert_eq!(HostOs::Darwin.prebuilt_dir(), "darwin-x86_64");
    }

    #[test]
    fn test_locate_complete_ndk() {
        let ndk = TempDir::new().unwrap();
        fabricate_ndk(ndk.path(), HostOs::Linux, &["aarch64-linux-android"]);

        let toolchain =
            AndroidToolchain::locate(ndk.path(), "aarch64-linux-android", 24, HostOs::Linux)
                .unwrap();
        let bin = bin_dir(ndk.path(), HostOs::Linux);
        assert_eq!(toolchain.linker, bin.join("aarch64-linux-android24-clang"));
        assert_eq!(toolchain.cxx, bin.join("clang++"));

        let env = toolchain.env_vars();
        let keys: Vec<&str> = env.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["AR", "AS", "CC", "CMAKE_TOOLCHAIN_FILE", "CXX", "LD", "SYSROOT"]
        );
        assert!(!env.contains_key("LINKER"));
    }

    #[test]
    fn test_locate_missing_linker() {
        let ndk = TempDir::new().unwrap();
        // Tools exist, but no wrapper for the requested triple
        fabricate_ndk(ndk.path(), HostOs::Linux, &[]);

        let err =
            AndroidToolchain::locate(ndk.path(), "armv7-linux-androideabi", 24, HostOs::Linux)
                .unwrap_err();
        match err {
            BuildError::MissingTool {
                path,
                expected,
                found,
            } => {
                assert_eq!(
                    path,
                    bin_dir(ndk.path(), HostOs::Linux).join("armv7a-linux-androideabi24-clang")
                );
                assert_eq!(expected, PathKind::File);
                assert!(!found);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_locate_stops_at_first_missing_entry() {
        let ndk = TempDir::new().unwrap();
        fabricate_ndk(ndk.path(), HostOs::Linux, &["aarch64-linux-android"]);
        let bin = bin_dir(ndk.path(), HostOs::Linux);
        fs::remove_file(bin.join("llvm-as")).unwrap();
        fs::remove_file(bin.join("clang")).unwrap();

        let err = AndroidToolchain::locate(ndk.path(), "aarch64-linux-android", 24, HostOs::Linux)
            .unwrap_err();
        assert!(
            matches!(err, BuildError::MissingTool { ref path, .. } if *path == bin.join("llvm-as"))
        );
    }

    #[test]
    fn test_locate_wrong_kind() {
        let ndk = TempDir::new().unwrap();
        fabricate_ndk(ndk.path(), HostOs::Linux, &["aarch64-linux-android"]);
        let sysroot = bin_dir(ndk.path(), HostOs::Linux)
            .parent()
            .unwrap()
            .join("sysroot");
        fs::remove_dir_all(&sysroot).unwrap();
        fs::write(&sysroot, "").unwrap();

        let err = AndroidToolchain::locate(ndk.path(), "aarch64-linux-android", 24, HostOs::Linux)
            .unwrap_err();
        match err {
            BuildError::MissingTool {
                path,
                expected,
                found,
            } => {
                assert_eq!(path, sysroot);
                assert_eq!(expected, PathKind::Directory);
                assert!(found);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_locate_without_ndk_contents() {
        let ndk = TempDir::new().unwrap();
        let err = AndroidToolchain::locate(ndk.path(), "aarch64-linux-android", 24, HostOs::Linux)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::MissingTool { ref path, .. }
                if path.ends_with("build/cmake/android.toolchain.cmake")
        ));
    }
}
