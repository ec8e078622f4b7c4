//! Configuration file support for mobuild.
//!
//! An optional `mobuild.toml` in the project root persists settings that
//! would otherwise be repeated on every invocation. Every field has a
//! default, so an empty or missing file is valid.
//!
//! ## Example Configuration
//!
//! ```toml
//! [project]
//! library_name = "game"
//! destination = "iOS/libs"
//!
//! [toolchain]
//! channel = "stable"
//! setup = true
//!
//! [android]
//! api_level = 24
//! ```

use anyhow::{Context, Result};
use mobuild_sdk::builders::{DEFAULT_DESTINATION, DEFAULT_LIBRARY_NAME};
use mobuild_sdk::ndk::DEFAULT_API_LEVEL;
use mobuild_sdk::toolchain::DEFAULT_CHANNEL;
use mobuild_sdk::{CommandRunner, ConfigStore, ProjectLayout, Resolver, ToolPaths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The default configuration file name.
pub const CONFIG_FILE_NAME: &str = "mobuild.toml";

/// Root configuration structure for `mobuild.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobuildConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,

    /// Rust toolchain management.
    pub toolchain: ToolchainConfig,

    /// Android-specific configuration.
    pub android: AndroidConfig,
}

/// Project-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Cargo library name, without the `lib` prefix or extension.
    ///
    /// Defaults to "game".
    pub library_name: String,

    /// Directory receiving the iOS library, relative to the project root.
    ///
    /// Defaults to `iOS/libs`.
    pub destination: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            library_name: DEFAULT_LIBRARY_NAME.to_string(),
            destination: PathBuf::from(DEFAULT_DESTINATION),
        }
    }
}

/// Rust toolchain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Rustup channel to install and register targets with.
    ///
    /// Defaults to "stable".
    pub channel: String,

    /// Whether to run `rustup install`, `rustup target add` and
    /// `rustup update` before each resolution.
    ///
    /// Defaults to true.
    pub setup: bool,

    /// Directory containing `rustup` and `cargo`.
    ///
    /// Defaults to `$HOME/.cargo/bin`.
    pub bin_dir: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            setup: true,
            bin_dir: None,
        }
    }
}

/// Android-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    /// API level of the NDK clang wrapper used as linker.
    ///
    /// Defaults to 24 (Android 7.0).
    pub api_level: u32,
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            api_level: DEFAULT_API_LEVEL,
        }
    }
}

impl MobuildConfig {
    /// Loads configuration from the specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: MobuildConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Loads the configuration for `project_root`.
    ///
    /// An explicit path must exist. Without one, `<project_root>/mobuild.toml`
    /// is used when present and defaults otherwise.
    ///
    /// # Returns
    ///
    /// The configuration and the path it was loaded from, if any.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load_from_file(path)?, Some(path.to_path_buf())));
        }

        let candidate = project_root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            let config = Self::load_from_file(&candidate)?;
            return Ok((config, Some(candidate)));
        }

        Ok((Self::default(), None))
    }

    /// Paths to `rustup` and `cargo`.
    pub fn tool_paths(&self) -> Result<ToolPaths> {
        match &self.toolchain.bin_dir {
            Some(bin_dir) => Ok(ToolPaths::in_dir(bin_dir)),
            None => ToolPaths::from_env().context("Failed to locate the Rust toolchain"),
        }
    }

    pub fn layout(&self, project_root: &Path) -> ProjectLayout {
        ProjectLayout::new(project_root)
            .library_name(self.project.library_name.clone())
            .destination(self.project.destination.clone())
    }

    /// Applies toolchain and Android settings to a resolver.
    pub fn configure_resolver<S, R>(&self, resolver: Resolver<S, R>) -> Resolver<S, R>
    where
        S: ConfigStore,
        R: CommandRunner,
    {
        resolver
            .channel(self.toolchain.channel.clone())
            .setup_toolchain(self.toolchain.setup)
            .api_level(self.android.api_level)
    }

    /// Generates a starter configuration file as a formatted TOML string.
    ///
    /// This includes comments explaining each configuration option.
    pub fn generate_starter_toml(library_name: &str) -> String {
        format!(
            r#"# mobuild configuration file
# CLI flags override these settings when provided.

[project]
# Cargo library name, without the lib prefix or extension
library_name = {library_name}

# Directory receiving the iOS library, relative to the project root
destination = "{destination}"

[toolchain]
# Rustup channel to install and add targets to
channel = "{channel}"

# Run rustup install / target add / update before each configure
setup = true

# Directory containing rustup and cargo (default: $HOME/.cargo/bin)
# bin_dir = "/opt/rust/bin"

[android]
# API level of the NDK linker wrapper (default: {api_level} / Android 7.0)
api_level = {api_level}
"#,
            library_name = toml::Value::String(library_name.to_string()),
            destination = DEFAULT_DESTINATION,
            channel = DEFAULT_CHANNEL,
            api_level = DEFAULT_API_LEVEL,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MobuildConfig::default();
        assert_eq!(config.project.library_name, "game");
        assert_eq!(config.project.destination, PathBuf::from("iOS/libs"));
        assert_eq!(config.toolchain.channel, "stable");
        assert!(config.toolchain.setup);
        assert_eq!(config.android.api_level, 24);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("mobuild.toml");

        let toml_content = r#"
[project]
library_name = "breakout"

[toolchain]
channel = "1.85.0"
setup = false
bin_dir = "/opt/rust/bin"

[android]
api_level = 30
"#;

        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = MobuildConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.project.library_name, "breakout");
        // Unset fields keep their defaults
        assert_eq!(config.project.destination, PathBuf::from("iOS/libs"));
        assert_eq!(config.toolchain.channel, "1.85.0");
        assert!(!config.toolchain.setup);
        assert_eq!(config.android.api_level, 30);

        let tools = config.tool_paths().unwrap();
        assert_eq!(tools.cargo, PathBuf::from("/opt/rust/bin/cargo"));
    }

    #[test]
    fn test_load_discovers_project_file() {
        let temp_dir = TempDir::new().unwrap();
        let (config, path) = MobuildConfig::load(temp_dir.path(), None).unwrap();
        assert_eq!(config, MobuildConfig::default());
        assert_eq!(path, None);

        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[project]\ndestination = \"App/Frameworks\"\n",
        )
        .unwrap();
        let (config, path) = MobuildConfig::load(temp_dir.path(), None).unwrap();
        assert_eq!(config.project.destination, PathBuf::from("App/Frameworks"));
        assert_eq!(path, Some(temp_dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("elsewhere.toml");
        let err = MobuildConfig::load(temp_dir.path(), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("mobuild.toml");
        std::fs::write(&config_path, "[android]\napi_level = \"twenty\"\n").unwrap();
        let err = MobuildConfig::load_from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_layout_from_config() {
        let mut config = MobuildConfig::default();
        config.project.library_name = "breakout".to_string();
        let layout = config.layout(Path::new("/work"));
        assert_eq!(layout.get_library_name(), "breakout");
        assert_eq!(layout.destination_dir(), PathBuf::from("/work/iOS/libs"));
    }

    #[test]
    fn test_starter_toml_parses() {
        let contents = MobuildConfig::generate_starter_toml("game");
        let config: MobuildConfig = toml::from_str(&contents).unwrap();
        assert_eq!(config, MobuildConfig::default());
    }

    #[test]
    fn test_starter_toml_escapes_library_name() {
        let contents = MobuildConfig::generate_starter_toml("my\"game\\x");
        let config: MobuildConfig = toml::from_str(&contents).unwrap();
        assert_eq!(config.project.library_name, "my\"game\\x");
    }
}
