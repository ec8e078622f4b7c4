//! mobuild CLI: prepare cargo for a mobile target and build the game library.
//!
//! Two binaries share this library:
//!
//! - `mobuild` with the `configure`, `build`, `targets` and `init` subcommands
//! - `configure <target>`, the single-purpose entry point IDE build phases call
//!
//! Exit codes: 0 on success, 1 for a missing or unknown target (after
//! printing usage), 99 for any other failure (after printing the error chain).

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, error, info};
use mobuild_sdk::ndk::ndk_home_from_env;
use mobuild_sdk::{
    BuildDriver, BuildError, BuildOutput, BuildProfile, FileStore, HostPlatform, Resolver,
    SystemRunner, TargetId, ToolchainConfiguration,
};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub mod config;

pub use config::{CONFIG_FILE_NAME, MobuildConfig};

/// Exit status for a missing or unknown target.
pub const EXIT_USAGE: u8 = 1;
/// Exit status for every other failure.
pub const EXIT_FAILURE: u8 = 99;

/// Build Rust game libraries for iOS and Android from IDE build phases.
#[derive(Parser, Debug)]
#[command(name = "mobuild", author, version, about = "Mobile build driver for the game library", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by both binaries.
#[derive(clap::Args, Debug, Clone)]
struct GlobalArgs {
    /// Project root containing Cargo.toml (default: current directory)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Path to the config file (default: <project-root>/mobuild.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip rustup install / target add / update
    #[arg(long, global = true)]
    no_setup: bool,

    /// Print verbose output including all commands
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the toolchain for a target and write .cargo/config.toml.
    Configure {
        /// Target identifier (see `mobuild targets`)
        target: Option<String>,
        #[arg(long, help = "Print the resolved configuration as JSON")]
        json: bool,
    },
    /// Build the library and install it into the app tree.
    ///
    /// Without --platform, the platform and profile come from Xcode's
    /// ACTION, CONFIGURATION and PLATFORM_NAME variables.
    Build {
        #[arg(long, value_enum)]
        platform: Option<PlatformArg>,
        #[arg(long, help = "Build in release mode")]
        release: bool,
        #[arg(long, help = "Print the build output as JSON")]
        json: bool,
    },
    /// List the accepted target identifiers.
    Targets,
    /// Write a starter mobuild.toml into the project root.
    Init {
        #[arg(long, default_value = mobuild_sdk::builders::DEFAULT_LIBRARY_NAME)]
        library_name: String,
        #[arg(long, help = "Overwrite an existing config file")]
        force: bool,
    },
}

/// Standalone `configure <target>` binary.
#[derive(Parser, Debug)]
#[command(name = "configure", author, version, about = "Write .cargo/config.toml for a mobile target", long_about = None)]
struct ConfigureCli {
    #[command(flatten)]
    global: GlobalArgs,

    /// Target identifier
    target: Option<String>,

    #[arg(long, help = "Print the resolved configuration as JSON")]
    json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
enum PlatformArg {
    #[value(name = "iphoneos")]
    IphoneOs,
    #[value(name = "iphonesimulator")]
    IphoneSimulator,
    Android,
    Host,
}

impl From<PlatformArg> for HostPlatform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::IphoneOs => HostPlatform::IphoneOs,
            PlatformArg::IphoneSimulator => HostPlatform::IphoneSimulator,
            PlatformArg::Android => HostPlatform::Android,
            PlatformArg::Host => HostPlatform::Host,
        }
    }
}

/// A target was not given on the command line.
#[derive(Debug)]
struct MissingTarget;

impl fmt::Display for MissingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no target given")
    }
}

impl std::error::Error for MissingTarget {}

/// Entry point of the `mobuild` binary.
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return clap_exit(&err),
    };
    init_logging(cli.global.verbose);
    load_dotenv();

    finish(dispatch(cli))
}

/// Entry point of the standalone `configure` binary.
pub fn run_configure() -> ExitCode {
    let cli = match ConfigureCli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let (code, usage) = configure_parse_failure(&err, &program_name());
            if let Some(usage) = usage {
                print!("{usage}");
            }
            return ExitCode::from(code);
        }
    };
    init_logging(cli.global.verbose);
    load_dotenv();

    finish(cmd_configure(&cli.global, cli.target.as_deref(), cli.json))
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Configure { target, json } => cmd_configure(&cli.global, target.as_deref(), json),
        Command::Build {
            platform,
            release,
            json,
        } => cmd_build(&cli.global, platform.map(HostPlatform::from), release, json),
        Command::Targets => {
            print!("{}", targets_listing());
            Ok(())
        }
        Command::Init {
            library_name,
            force,
        } => cmd_init(&cli.global, &library_name, force),
    }
}

/// Initializes env_logger; `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .try_init();
}

/// Load environment variables from a `.env` file in the current directory.
///
/// Silently ignores a missing file.
fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => eprintln!("Warning: failed to load .env file: {err}"),
    }
}

/// The project root as an absolute path without symlinks.
///
/// The iOS install name embeds paths derived from it.
fn project_root(global: &GlobalArgs) -> Result<PathBuf> {
    let root = match &global.project_root {
        Some(root) => root.clone(),
        None => env::current_dir().context("Failed to determine the current directory")?,
    };
    fs::canonicalize(&root)
        .with_context(|| format!("Failed to resolve project root {}", root.display()))
}

struct Session {
    root: PathBuf,
    config: MobuildConfig,
}

impl Session {
    fn open(global: &GlobalArgs) -> Result<Self> {
        let root = project_root(global)?;
        let (mut config, source) = MobuildConfig::load(&root, global.config.as_deref())?;
        if let Some(source) = source {
            debug!("Using config file {}", source.display());
        }
        if global.no_setup {
            config.toolchain.setup = false;
        }
        Ok(Self { root, config })
    }

    fn resolver(&self) -> Result<Resolver<FileStore, SystemRunner>> {
        let resolver = Resolver::new(
            FileStore::for_project(&self.root),
            SystemRunner,
            self.config.tool_paths()?,
        )
        .ndk_home(ndk_home_from_env());
        Ok(self.config.configure_resolver(resolver))
    }
}

fn cmd_configure(global: &GlobalArgs, target: Option<&str>, json: bool) -> Result<()> {
    let target: TargetId = target.ok_or(MissingTarget)?.parse()?;
    let session = Session::open(global)?;
    let resolver = session.resolver()?;

    let resolved = resolver
        .resolve(target)
        .with_context(|| format!("Failed to configure {target}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        print!("{}", describe_configuration(&resolved));
    }
    Ok(())
}

fn cmd_build(
    global: &GlobalArgs,
    platform: Option<HostPlatform>,
    release: bool,
    json: bool,
) -> Result<()> {
    let (platform, profile) = build_request(platform, release, |key| env::var(key).ok())?;
    let session = Session::open(global)?;
    let driver = BuildDriver::new(session.config.layout(&session.root), session.resolver()?);

    let output = driver
        .build(platform, profile)
        .with_context(|| format!("Failed to build for {platform}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", describe_output(&output));
    }
    Ok(())
}

fn cmd_init(global: &GlobalArgs, library_name: &str, force: bool) -> Result<()> {
    let root = project_root(global)?;
    let path = global
        .config
        .clone()
        .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    fs::write(&path, MobuildConfig::generate_starter_toml(library_name))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Decides what to build.
///
/// An explicit platform wins. Otherwise the Xcode build environment is read
/// through `lookup`: `ACTION` must be set, `CONFIGURATION` selects the profile
/// and `PLATFORM_NAME` the platform.
fn build_request<F>(
    platform: Option<HostPlatform>,
    release: bool,
    lookup: F,
) -> Result<(HostPlatform, BuildProfile)>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(platform) = platform {
        let profile = if release {
            BuildProfile::Release
        } else {
            BuildProfile::Debug
        };
        return Ok((platform, profile));
    }

    let Some(action) = lookup("ACTION") else {
        bail!("not invoked from an Xcode build phase (ACTION is not set); pass --platform");
    };
    debug!("Xcode action: {action:?}");

    let configuration = lookup("CONFIGURATION")
        .ok_or_else(|| anyhow!("CONFIGURATION is not set by the build environment"))?;
    let platform_name = lookup("PLATFORM_NAME")
        .ok_or_else(|| anyhow!("PLATFORM_NAME is not set by the build environment"))?;

    let platform: HostPlatform = platform_name.parse()?;
    Ok((platform, BuildProfile::from_configuration(&configuration)))
}

fn usage(program: &str) -> String {
    let mut text = format!("Usage: {program} <target>\nWhere target is one of:\n");
    for name in TargetId::names() {
        text.push_str("    ");
        text.push_str(name);
        text.push('\n');
    }
    text
}

fn targets_listing() -> String {
    let mut text = String::new();
    for target in TargetId::ALL {
        let triple = target.triple().unwrap_or("(host default)");
        text.push_str(&format!("{:<18} {}\n", target.as_str(), triple));
    }
    text
}

fn describe_configuration(config: &ToolchainConfiguration) -> String {
    let mut text = format!("Configured {}\n", config.target);
    match &config.triple {
        Some(triple) => text.push_str(&format!("  target: {triple}\n")),
        None => text.push_str("  target: host default (.cargo/config.toml removed)\n"),
    }
    if let Some(linker) = &config.linker {
        text.push_str(&format!("  linker: {}\n", linker.display()));
    }
    if let Some(env) = &config.env {
        for (key, value) in env {
            text.push_str(&format!("  {key}={value}\n"));
        }
    }
    text
}

fn describe_output(output: &BuildOutput) -> String {
    let mut text = format!("Built {} ({})\n", output.platform, output.profile.as_str());
    for artifact in &output.artifacts {
        text.push_str(&format!("  artifact: {}\n", artifact.display()));
    }
    if let Some(installed) = &output.installed {
        text.push_str(&format!("  installed: {}\n", installed.display()));
    }
    text
}

/// Whether `err` should be reported as a usage problem.
fn is_usage_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<MissingTarget>().is_some()
        || matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::UnknownTarget(_))
        )
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if is_usage_error(err) {
        EXIT_USAGE
    } else {
        EXIT_FAILURE
    }
}

fn finish(result: Result<()>) -> ExitCode {
    let Err(err) = result else {
        return ExitCode::SUCCESS;
    };

    let code = exit_code(&err);
    if code == EXIT_USAGE {
        if err.downcast_ref::<MissingTarget>().is_none() {
            println!("{err}");
        }
        print!("{}", usage(&program_name()));
    } else {
        error!("{err}");
        println!("{err:?}");
    }
    ExitCode::from(code)
}

fn clap_exit(err: &clap::Error) -> ExitCode {
    let _ = err.print();
    ExitCode::from(clap_exit_code(err))
}

/// Exit code and the target listing to print after a `configure` argument error.
fn configure_parse_failure(err: &clap::Error, program: &str) -> (u8, Option<String>) {
    let code = clap_exit_code(err);
    (code, (code == EXIT_USAGE).then(|| usage(program)))
}

/// `--help` and `--version` succeed; every other parse failure is a usage error.
fn clap_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() { EXIT_USAGE } else { 0 }
}

fn program_name() -> String {
    env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "configure".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn xcode_env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_configure_command() {
        let cli = Cli::try_parse_from(["mobuild", "configure", "arm64-android", "--json"]).unwrap();
        match cli.command {
            Command::Configure { target, json } => {
                assert_eq!(target.as_deref(), Some("arm64-android"));
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_extra_configure_argument_is_usage_error() {
        let err = ConfigureCli::try_parse_from(["configure", "ios", "extra"]).unwrap_err();
        let (code, listing) = configure_parse_failure(&err, "configure");
        assert_eq!(code, EXIT_USAGE);
        let listing = listing.unwrap();
        assert!(listing.starts_with("Usage: configure <target>"));
        assert!(listing.contains("    device-arm64-ios\n"));

        let help = ConfigureCli::try_parse_from(["configure", "--help"]).unwrap_err();
        assert_eq!(configure_parse_failure(&help, "configure"), (0, None));
    }

    #[test]
    fn test_parse_build_command_with_globals() {
        let cli = Cli::try_parse_from([
            "mobuild",
            "build",
            "--platform",
            "iphonesimulator",
            "--release",
            "--project-root",
            "/work/game",
            "--no-setup",
        ])
        .unwrap();
        assert_eq!(cli.global.project_root, Some(PathBuf::from("/work/game")));
        assert!(cli.global.no_setup);
        match cli.command {
            Command::Build {
                platform, release, ..
            } => {
                assert_eq!(platform, Some(PlatformArg::IphoneSimulator));
                assert!(release);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_reject_unknown_platform_flag() {
        assert!(Cli::try_parse_from(["mobuild", "build", "--platform", "watchos"]).is_err());
    }

    #[test]
    fn test_parse_standalone_configure() {
        let cli = ConfigureCli::try_parse_from(["configure", "sim-x64-ios"]).unwrap();
        assert_eq!(cli.target.as_deref(), Some("sim-x64-ios"));

        let cli = ConfigureCli::try_parse_from(["configure"]).unwrap();
        assert_eq!(cli.target, None);
    }

    #[test]
    fn test_build_request_explicit_platform() {
        let (platform, profile) =
            build_request(Some(HostPlatform::Android), true, xcode_env(&[])).unwrap();
        assert_eq!(platform, HostPlatform::Android);
        assert_eq!(profile, BuildProfile::Release);
    }

    #[test]
    fn test_build_request_from_xcode() {
        let env = xcode_env(&[
            ("ACTION", "build"),
            ("CONFIGURATION", "Release"),
            ("PLATFORM_NAME", "iphonesimulator"),
        ]);
        let (platform, profile) = build_request(None, false, env).unwrap();
        assert_eq!(platform, HostPlatform::IphoneSimulator);
        assert_eq!(profile, BuildProfile::Release);

        let env = xcode_env(&[
            ("ACTION", ""),
            ("CONFIGURATION", "Debug"),
            ("PLATFORM_NAME", "iphoneos"),
        ]);
        let (platform, profile) = build_request(None, false, env).unwrap();
        assert_eq!(platform, HostPlatform::IphoneOs);
        assert_eq!(profile, BuildProfile::Debug);
    }

    #[test]
    fn test_build_request_outside_xcode() {
        let err = build_request(None, false, xcode_env(&[])).unwrap_err();
        assert!(err.to_string().contains("ACTION is not set"));
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_build_request_unsupported_platform() {
        let env = xcode_env(&[
            ("ACTION", "build"),
            ("CONFIGURATION", "Debug"),
            ("PLATFORM_NAME", "macosx"),
        ]);
        let err = build_request(None, false, env).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::UnsupportedPlatform(name)) if name == "macosx"
        ));
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_missing_and_unknown_targets_are_usage_errors() {
        let global = GlobalArgs {
            project_root: None,
            config: None,
            no_setup: true,
            verbose: false,
        };
        let err = cmd_configure(&global, None, false).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_USAGE);

        let err = cmd_configure(&global, Some("arm64-windows"), false).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_USAGE);
    }

    #[test]
    fn test_other_failures_exit_99() {
        let err = anyhow::Error::new(BuildError::MissingNdk {
            vars: vec!["NDK_HOME"],
        })
        .context("Failed to configure arm64-android");
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_usage_lists_every_target() {
        let text = usage("configure");
        assert!(text.starts_with("Usage: configure <target>\n"));
        for name in TargetId::names() {
            assert!(text.contains(&format!("    {name}\n")));
        }
    }

    #[test]
    fn test_targets_listing() {
        let listing = targets_listing();
        assert!(listing.contains("arm64-android"));
        assert!(listing.contains("aarch64-linux-android"));
        assert!(listing.contains("(host default)"));
        assert_eq!(listing.lines().count(), TargetId::ALL.len());
    }

    #[test]
    fn test_describe_configuration() {
        let config = ToolchainConfiguration {
            target: "sim-arm64-ios".to_string(),
            triple: Some("aarch64-apple-ios-sim".to_string()),
            linker: None,
            env: None,
        };
        assert_eq!(
            describe_configuration(&config),
            "Configured sim-arm64-ios\n  target: aarch64-apple-ios-sim\n"
        );
    }

    #[test]
    fn test_host_native_configure_removes_config() {
        let project = TempDir::new().unwrap();
        let cargo_dir = project.path().join(".cargo");
        fs::create_dir_all(&cargo_dir).unwrap();
        fs::write(cargo_dir.join("config.toml"), "[build]\ntarget = \"aarch64-apple-ios\"\n")
            .unwrap();
        fs::write(
            project.path().join(CONFIG_FILE_NAME),
            "[toolchain]\nbin_dir = \"/nonexistent/bin\"\n",
        )
        .unwrap();

        let global = GlobalArgs {
            project_root: Some(project.path().to_path_buf()),
            config: None,
            no_setup: true,
            verbose: false,
        };
        cmd_configure(&global, Some("host-native"), false).unwrap();
        assert!(!cargo_dir.join("config.toml").exists());
    }

    #[test]
    fn test_project_root_is_canonical() {
        let project = tempfile::Builder::new().tempdir_in(".").unwrap();
        let relative = PathBuf::from(project.path().file_name().unwrap());
        let global = GlobalArgs {
            project_root: Some(relative),
            config: None,
            no_setup: true,
            verbose: false,
        };
        let root = project_root(&global).unwrap();
        assert!(root.is_absolute());
        assert_eq!(root, fs::canonicalize(project.path()).unwrap());

        let missing = GlobalArgs {
            project_root: Some(PathBuf::from("no-such-project-dir")),
            ..global
        };
        let err = project_root(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to resolve project root"));
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_init_writes_starter_config() {
        let project = TempDir::new().unwrap();
        let global = GlobalArgs {
            project_root: Some(project.path().to_path_buf()),
            config: None,
            no_setup: false,
            verbose: false,
        };
        cmd_init(&global, "breakout", false).unwrap();

        let (config, _) = MobuildConfig::load(project.path(), None).unwrap();
        assert_eq!(config.project.library_name, "breakout");

        let err = cmd_init(&global, "breakout", false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        cmd_init(&global, "game", true).unwrap();
    }
}
