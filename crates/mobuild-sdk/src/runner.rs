//! External tool execution.
//!
//! All shell-outs (rustup, cargo, lipo, install_name_tool) go through a
//! [`CommandRunner`]. [`SystemRunner`] runs them for real, inheriting stdio so
//! compiler output streams to the invoking IDE.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;

use crate::types::BuildError;

/// A program plus its arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Builds the equivalent `std::process::Command`.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for ToolCommand {
    /// Space-joined command line, as shown in logs and errors.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Executes external tools on behalf of the resolver and builders.
pub trait CommandRunner {
    /// Runs `cmd` to completion.
    ///
    /// `purpose` is a short human description ("Build for sim-x64-ios") used
    /// in logs and in [`BuildError::ToolInvocation`].
    fn run(&self, purpose: &str, cmd: &ToolCommand) -> Result<(), BuildError>;
}

/// Runs commands as child processes, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, purpose: &str, cmd: &ToolCommand) -> Result<(), BuildError> {
        info!("{}: {}", purpose, cmd);

        let status = cmd.to_command().status().map_err(|e| {
            log::error!("Failed to start {}: {}", cmd.program().display(), e);
            BuildError::ToolInvocation {
                purpose: purpose.to_string(),
                command: cmd.to_string(),
                status: None,
            }
        })?;

        if !status.success() {
            return Err(BuildError::ToolInvocation {
                purpose: purpose.to_string(),
                command: cmd.to_string(),
                status: status.code(),
            });
        }
        Ok(())
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, purpose: &str, cmd: &ToolCommand) -> Result<(), BuildError> {
        (**self).run(purpose, cmd)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::fs;

    use super::*;

    /// A side effect a fake tool performs before reporting success.
    pub(crate) type Effect = Box<dyn Fn(&ToolCommand)>;

    /// Records invocations instead of running them.
    ///
    /// Fails any invocation whose purpose starts with `fail_on`.
    #[derive(Default)]
    pub(crate) struct RecordingRunner {
        pub(crate) calls: RefCell<Vec<(String, String)>>,
        fail_on: Option<String>,
        effects: Vec<(String, Effect)>,
    }

    impl RecordingRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn failing_on(purpose: &str) -> Self {
            Self {
                fail_on: Some(purpose.to_string()),
                ..Self::default()
            }
        }

        /// Runs `effect` for every successful invocation whose purpose starts with `purpose`.
        pub(crate) fn with_effect(
            mut self,
            purpose: &str,
            effect: impl Fn(&ToolCommand) + 'static,
        ) -> Self {
            self.effects.push((purpose.to_string(), Box::new(effect)));
            self
        }

        pub(crate) fn purposes(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(p, _)| p.clone()).collect()
        }

        pub(crate) fn command_lines(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(_, c)| c.clone()).collect()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, purpose: &str, cmd: &ToolCommand) -> Result<(), BuildError> {
            self.calls
                .borrow_mut()
                .push((purpose.to_string(), cmd.to_string()));
            if let Some(fail_on) = &self.fail_on {
                if purpose.starts_with(fail_on.as_str()) {
                    return Err(BuildError::ToolInvocation {
                        purpose: purpose.to_string(),
                        command: cmd.to_string(),
                        status: Some(1),
                    });
                }
            }
            for (prefix, effect) in &self.effects {
                if purpose.starts_with(prefix.as_str()) {
                    effect(cmd);
                }
            }
            Ok(())
        }
    }

    /// Effect that creates an empty file at `path`, standing in for a compiler output.
    pub(crate) fn touch(path: PathBuf) -> impl Fn(&ToolCommand) + 'static {
        move |_| {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, b"\xcf\xfa\xed\xfe").unwrap();
        }
    }
}
