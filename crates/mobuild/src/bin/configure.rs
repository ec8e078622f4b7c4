//! `configure <target>`: resolve the toolchain for one target and write
//! `.cargo/config.toml`. Meant to be called from IDE build phases.

use std::process::ExitCode;

fn main() -> ExitCode {
    mobuild::run_configure()
}
