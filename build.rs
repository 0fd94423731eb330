//! Build script for pr-automation - embeds version information.
//!
//! The string exported as `BUILD_INFO_HUMAN` is shown by `--version` so a
//! workflow run can be traced back to the exact binary that labelled a pull
//! request:
//!
//! `{CARGO_PKG_VERSION} ({commit}[+dirty], built {date}) {rustc --version}`
//!
//! Outside a git checkout (e.g. a vendored tarball) the commit part is
//! replaced with `unknown`.

use std::{env, process::Command};

use chrono::Utc;

fn main() {
    ["src", "build.rs", "Cargo.toml"]
        .iter()
        .for_each(|path| println!("cargo:rerun-if-changed={path}"));

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn commit_description() -> String {
    let Some(commit) = command_stdout("git", &["rev-parse", "--short=12", "HEAD"]) else {
        return "unknown".to_string();
    };

    let dirty = command_stdout("git", &["status", "--porcelain"])
        .is_some_and(|status| status.lines().any(|line| line.get(3..) != Some(".cargo-ok")));

    if dirty {
        format!("{commit}+dirty")
    } else {
        commit
    }
}

fn build_info() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let built = Utc::now().format("%Y-%m-%d");
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());

    let mut info = format!("{version} ({}, built {built})", commit_description());
    if let Some(rustc_version) = command_stdout(&rustc, &["--version"]) {
        info.push(' ');
        info.push_str(&rustc_version);
    }
    info
}
