//! Build identification for `ltc2mtc --version`
//!
//! Exports to the crate at compile time:
//! - `GIT_HASH`: short commit, suffixed `-dirty` with uncommitted changes
//! - `BUILD_TIMESTAMP`: UTC, RFC 3339
//! - `BUILD_PROFILE`: cargo profile
//! - `BUILD_TARGET`: target triple

use std::process::Command;

/// Trimmed stdout of a successful git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    let git_hash = match git(&["rev-parse", "--short=8", "HEAD"]) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .map(|status| !status.is_empty())
                .unwrap_or(false);
            if dirty {
                format!("{}-dirty", hash)
            } else {
                hash
            }
        }
        None => "unknown".to_string(),
    };

    let env_or_unknown = |name: &str| std::env::var(name).unwrap_or_else(|_| "unknown".to_string());

    let exports = [
        ("GIT_HASH", git_hash),
        (
            "BUILD_TIMESTAMP",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        ),
        ("BUILD_PROFILE", env_or_unknown("PROFILE")),
        ("BUILD_TARGET", env_or_unknown("TARGET")),
    ];
    for (name, value) in exports {
        println!("cargo:rustc-env={}={}", name, value);
    }

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");
}
