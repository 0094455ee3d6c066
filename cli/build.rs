/// Embed the build number and source commit used by the installer version.
///
/// CI sets `BUILD_NUMBER` and `GIT_COMMIT`; local builds fall back to `0`
/// and the short `HEAD` commit (or `unknown` outside a git checkout).
use std::process::Command;

fn main() {
    let build_number = std::env::var("BUILD_NUMBER").unwrap_or_else(|_| "0".to_string());
    let commit = std::env::var("GIT_COMMIT")
        .ok()
        .or_else(git_short_commit)
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo::rustc-env=VCH_DEBUG_BUILD_NUMBER={build_number}");
    println!("cargo::rustc-env=VCH_DEBUG_COMMIT={commit}");
    println!("cargo::rerun-if-env-changed=BUILD_NUMBER");
    println!("cargo::rerun-if-env-changed=GIT_COMMIT");
}

fn git_short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let commit = String::from_utf8(output.stdout).ok()?;
    let commit = commit.trim();
    (!commit.is_empty()).then(|| commit.to_string())
}
