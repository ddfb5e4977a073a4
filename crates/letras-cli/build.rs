use std::process::Command;

use chrono::Utc;

/// Stamp the binary with the git revision it was built from, so
/// `letras --version` identifies the exact build.
fn main() {
    let revision = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".into());

    // Uncommitted changes to tracked files get a build time suffix.
    let modified = Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .map(|s| !s.success())
        .unwrap_or(false);

    let build_hash = if modified {
        format!("{revision}+{}", Utc::now().format("%Y%m%dT%H%M%SZ"))
    } else {
        revision
    };
    println!("cargo:rustc-env=BUILD_HASH={build_hash}");

    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
