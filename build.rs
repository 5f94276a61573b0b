//! Build script: embed the short git hash shown by both binaries

use std::process::Command;

fn git(args: &[&str]) -> Option<std::process::Output> {
    Command::new("git").args(args).output().ok().filter(|o| o.status.success())
}

fn main() {
    let mut git_hash = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(output) => String::from_utf8_lossy(&output.stdout).trim().to_string(),
        None => String::from("unknown"),
    };

    // `git diff --quiet` exits non-zero when the tree has local edits
    let dirty = Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .map(|s| s.code() == Some(1))
        .unwrap_or(false);
    if dirty && git_hash != "unknown" {
        git_hash.push_str("-dirty");
    }

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
}
