//! Build script: embeds the short git revision for the startup log line

use std::process::Command;

fn main() {
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .unwrap_or_else(|| String::from("unknown"));

    println!("cargo:rustc-env=BUSFLOW_GIT_HASH={}", git_hash);
    println!("cargo:rerun-if-changed=.git/HEAD");
}
