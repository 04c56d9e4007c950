use std::{env, fs, io, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-env-changed=ODSIGN_GIT_REVISION");
    if let Err(e) = write_version_files() {
        panic!("Failed to create the version files: {:?}", e);
    }
}

fn out_file(name: &str) -> PathBuf {
    PathBuf::from(env::var_os("OUT_DIR").expect("cargo sets OUT_DIR")).join(name)
}

/// Writes two string literals for `include!`: the bare package version and a
/// long version that also names the target and git revision
fn write_version_files() -> io::Result<()> {
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".into());
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".into());
    let rev = git_rev().unwrap_or_else(|| "unknown".into());

    fs::write(out_file("simple_version_string"), format!("{:?}", version))?;
    fs::write(
        out_file("version_string"),
        format!("{:?}", format!("{} ({})\nrev {}", version, target, rev.trim())),
    )?;
    Ok(())
}

fn git_rev() -> Option<String> {
    if let Ok(rev) = env::var("ODSIGN_GIT_REVISION") {
        return Some(rev);
    }
    let out = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout).ok()
}
