use std::process::Command;

/// Short commit hash, `-dirty` when the work tree has changes, else `unknown`
fn git_hash() -> String {
    let git = |args: &[&str]| Command::new("git").args(args).output().ok();

    let Some(head) = git(&["rev-parse", "--short", "HEAD"]).filter(|o| o.status.success()) else {
        return "unknown".to_string();
    };
    let hash = String::from_utf8_lossy(&head.stdout).trim().to_string();

    let dirty = git(&["diff", "--quiet"]).is_some_and(|o| !o.status.success());
    if dirty { format!("{}-dirty", hash) } else { hash }
}

fn main() {
    println!(
        "cargo:rustc-env=BUILD_VERSION={} ({})",
        env!("CARGO_PKG_VERSION"),
        git_hash()
    );
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
