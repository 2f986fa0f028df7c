use std::env;
use std::path::PathBuf;

fn main() {
    // Get the repo root directory at build time.
    // CARGO_MANIFEST_DIR for noises-core is crates/noises-core, so we go up two levels.
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let crate_path = PathBuf::from(&manifest_dir);

    let repo_root = crate_path
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map_or_else(|| crate_path.clone(), std::path::Path::to_path_buf);

    // Used to tell a source-tree run apart from a packaged executable
    println!(
        "cargo:rustc-env=NOISES_REPO_ROOT={}",
        repo_root.to_string_lossy()
    );

    // Interpreter ABI the shipped backend is built against; overridable per build
    let abi = env::var("NOISES_PYTHON_ABI").unwrap_or_else(|_| "3.12".to_string());
    println!("cargo:rustc-env=NOISES_BUILD_PYTHON_ABI={abi}");

    println!("cargo:rerun-if-env-changed=NOISES_PYTHON_ABI");
    println!("cargo:rerun-if-changed=build.rs");
}
