use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=CANON_ROOT_HINT");

    // Only an explicit hint is baked in; the crate's own directory is not an
    // archive.
    if let Ok(raw_hint) = env::var("CANON_ROOT_HINT") {
        let candidate = PathBuf::from(raw_hint);
        let canonical = candidate.canonicalize().unwrap_or(candidate);

        println!("cargo:rustc-env=CANON_ROOT_HINT={}", canonical.display());
    }
}
