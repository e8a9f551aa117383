//! Build script for the web crate.
//!
//! Fingerprints static assets so they can be served with immutable caching:
//! `static/css/main.css` and `static/js/app.js` are copied to
//! `static/*/derived/` with the first 8 hex chars of their SHA-256 in the
//! file name, and the hashes are exported as `CSS_HASH` and `JS_HASH`.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let root = Path::new(&manifest_dir);

    fingerprint(root, "css", "main", "CSS_HASH");
    fingerprint(root, "js", "app", "JS_HASH");
}

fn fingerprint(root: &Path, ext: &str, stem: &str, var: &str) {
    let dir = root.join("static").join(ext);
    let source = dir.join(format!("{stem}.{ext}"));
    println!("cargo:rerun-if-changed={}", source.display());

    let content = match fs::read(&source) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {}: {e}", source.display());
            println!("cargo:rustc-env={var}=");
            return;
        }
    };

    let hash = format!("{:x}", Sha256::digest(&content));
    let short_hash = &hash[..8];
    println!("cargo:rustc-env={var}={short_hash}");

    let derived_dir = dir.join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived asset directory");
    fs::copy(&source, derived_dir.join(format!("{stem}.{short_hash}.{ext}")))
        .expect("Failed to copy asset to derived directory");
}
