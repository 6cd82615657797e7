use std::{env, path};

fn main() {
    // Only the package version and the commit hash are shown at startup.
    let manifest_location = env::var("CARGO_MANIFEST_DIR").unwrap();
    let dst = path::Path::new(&env::var("OUT_DIR").unwrap()).join("built.rs");
    built::write_built_file_with_opts(Some(manifest_location.as_ref()), &dst)
        .expect("Failed to acquire build-time information");
}
