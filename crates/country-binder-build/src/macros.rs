/// Build-script entry point: generates the binder units for the calling
/// crate into `OUT_DIR`.
///
/// Expands to statements using `?`, so call it from a `main` that returns
/// `Result<(), Box<dyn std::error::Error>>`.
#[macro_export]
macro_rules! build {
    () => {
        use std::{env::var, path::PathBuf};

        //
        // CARGO
        //

        println!("cargo:rerun-if-changed=build.rs");

        let manifest_dir = PathBuf::from(var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
        let out_dir = PathBuf::from(var("OUT_DIR").expect("OUT_DIR not set"));

        //
        // BINDERS
        //

        ::country_binder_build::generate_crate(&manifest_dir, &out_dir)?;
    };
}
