fn main() {
    let manifest_dir = std::path::PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let config_path = manifest_dir.join("../fixtures/freebsd/gendefs.toml");
    let base_dir = config_path.parent().expect("config has a parent directory");

    // Step 1: Bring the fragments in OUT_DIR up to date
    let cfg = gendefs::config::load_config(&config_path).expect("loading gendefs.toml");
    let opts = gendefs::Options {
        output_dir: Some(out_dir.clone()),
        ..Default::default()
    };
    gendefs::ensure_fresh(&cfg, base_dir, &opts).expect("gendefs failed");

    // Step 2: Resolve the library list for a fixed OS release so the build
    // does not depend on the host.
    let libs = gendefs::libraries(
        &cfg,
        base_dir,
        Some(&out_dir),
        &gendefs::libdeps::FixedVersion(700000),
    )
    .expect("resolving libraries");
    let libs: Vec<&str> = libs.iter().map(String::as_str).collect();
    std::fs::write(
        out_dir.join("libraries.rs"),
        format!("pub const LIBRARIES: &[&str] = &{libs:?};\n"),
    )
    .expect("writing libraries.rs");

    // Rerun if sources change
    println!("cargo:rerun-if-changed=../fixtures/freebsd/");
    println!("cargo:rerun-if-changed=../../gendefs/src/");
}
