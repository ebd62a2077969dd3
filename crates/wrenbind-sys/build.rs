use std::env;
use std::fs;
use std::path::PathBuf;

use bindgen::MacroTypeVariation;

fn main() {
    println!("cargo:rerun-if-env-changed=WREN_SOURCE_DIR");
    println!("cargo:rerun-if-env-changed=WREN_INCLUDE_DIR");
    println!("cargo:rerun-if-env-changed=WREN_LIB_DIR");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    // WREN_SOURCE_DIR points at the `src` directory of a Wren checkout.
    let include_dir = if let Ok(source_dir) = env::var("WREN_SOURCE_DIR") {
        let root = PathBuf::from(source_dir);

        // The random module allocates foreign objects without a type header.
        let mut build = cc::Build::new();
        build
            .include(root.join("include"))
            .include(root.join("vm"))
            .include(root.join("optional"))
            .define("WREN_OPT_META", Some("1"))
            .define("WREN_OPT_RANDOM", Some("0"))
            .flag_if_supported("-std=c99")
            .warnings(false);

        for dir in ["vm", "optional"] {
            let entries = fs::read_dir(root.join(dir))
                .unwrap_or_else(|e| panic!("cannot read {}: {e}", root.join(dir).display()));
            for path in entries.flatten().map(|entry| entry.path()) {
                if path.extension().is_some_and(|ext| ext == "c") {
                    println!("cargo:rerun-if-changed={}", path.display());
                    build.file(path);
                }
            }
        }

        build.compile("wren");
        root.join("include")
    } else {
        if let Ok(lib_dir) = env::var("WREN_LIB_DIR") {
            println!("cargo:rustc-link-search=native={lib_dir}");
        }
        println!("cargo:rustc-link-lib=wren");
        env::var("WREN_INCLUDE_DIR")
            .map(PathBuf::from)
            .expect("set WREN_SOURCE_DIR, or WREN_INCLUDE_DIR next to a prebuilt libwren")
    };

    if target_os != "windows" {
        println!("cargo:rustc-link-lib=m");
    }

    let header = include_dir.join("wren.h");
    println!("cargo:rerun-if-changed={}", header.display());

    let bindings = bindgen::Builder::default()
        .header(header.to_string_lossy().into_owned())
        .clang_arg(format!("-I{}", include_dir.display()))
        .allowlist_function("wren.*")
        .allowlist_type("Wren.*")
        .allowlist_var("WREN_.*")
        .constified_enum("Wren.*")
        .default_macro_constant_type(MacroTypeVariation::Signed)
        .derive_default(true)
        .use_core()
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .generate()
        .expect("Unable to generate bindings for wren.h");

    let out_path = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    bindings
        .write_to_file(out_path.join("bindings.rs"))
        .expect("Couldn't write bindings!");
}
