//! Purpose: Build the `c/insign_stub.c` shared library used by the runner's tests.
//! Role: Cargo build-script; compiles two stub variants into `OUT_DIR` and exports their paths.
//! Invariants: `INSIGN_STUB_LIB` names a library with all three `insign_*` exports.
//! Invariants: `INSIGN_STUB_NO_VERSION_LIB` names a variant missing `insign_abi_version`.
//! Invariants: A missing C toolchain only warns; the runner itself never links the stub.
//! Invariants: Windows targets skip the stub; the tests that need it are unix-only.
use std::env;
use std::path::{Path, PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=c/insign_stub.c");

    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("windows") {
        return;
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let source = manifest_dir.join("c").join("insign_stub.c");

    build_stub(&source, &out_dir, &target, "insign_stub", &[], "INSIGN_STUB_LIB");
    build_stub(
        &source,
        &out_dir,
        &target,
        "insign_stub_no_version",
        &["-DINSIGN_STUB_OMIT_ABI_VERSION"],
        "INSIGN_STUB_NO_VERSION_LIB",
    );
}

fn build_stub(
    source: &Path,
    out_dir: &Path,
    target: &str,
    name: &str,
    defines: &[&str],
    env_key: &str,
) {
    let (link_flag, suffix) = if target.contains("apple") {
        ("-dynamiclib", "dylib")
    } else {
        ("-shared", "so")
    };
    let output = out_dir.join(format!("lib{name}.{suffix}"));

    let compiler = match cc::Build::new()
        .cargo_metadata(false)
        .warnings(false)
        .try_get_compiler()
    {
        Ok(compiler) => compiler,
        Err(err) => {
            println!("cargo:warning=insign stub not built: no C compiler ({err})");
            return;
        }
    };

    let status = compiler
        .to_command()
        .arg(link_flag)
        .arg("-fPIC")
        .args(defines)
        .arg(source)
        .arg("-o")
        .arg(&output)
        .status();

    match status {
        Ok(status) if status.success() => {
            println!("cargo:rustc-env={env_key}={}", output.display());
        }
        Ok(status) => println!("cargo:warning=insign stub {name} failed to build ({status})"),
        Err(err) => println!("cargo:warning=insign stub {name} failed to build ({err})"),
    }
}
