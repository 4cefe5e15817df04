//! Purpose: Declare the `insign_ffi` C ABI and bind it from a dynamic library.
//! Exports: entry-point type aliases, `EntryPoints`, `BoundLibrary`, `bind`, `check_abi_version`.
//! Role: ABI Binding Layer; the only place that names native symbols or signatures.
//! Invariants: These aliases must match the exported contract exactly; a mismatch is UB, not an error.
//! Invariants: Entry points are only reachable through a live `BoundLibrary` borrow.
//! Invariants: A missing library path is reported before the native loader is invoked.
//! Notes: Per-platform loading (dlopen/LoadLibraryW) is delegated to `libloading`.

use std::path::{Path, PathBuf};

use libc::{c_void, size_t};
use libloading::{Library, Symbol};
use tracing::debug;

use crate::error::{Error, ErrorKind};

pub const EXPECTED_ABI_VERSION: u32 = 1;

pub const ABI_VERSION_SYMBOL: &str = "insign_abi_version";
pub const COMPILE_SYMBOL: &str = "insign_compile_json";
pub const FREE_SYMBOL: &str = "insign_free";

pub const BUILD_HINT: &str = "Run 'cargo build -p insign-ffi --release' first.";

/// `uint32_t insign_abi_version(void)`
pub type AbiVersionFn = unsafe extern "C" fn() -> u32;

/// `int32_t insign_compile_json(const uint8_t *in, size_t in_len, uint8_t **out, size_t *out_len)`
pub type CompileFn = unsafe extern "C" fn(
    input_ptr: *const u8,
    input_len: size_t,
    output_ptr: *mut *mut u8,
    output_len: *mut size_t,
) -> i32;

/// `void insign_free(void *ptr, size_t len)`
pub type FreeFn = unsafe extern "C" fn(ptr: *mut c_void, len: size_t);

#[derive(Debug)]
pub struct EntryPoints {
    pub abi_version: AbiVersionFn,
    pub compile: CompileFn,
    pub free: FreeFn,
}

/// A loaded library plus its resolved entry points.
///
/// The handle is released when this value drops; there is no explicit unload.
#[derive(Debug)]
pub struct BoundLibrary {
    entry: EntryPoints,
    path: PathBuf,
    _library: Library,
}

impl BoundLibrary {
    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn bind(path: &Path) -> Result<BoundLibrary, Error> {
    if !path.exists() {
        return Err(Error::new(ErrorKind::LibraryNotFound)
            .with_message("library not found")
            .with_path(path)
            .with_hint(BUILD_HINT));
    }

    debug!(path = %path.display(), "loading library");
    let library = unsafe { Library::new(path) }.map_err(|err| {
        Error::new(ErrorKind::Load)
            .with_message("failed to load library")
            .with_path(path)
            .with_source(err)
    })?;

    let entry = unsafe {
        EntryPoints {
            abi_version: resolve::<AbiVersionFn>(&library, ABI_VERSION_SYMBOL, path)?,
            compile: resolve::<CompileFn>(&library, COMPILE_SYMBOL, path)?,
            free: resolve::<FreeFn>(&library, FREE_SYMBOL, path)?,
        }
    };
    debug!(path = %path.display(), "resolved entry points");

    Ok(BoundLibrary {
        entry,
        path: path.to_path_buf(),
        _library: library,
    })
}

/// Copies a function pointer out of the library.
///
/// Safety: `T` must be the symbol's true signature, and the returned pointer
/// must not be called after `library` is dropped.
unsafe fn resolve<T: Copy>(library: &Library, symbol: &str, path: &Path) -> Result<T, Error> {
    let found: Symbol<'_, T> = unsafe { library.get(symbol.as_bytes()) }.map_err(|err| {
        Error::new(ErrorKind::Load)
            .with_message(format!("missing symbol {symbol}"))
            .with_path(path)
            .with_source(err)
    })?;
    Ok(*found)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AbiMismatch {
    pub expected: u32,
    pub actual: u32,
}

/// Returns the skew, if any; callers warn and continue.
pub fn check_abi_version(entry: &EntryPoints) -> Option<AbiMismatch> {
    let actual = unsafe { (entry.abi_version)() };
    debug!(actual, expected = EXPECTED_ABI_VERSION, "abi version");
    (actual != EXPECTED_ABI_VERSION).then_some(AbiMismatch {
        expected: EXPECTED_ABI_VERSION,
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::{AbiMismatch, EXPECTED_ABI_VERSION, bind, check_abi_version};
    use crate::error::ErrorKind;
    use crate::stub::{self, StubConfig};
    use std::fs;
    #[cfg(unix)]
    use std::path::PathBuf;

    #[cfg(unix)]
    fn fixture(path: Option<&'static str>) -> PathBuf {
        PathBuf::from(path.expect("insign stub library is built by build.rs"))
    }

    #[test]
    fn missing_library_is_not_found_with_build_hint() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("libinsign_ffi.so");

        let err = bind(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LibraryNotFound);
        assert_eq!(err.path(), Some(path.as_path()));
        assert!(err.hint().unwrap().contains("cargo build -p insign-ffi --release"));
    }

    #[test]
    fn malformed_library_is_load_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("libinsign_ffi.so");
        fs::write(&path, b"definitely not an object file").expect("write");

        let err = bind(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert_eq!(err.message(), Some("failed to load library"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn stub_library_binds_all_entry_points() {
        let path = fixture(option_env!("INSIGN_STUB_LIB"));

        let library = bind(&path).expect("bind");
        assert_eq!(library.path(), path.as_path());
        assert_eq!(check_abi_version(library.entry_points()), None);
    }

    #[cfg(unix)]
    #[test]
    fn missing_symbol_is_load_error_naming_it() {
        let path = fixture(option_env!("INSIGN_STUB_NO_VERSION_LIB"));

        let err = bind(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert_eq!(err.message(), Some("missing symbol insign_abi_version"));
        assert_eq!(err.path(), Some(path.as_path()));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn matching_version_reports_nothing() {
        stub::install(StubConfig::default());
        assert_eq!(check_abi_version(&stub::entry_points()), None);
    }

    #[test]
    fn skewed_version_is_reported() {
        stub::install(StubConfig {
            abi_version: 99,
            ..StubConfig::default()
        });
        assert_eq!(
            check_abi_version(&stub::entry_points()),
            Some(AbiMismatch {
                expected: EXPECTED_ABI_VERSION,
                actual: 99,
            })
        );
    }
}
