//! Purpose: Resolve the expected on-disk path of the `insign_ffi` dynamic library.
//! Exports: `Platform`, `library_path`, `resolve_library_path`, path constants.
//! Role: Library Locator; pure string/path construction, no filesystem access.
//! Invariants: Same platform in, same path out.
//! Invariants: Unknown platforms fail before any load is attempted.
//! Invariants: An explicit override (flag or env) bypasses platform naming entirely.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind};

pub const LIBRARY_STEM: &str = "insign_ffi";
pub const BUILD_OUTPUT_DIR: &str = "target/release";
pub const LIBRARY_ENV: &str = "INSIGN_FFI_LIB";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
    Other(String),
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Accepts both Rust (`macos`) and uname-style (`Darwin`) spellings.
    pub fn from_os_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "macos" | "darwin" => Self::MacOs,
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            _ => Self::Other(name.to_string()),
        }
    }

    fn library_affixes(&self) -> Result<(&'static str, &'static str), Error> {
        match self {
            Self::MacOs => Ok(("lib", ".dylib")),
            Self::Linux => Ok(("lib", ".so")),
            Self::Windows => Ok(("", ".dll")),
            Self::Other(name) => Err(Error::new(ErrorKind::UnsupportedPlatform)
                .with_message(format!("unsupported platform: {name}"))
                .with_hint(format!("Pass --library or set {LIBRARY_ENV} to the library path."))),
        }
    }
}

pub fn library_file_name(platform: &Platform) -> Result<String, Error> {
    let (prefix, suffix) = platform.library_affixes()?;
    Ok(format!("{prefix}{LIBRARY_STEM}{suffix}"))
}

pub fn library_path(platform: &Platform) -> Result<PathBuf, Error> {
    Ok(Path::new(BUILD_OUTPUT_DIR).join(library_file_name(platform)?))
}

/// Flag wins over env; an empty env value counts as unset.
pub fn resolve_library_path(
    flag: Option<PathBuf>,
    env: Option<OsString>,
    platform: &Platform,
) -> Result<PathBuf, Error> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(value) = env.filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(value));
    }
    library_path(platform)
}
