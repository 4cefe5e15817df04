//! Purpose: Library backing the `insign-ffi-runner` parity harness.
//! Exports: `locate`, `binding`, `buffer`, `invoke`, `notice`, `error`.
//! Role: Locate, bind and call the `insign_ffi` C ABI once; the binary composes the steps.
//! Invariants: Strictly sequential; no threads, no retries, no process-wide state.
//! Invariants: The loaded library is a local value owned by the caller, never a global.
pub mod binding;
pub mod buffer;
pub mod error;
pub mod invoke;
pub mod locate;
pub mod notice;

#[cfg(test)]
mod stub;

pub use error::{Error, ErrorKind, to_exit_code};
