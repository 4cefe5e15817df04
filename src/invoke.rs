//! Purpose: Run one `insign_compile_json` call and surface its result.
//! Exports: `Outcome`, `read_input`, `compile`, `emit`.
//! Role: Invocation steps of the runner; `main` composes them with locate/bind.
//! Invariants: The input buffer stays harness-owned and is only lent for the call.
//! Invariants: Any non-null output is released through `insign_free`, even when decoding fails.
//! Invariants: A null output is `NullOutput`, independent of the returned status.
//! Invariants: Non-zero native status is data, not an error; it is passed through untouched.
use std::fs;
use std::io::Write;
use std::path::Path;
use std::ptr;

use libc::size_t;
use tracing::debug;

use crate::binding::EntryPoints;
use crate::buffer::NativeBuf;
use crate::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome {
    pub status: i32,
    pub payload: String,
}

/// Reads the whole file; the bytes are sent verbatim but must be UTF-8.
pub fn read_input(path: &Path) -> Result<Vec<u8>, Error> {
    let bytes = fs::read(path).map_err(|err| {
        Error::new(ErrorKind::Input)
            .with_message("failed to read input file")
            .with_path(path)
            .with_source(err)
    })?;
    if let Err(err) = std::str::from_utf8(&bytes) {
        return Err(Error::new(ErrorKind::Input)
            .with_message("input file is not valid UTF-8")
            .with_path(path)
            .with_source(err));
    }
    Ok(bytes)
}

pub fn compile(entry: &EntryPoints, input: &[u8]) -> Result<Outcome, Error> {
    let mut output_ptr: *mut u8 = ptr::null_mut();
    let mut output_len: size_t = 0;

    debug!(input_len = input.len(), "calling compile");
    let status = unsafe {
        (entry.compile)(
            input.as_ptr(),
            input.len(),
            &mut output_ptr,
            &mut output_len,
        )
    };

    let Some(output) = (unsafe { NativeBuf::from_raw(output_ptr, output_len, entry) }) else {
        debug!(status, "compile returned a null output");
        return Err(Error::new(ErrorKind::NullOutput)
            .with_message(format!("no output received from compile (status {status})")));
    };
    debug!(status, output_len = output.len(), "compile returned");
    if output.is_empty() {
        debug!("compile returned an empty output buffer");
    }
    let payload = output.to_str()?.to_owned();

    Ok(Outcome { status, payload })
}

/// Writes the payload and a newline, then flushes so it survives `process::exit`.
pub fn emit(outcome: &Outcome, mut out: impl Write) -> Result<(), Error> {
    writeln!(out, "{}", outcome.payload)
        .and_then(|()| out.flush())
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to write output")
                .with_source(err)
        })
}
