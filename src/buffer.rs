//! Purpose: Own a native-allocated output buffer until it is handed back to the library.
//! Exports: `NativeBuf`.
//! Role: Scoped acquisition for `insign_compile_json` output; release happens in `Drop`.
//! Invariants: Never constructed from a null pointer.
//! Invariants: `insign_free` runs exactly once, with the pointer/length pair as received.
//! Invariants: The buffer cannot outlive the entry points (and thus the library) it came from.
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::slice;

use tracing::debug;

use crate::binding::{EntryPoints, FreeFn};
use crate::error::{Error, ErrorKind};

#[derive(Debug)]
pub struct NativeBuf<'lib> {
    ptr: NonNull<u8>,
    len: usize,
    free: FreeFn,
    _lib: PhantomData<&'lib EntryPoints>,
}

impl<'lib> NativeBuf<'lib> {
    /// Takes ownership of `ptr[..len]`, or returns `None` for a null pointer.
    ///
    /// # Safety
    /// A non-null `ptr` must point to `len` readable bytes allocated by the
    /// library behind `entry`, not yet freed and not owned by anything else.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize, entry: &'lib EntryPoints) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self {
            ptr,
            len,
            free: entry.free,
            _lib: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn to_str(&self) -> Result<&str, Error> {
        std::str::from_utf8(self.as_bytes()).map_err(|err| {
            Error::new(ErrorKind::Decode)
                .with_message("native output is not valid UTF-8")
                .with_source(err)
        })
    }
}

impl Drop for NativeBuf<'_> {
    fn drop(&mut self) {
        debug!(len = self.len, "releasing native output");
        unsafe { (self.free)(self.ptr.as_ptr().cast(), self.len) };
    }
}
