//! Purpose: Structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`, `notice_text`, `abi_mismatch_notice`, `notice_time_now`.
//! Role: Diagnostics that warn without changing stdout or the exit status.
//! Invariants: Notices are never written to stdout.
//! Invariants: JSON schema is additive-only; `kind` values are stable.
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::binding::AbiMismatch;

pub const CMD: &str = "insign-ffi-runner";
pub const ABI_VERSION_MISMATCH: &str = "abi_version_mismatch";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    json!({ "notice": notice })
}

pub fn notice_text(notice: &Notice) -> String {
    format!("warning: {}", notice.message)
}

pub fn abi_mismatch_notice(mismatch: AbiMismatch, library: &Path, time: String) -> Notice {
    let mut details = Map::new();
    details.insert("expected".to_string(), json!(mismatch.expected));
    details.insert("actual".to_string(), json!(mismatch.actual));
    details.insert("library".to_string(), json!(library.display().to_string()));

    Notice {
        kind: ABI_VERSION_MISMATCH.to_string(),
        time,
        cmd: CMD.to_string(),
        message: format!(
            "expected ABI version {}, got {}",
            mismatch.expected, mismatch.actual
        ),
        details,
    }
}

pub fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}
