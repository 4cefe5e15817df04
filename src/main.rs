//! Purpose: `insign-ffi-runner` entry point.
//! Role: Read one input file, call `insign_compile_json` through the dynamic library, print the result.
//! Invariants: stdout carries only the decoded payload plus a newline.
//! Invariants: Diagnostics go to stderr as one line each (JSON when stderr is not a terminal).
//! Invariants: Exit status is the native compile status, or 1 for any harness-local failure.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use insign_parity::binding::{bind, check_abi_version};
use insign_parity::invoke::{self, read_input};
use insign_parity::locate::{LIBRARY_ENV, Platform, resolve_library_path};
use insign_parity::notice::{Notice, abi_mismatch_notice, notice_json, notice_text, notice_time_now};
use insign_parity::{Error, ErrorKind, to_exit_code};

const LOG_ENV: &str = "INSIGN_FFI_LOG";
const USAGE: &str = "usage: insign-ffi-runner <input_file>";

#[derive(Parser, Debug)]
#[command(
    name = "insign-ffi-runner",
    version,
    about = "Run one insign_compile_json call through the insign-ffi dynamic library"
)]
struct Cli {
    /// Input file with the UTF-8 JSON payload passed to compile
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Library path to load instead of the default build output
    #[arg(long, value_name = "PATH")]
    library: Option<PathBuf>,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    // Unix keeps only the low 8 bits: a native status of 256 is observed as 0.
    debug!(raw_status = exit_code, "exiting");
    std::process::exit(exit_code);
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                return Ok(0);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint(USAGE));
            }
        },
    };

    let input = read_input(&cli.input)?;

    let library_path = resolve_library_path(
        cli.library,
        std::env::var_os(LIBRARY_ENV),
        &Platform::current(),
    )?;
    let library = bind(&library_path)?;
    let entry = library.entry_points();

    if let Some(mismatch) = check_abi_version(entry) {
        let time = notice_time_now().unwrap_or_default();
        emit_notice(&abi_mismatch_notice(mismatch, library.path(), time));
    }

    let outcome = invoke::compile(entry, &input)?;
    invoke::emit(&outcome, io::stdout().lock())?;
    Ok(outcome.status)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or("invalid arguments").trim();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Io\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_notice(notice: &Notice) {
    if io::stderr().is_terminal() {
        eprintln!("{}", notice_text(notice));
        return;
    }
    match serde_json::to_string(&notice_json(notice)) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("{}", notice_text(notice)),
    }
}

fn error_text(err: &Error) -> String {
    let mut line = format!("error: {err}");
    if let Some(hint) = err.hint() {
        line.push_str(&format!(" hint: {hint}"));
    }
    if let Some(cause) = error_causes(err).first() {
        line.push_str(&format!(" caused by: {cause}"));
    }
    line
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("error")),
    );
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = std::error::Error::source(err);
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = std::error::Error::source(cause);
    }
    causes
}
