//! Server configuration from command-line flags and environment variables.
//!
//! Precedence: flag, then environment variable, then built-in default.

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 4860;
const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Trace file hosted at `/api/trace`
    pub trace_file: Option<PathBuf>,
    pub port: u16,
    pub static_dir: PathBuf,
    /// Where saved threads are persisted
    pub data_dir: PathBuf,
}

#[derive(Debug, PartialEq)]
pub enum ParseOutcome {
    Run(Config),
    Help,
}

pub fn usage() -> &'static str {
    "usage:
  trace-viewer [<trace.jsonl>] [--port <n>] [--static-dir <dir>] [--data-dir <dir>]

environment:
  PORT                      listen port (default 4860)
  TRACE_VIEWER_STATIC_DIR   frontend assets (default ./static)
  TRACE_VIEWER_DATA_DIR     saved threads (default ~/.trace-viewer)
"
}

/// Resolve from the process arguments and environment.
pub fn parse_args() -> Result<ParseOutcome, String> {
    parse_args_impl(std::env::args().skip(1), |key| std::env::var(key).ok())
}

/// Flags override environment variables, which override defaults.
pub fn parse_args_impl<I, E>(args: I, env: E) -> Result<ParseOutcome, String>
where
    I: IntoIterator<Item = String>,
    E: Fn(&str) -> Option<String>,
{
    let mut args = args.into_iter();
    let mut trace_file = None;
    let mut port = None;
    let mut static_dir = None;
    let mut data_dir = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--port" => {
                let value = args.next().ok_or("--port needs a value")?;
                port = Some(parse_port(&value)?);
            }
            "--static-dir" => {
                static_dir = Some(PathBuf::from(args.next().ok_or("--static-dir needs a value")?));
            }
            "--data-dir" => {
                data_dir = Some(PathBuf::from(args.next().ok_or("--data-dir needs a value")?));
            }
            "-h" | "--help" | "help" => return Ok(ParseOutcome::Help),
            flag if flag.starts_with("--") => return Err(format!("unknown flag: {}", flag)),
            _ => {
                if trace_file.is_some() {
                    return Err(format!("unexpected argument: {}", arg));
                }
                trace_file = Some(PathBuf::from(arg));
            }
        }
    }

    let port = match port {
        Some(port) => port,
        None => match env("PORT") {
            Some(value) => parse_port(&value)?,
            None => DEFAULT_PORT,
        },
    };
    let static_dir = static_dir
        .or_else(|| env("TRACE_VIEWER_STATIC_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
    let data_dir = data_dir
        .or_else(|| env("TRACE_VIEWER_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| {
            let home = env("HOME").unwrap_or_else(|| ".".to_string());
            PathBuf::from(home).join(".trace-viewer")
        });

    Ok(ParseOutcome::Run(Config {
        trace_file,
        port,
        static_dir,
        data_dir,
    }))
}

fn parse_port(value: &str) -> Result<u16, String> {
    value
        .parse()
        .map_err(|_| format!("invalid port: {}", value))
}
