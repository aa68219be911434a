//! Shared `fern` + `log` setup for the node and coordinator binaries.
//!
//! Mirrors the teacher CLI's `trace.rs`, minus the rolling file appender:
//! these are long-running daemons, so stderr is what the process
//! supervisor expects, not a log directory.

use std::str::FromStr;

use log::LevelFilter;

/// Installs a global logger. Level comes from `KVTX_LOG` (default `info`).
///
/// Safe to call more than once per process; a second call is a no-op.
pub fn init() {
    let level = std::env::var("KVTX_LOG").unwrap_or_else(|_| "info".to_string());
    let level = LevelFilter::from_str(&level).unwrap_or(LevelFilter::Info);

    let result = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} [{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();

    if result.is_err() {
        // logger already installed (e.g. a test harness set one up) -- not fatal.
        log::debug!("logger already initialized");
    }
}
