//! Logging initialization.
//!
//! Structured logging via the `log` facade with an `env_logger`
//! backend. The level is determined by, in priority order:
//!
//! 1. The `RUST_LOG` environment variable, if set
//! 2. CLI flags: `--quiet` (errors only) or `-v`/`-vv` (debug/trace)
//! 3. Default: info

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logging subsystem from CLI verbosity flags.
///
/// Call once at startup, before any logging macros run. Panics if
/// called twice, as `env_logger` can only be installed once per
/// process.
pub fn init(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();

    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else {
        builder.filter_level(level_for(verbose, quiet));
    }

    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{level:<5}{style:#} {}", record.args())
    });

    builder.init();
}

/// Map CLI flags to a log level. `quiet` wins over `verbose`.
fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}
