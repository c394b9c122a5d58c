// ============================================================================
// reframe-cli/src/logging.rs
// ============================================================================
//
// LOGGING: env_logger setup for the reframe binary
//
// Log lines go to stderr as "TIMESTAMP LEVEL message". The level defaults to
// info (debug with --verbose). RUST_LOG still overrides it, e.g.
// RUST_LOG=reframe_core::remux::scheduler=trace.

use std::io::Write;

use console::style;
use log::{LevelFilter, debug};

/// Returns the current local time formatted for log lines.
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose { LevelFilter::Debug } else { LevelFilter::Info }
}

/// Initializes the global logger. Later calls are ignored.
pub fn init(verbose: bool) {
    let level = level_for(verbose);
    let result = env_logger::Builder::new()
        .format(|buf, record| {
            let level = match record.level() {
                log::Level::Error => style("ERROR").red().bold(),
                log::Level::Warn => style("WARN ").yellow(),
                log::Level::Info => style("INFO ").green(),
                log::Level::Debug => style("DEBUG").blue(),
                log::Level::Trace => style("TRACE").magenta(),
            };
            writeln!(buf, "{} {} {}", style(get_timestamp()).dim(), level, record.args())
        })
        .filter_level(level)
        .parse_default_env()
        .try_init();

    if result.is_ok() {
        debug!("Logger initialized with level: {}", level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_debug() {
        assert_eq!(level_for(true), LevelFilter::Debug);
        assert_eq!(level_for(false), LevelFilter::Info);
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        let stamp = get_timestamp();
        let (_, millis) = stamp.rsplit_once('.').unwrap();
        assert_eq!(millis.len(), 3);
    }
}
