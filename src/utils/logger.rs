//! Logger set-up for the binaries

use chrono::Local;
use log::{info, LevelFilter};

use crate::common::NavResult;

/// Install a `fern` logger writing to stdout.
///
/// Debug and trace records include their target. Can only be called once per
/// process; a second call returns `NavError::Logger`.
pub fn init_logger(level: LevelFilter) -> NavResult<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{} {:5}] {}: {}",
                    Local::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{} {:5}] {}",
                    Local::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    message
                ))
            }
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;

    info!("Logging initialised at {:?}", level);
    Ok(())
}

/// Parse a level name such as `"debug"`, falling back to `Info`
pub fn level_from_str(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_str() {
        assert_eq!(level_from_str("debug"), LevelFilter::Debug);
        assert_eq!(level_from_str("WARN"), LevelFilter::Warn);
        assert_eq!(level_from_str("loud"), LevelFilter::Info);
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_logger(LevelFilter::Warn);
        assert!(init_logger(LevelFilter::Warn).is_err());
    }
}
