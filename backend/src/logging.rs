//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! `RUST_LOG` wins when set. Otherwise the crate logs at `info`, raised by
//! each `-v` on the command line:
//!
//! - (none): `info`
//! - `-v`: `debug`
//! - `-vv` and up: `trace`

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level for a count of `-v` flags.
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Default filter directive for a verbosity.
pub fn default_directive(verbose: u8) -> String {
    format!(
        "samestore={}",
        level_for_verbosity(verbose).as_str().to_lowercase()
    )
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(verbose > 0).with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for_verbosity(0), Level::INFO);
        assert_eq!(level_for_verbosity(1), Level::DEBUG);
        assert_eq!(level_for_verbosity(5), Level::TRACE);
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0), "samestore=info");
        assert_eq!(default_directive(1), "samestore=debug");
    }

    #[test]
    fn test_init_twice() {
        init_logging(0);
        init_logging(1);
    }
}
