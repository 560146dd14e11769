//! Tracing subscriber setup shared by the command-line tools.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `DEBUG` when `debug`
/// is set and `INFO` when it is not. Calling this twice is harmless: the
/// second installation attempt is ignored.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(debug).to_string()));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .try_init();
}

fn default_level(debug: bool) -> Level {
    if debug {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), Level::DEBUG);
        assert_eq!(default_level(false), Level::INFO);
    }
}
