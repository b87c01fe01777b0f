//! Tracing initialisation for the binary and for tests that want output

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter for a `-v` count
#[must_use]
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,preview_core=info",
        2 => "info,preview_core=debug",
        _ => "trace",
    }
}

/// Install the global fmt subscriber
///
/// `RUST_LOG` takes precedence over `verbosity`. Returns `false` when a
/// subscriber was already installed.
pub fn init(verbosity: u8, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));
    let builder = fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_filters() {
        assert_eq!(default_filter(0), "warn");
        assert_eq!(default_filter(2), "info,preview_core=debug");
        assert_eq!(default_filter(9), "trace");
    }

    #[test]
    fn second_init_is_harmless() {
        init(0, false);
        assert!(!init(0, false));
    }
}
