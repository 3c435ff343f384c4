//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// True when the configured format selects structured JSON output.
fn wants_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}

/// Install the global tracing subscriber.
///
/// A `RUST_LOG` environment variable overrides the configured level.
/// The format field picks JSON lines for log shippers or a compact
/// human layout for local runs.
pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if wants_json(&config.format) {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_detection() {
        assert!(wants_json("json"));
        assert!(wants_json("JSON"));
        assert!(!wants_json("pretty"));
        assert!(!wants_json(""));
    }
}
