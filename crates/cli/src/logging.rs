//! Subscriber setup for the `arsim` binary.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::OutputFormat;

/// Filter used when `RUST_LOG` is unset. Logging is off for `--quiet`
/// and for JSON output, so stderr only ever carries the error object.
fn default_directive(level: &str, quiet: bool, output: OutputFormat) -> &str {
    if quiet || output == OutputFormat::Json {
        "off"
    } else {
        level
    }
}

/// Install a stderr fmt subscriber. `RUST_LOG` wins over the default
/// directive; an unparseable level falls back to `warn`.
pub(crate) fn init(level: &str, quiet: bool, output: OutputFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level, quiet, output)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init in the same process is harmless; ignore it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_output_uses_requested_level() {
        assert_eq!(default_directive("debug", false, OutputFormat::Text), "debug");
    }

    #[test]
    fn json_output_silences_logs() {
        assert_eq!(default_directive("warn", false, OutputFormat::Json), "off");
    }

    #[test]
    fn quiet_silences_logs() {
        assert_eq!(default_directive("info", true, OutputFormat::Text), "off");
    }
}
