//! Tracing setup for the `advlock` binary.
//!
//! The library crates only emit events; this is the one place a subscriber is
//! installed. Output goes to stderr so it never mixes with `probe --json` or
//! the wrapped command's stdout.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
#[must_use]
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "advlock=debug,advlock_lock=debug,advlock_config=debug,info"
    } else {
        "advlock=info,advlock_lock=warn,warn"
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`. Fails if a subscriber is
/// already installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_directives(verbose)).is_ok());
        }
    }

    #[test]
    fn test_verbose_enables_debug() {
        assert!(default_directives(true).contains("advlock=debug"));
        assert!(!default_directives(false).contains("debug"));
    }
}
