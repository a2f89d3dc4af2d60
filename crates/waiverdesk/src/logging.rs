//! Logging setup for waiverdesk.
//!
//! Pipeline stages log through `tracing`. Logs go to stderr so that stdout
//! only carries command output such as the submission summary.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How much the CLI logs, chosen with `-q`, `-v` and `-vv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Stage outcomes: uploads, records, notifications.
    #[default]
    Normal,
    /// Adds request details and queue activity.
    Verbose,
    /// Everything, including the HTTP client internals.
    Trace,
}

impl Verbosity {
    /// Pick a level from the CLI flags. `quiet` wins over any `-v`.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// The level applied to waiverdesk's own events.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    ///
    /// The HTTP stack stays at `warn` unless tracing is requested.
    #[must_use]
    pub fn filter_directives(&self) -> String {
        let own = self.to_level_filter();
        let http = if *self == Self::Trace {
            Level::DEBUG
        } else {
            Level::WARN
        };
        format!("waiverdesk={own},reqwest={http},hyper={http}")
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the directives derived from `verbosity`.
/// Only the first call has any effect.
///
/// # Examples
///
/// ```no_run
/// use waiverdesk::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity != Verbosity::Normal)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}

/// Warnings-only logging captured by the test harness.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("waiverdesk=warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(2, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(7, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(2, true), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_to_level() {
        assert_eq!(Verbosity::Quiet.to_level_filter(), Level::ERROR);
        assert_eq!(Verbosity::Normal.to_level_filter(), Level::INFO);
        assert_eq!(Verbosity::Verbose.to_level_filter(), Level::DEBUG);
        assert_eq!(Verbosity::Trace.to_level_filter(), Level::TRACE);
    }

    #[test]
    fn test_http_stack_quiet_below_trace() {
        assert_eq!(
            Verbosity::Verbose.filter_directives(),
            "waiverdesk=DEBUG,reqwest=WARN,hyper=WARN"
        );
        assert_eq!(
            Verbosity::Trace.filter_directives(),
            "waiverdesk=TRACE,reqwest=DEBUG,hyper=DEBUG"
        );
    }

    #[test]
    fn test_directives_parse() {
        for verbosity in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::Trace,
        ] {
            assert!(EnvFilter::try_new(verbosity.filter_directives()).is_ok());
        }
    }

    #[test]
    fn test_init_logging_twice() {
        init_test_logging();
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
    }
}
