//! Process logging.
//!
//! The crate logs through the [`log`] facade. [`init`] installs an
//! `env_logger` that prints lines like
//!
//! ```text
//! [ 2026-10-17T09:30:00Z]  INFO: created bucket my-site in us-east-2
//! ```
//!
//! Every level goes to stderr so stdout stays free for command output.
//! Directives in `RUST_LOG` still apply on top of the chosen level.
use colored::Colorize;
use log::LevelFilter;
use std::io::Write;

use crate::{Error, UnknownLogLevelSnafu};

/// The most verbose kind of message that should be printed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Maps a count of `-v` flags to a level, starting at [`LogLevel::Warn`].
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl core::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        })
    }
}

impl core::str::FromStr for LogLevel {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(match input {
            "ERROR" => LogLevel::Error,
            "WARNING" => LogLevel::Warn,
            "INFO" => LogLevel::Info,
            "DEBUG" => LogLevel::Debug,
            "TRACE" => LogLevel::Trace,
            _ => return UnknownLogLevelSnafu { input }.fail(),
        })
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(value: log::Level) -> Self {
        match value {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

fn format_line(
    timestamp: impl core::fmt::Display,
    level: log::Level,
    message: impl core::fmt::Display,
) -> String {
    let label = LogLevel::from(level).to_string();
    let label = match level {
        log::Level::Error => label.red().bold(),
        log::Level::Warn => label.yellow(),
        log::Level::Info => label.green(),
        log::Level::Debug => label.blue(),
        log::Level::Trace => label.dimmed(),
    };
    format!("[ {timestamp}]  {label}: {message}")
}

/// Returns a logger builder showing messages from this crate at `level` and
/// from everything else at warn and above.
///
/// Binaries typically add `filter_module` for their own crate before calling
/// `init`.
pub fn builder(level: LogLevel) -> env_logger::Builder {
    let mut builder = env_logger::Builder::default();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module("kit", level.into())
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            let line = format_line(buf.timestamp(), record.level(), record.args());
            writeln!(buf, "{line}")
        })
        .parse_default_env();
    builder
}

/// Installs the process logger, see [`builder`].
///
/// Panics if a logger was already installed.
pub fn init(level: LogLevel) {
    builder(level).init()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_level_names() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert_eq!(level, level.to_string().parse::<LogLevel>().unwrap());
        }
        assert!(matches!(
            "warning".parse::<LogLevel>(),
            Err(Error::UnknownLogLevel { .. })
        ));
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(LogLevel::Warn, LogLevel::from_verbosity(0));
        assert_eq!(LogLevel::Info, LogLevel::from_verbosity(1));
        assert_eq!(LogLevel::Trace, LogLevel::from_verbosity(9));
        assert_eq!(LevelFilter::Debug, LevelFilter::from(LogLevel::from_verbosity(2)));
    }

    #[test]
    fn levels_are_ordered_by_verbosity() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Info < LogLevel::Trace);
    }

    #[test]
    fn line_format() {
        let line = format_line("2026-10-17T09:30:00Z", log::Level::Warn, "disk is full");
        assert!(line.starts_with("[ 2026-10-17T09:30:00Z]  "), "{line}");
        assert!(line.contains("WARNING"), "{line}");
        assert!(line.ends_with(": disk is full"), "{line}");
    }
}
