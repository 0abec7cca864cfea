//! Start-up configuration.
//!
//! Everything has a default; the command line can override the initial
//! source and the window capacity, and make malformed response bodies an
//! error instead of an empty batch:
//!
//! ```text
//! numwindow [--strict] [SOURCE] [CAPACITY]
//! ```
//!
//! Bad values are rejected here, before the first fetch, so the window and
//! the average never see an invalid capacity.

use std::time::Duration;

use thiserror::Error;

use crate::source::{BodyPolicy, SourceId, UnknownSource, DEFAULT_TIMEOUT};
use crate::window::Capacity;

/// How often auto-refresh re-triggers a fetch once it is switched on.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] UnknownSource),

    #[error("invalid capacity '{0}': expected a positive integer")]
    Capacity(String),

    #[error("unexpected argument '{0}'\nusage: numwindow [--strict] [p|f|e|r] [CAPACITY]")]
    UnexpectedArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Source fetched at start-up.
    pub source: SourceId,
    pub capacity: Capacity,
    /// Per-request timeout.
    pub timeout: Duration,
    pub body_policy: BodyPolicy,
    pub refresh_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceId::default(),
            capacity: Capacity::default(),
            timeout: DEFAULT_TIMEOUT,
            body_policy: BodyPolicy::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl Config {
    /// Build a config from positional arguments (program name excluded).
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        let (flags, positional): (Vec<S>, Vec<S>) = args
            .into_iter()
            .partition(|arg| <S as AsRef<str>>::as_ref(arg) == "--strict");
        if !flags.is_empty() {
            config.body_policy = BodyPolicy::Strict;
        }
        let mut args = positional.into_iter();

        if let Some(source) = args.next() {
            config.source = source.as_ref().parse()?;
        }
        if let Some(capacity) = args.next() {
            config.capacity = parse_capacity(capacity.as_ref())?;
        }
        if let Some(extra) = args.next() {
            return Err(ConfigError::UnexpectedArgument(extra.as_ref().to_string()));
        }

        Ok(config)
    }
}

pub fn parse_capacity(s: &str) -> Result<Capacity, ConfigError> {
    s.trim()
        .parse::<usize>()
        .ok()
        .and_then(Capacity::new)
        .ok_or_else(|| ConfigError::Capacity(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::from_args(Vec::<String>::new()).unwrap();
        assert_eq!(c.source, SourceId::Prime);
        assert_eq!(c.capacity.get(), 10);
        assert_eq!(c.timeout, Duration::from_millis(500));
        assert_eq!(c.body_policy, BodyPolicy::Lenient);
    }

    #[test]
    fn source_and_capacity_from_args() {
        let c = Config::from_args(["f", "3"]).unwrap();
        assert_eq!(c.source, SourceId::Fibonacci);
        assert_eq!(c.capacity.get(), 3);
    }

    #[test]
    fn strict_flag_anywhere() {
        let c = Config::from_args(["e", "--strict", "4"]).unwrap();
        assert_eq!(c.body_policy, BodyPolicy::Strict);
        assert_eq!(c.source, SourceId::Even);
        assert_eq!(c.capacity.get(), 4);
    }

    #[test]
    fn rejects_bad_capacity() {
        for bad in ["0", "-2", "ten", ""] {
            assert_eq!(
                Config::from_args(["p", bad]),
                Err(ConfigError::Capacity(bad.to_string()))
            );
        }
    }

    #[test]
    fn rejects_unknown_source() {
        assert!(matches!(
            Config::from_args(["x"]),
            Err(ConfigError::Source(_))
        ));
    }

    #[test]
    fn rejects_extra_arguments() {
        assert_eq!(
            Config::from_args(["p", "5", "more"]),
            Err(ConfigError::UnexpectedArgument("more".into()))
        );
    }
}
