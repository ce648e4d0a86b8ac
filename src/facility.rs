// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! GELF facility & level defintions.
//!
//! GELF borrowed its `level` field from syslog: it is the syslog severity, a number from zero
//! (system is unusable) through seven (debug). [`Level`] replicates the names used in
//! `<syslog.h>` so that the numbers on the wire are the numbers Graylog users expect.
//!
//! The facility, on the other hand, is _not_ the syslog facility. GELF 1.0 carried a free-text
//! `facility` field; 1.1 deprecated it in favor of an additional field. Either way it's just a
//! label for the application or subsystem emitting the message, so [`Facility`] is a string.

use serde::Deserialize;

type StdResult<T, E> = std::result::Result<T, E>;

/// A free-text label identifying the emitting application or subsystem.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Facility(String);

impl Facility {
    pub fn new<S: Into<String>>(name: S) -> Facility {
        Facility(name.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
    /// An empty facility isn't sent at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::convert::From<&str> for Facility {
    fn from(x: &str) -> Self {
        Facility::new(x)
    }
}

impl std::convert::From<String> for Facility {
    fn from(x: String) -> Self {
        Facility(x)
    }
}

impl std::fmt::Display for Facility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

/// The eight syslog severity levels. The enumeration values duplicate the constants documented as
/// per the `syslog()` manual [page] & defined in `<syslog.h>`; they are what goes into the GELF
/// `level` field.
///
/// [page]: https://man7.org/linux/man-pages/man3/syslog.3.html
///
/// Note that "more severe" is "numerically smaller": `LOG_ERR < LOG_INFO`.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// system is unusable
    #[serde(rename = "emergency", alias = "emerg")]
    LOG_EMERG = 0,
    /// action must be take immediately
    #[serde(rename = "alert")]
    LOG_ALERT = 1,
    /// critical conditions
    #[serde(rename = "critical", alias = "crit", alias = "fatal")]
    LOG_CRIT = 2,
    /// error conditions
    #[serde(rename = "error", alias = "err")]
    LOG_ERR = 3,
    /// warning conditions
    #[serde(rename = "warning", alias = "warn")]
    LOG_WARNING = 4,
    /// normal, but significant condition
    #[serde(rename = "notice")]
    LOG_NOTICE = 5,
    /// informational message
    #[serde(rename = "info", alias = "information")]
    LOG_INFO = 6,
    /// debug-level message
    #[serde(rename = "debug", alias = "trace", alias = "verbose")]
    LOG_DEBUG = 7,
}

impl Level {
    /// Map a [`tracing`] level to a GELF level; `TRACE` has nowhere to go but `LOG_DEBUG`.
    ///
    /// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
    pub fn from_tracing(level: &tracing::Level) -> Level {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::LOG_DEBUG,
            tracing::Level::INFO => Level::LOG_INFO,
            tracing::Level::WARN => Level::LOG_WARNING,
            tracing::Level::ERROR => Level::LOG_ERR,
        }
    }
    /// True if a message at this level gets through a sink whose minimum level is `minimum`.
    pub fn is_at_least(&self, minimum: Level) -> bool {
        *self <= minimum
    }
}

impl std::default::Default for Level {
    fn default() -> Self {
        Level::LOG_DEBUG
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Level::LOG_EMERG => "LOG_EMERG",
                Level::LOG_ALERT => "LOG_ALERT",
                Level::LOG_CRIT => "LOG_CRIT",
                Level::LOG_ERR => "LOG_ERR",
                Level::LOG_WARNING => "LOG_WARNING",
                Level::LOG_NOTICE => "LOG_NOTICE",
                Level::LOG_INFO => "LOG_INFO",
                Level::LOG_DEBUG => "LOG_DEBUG",
            }
        )
    }
}

#[cfg(test)]
mod facility_level_tests {
    use super::*;

    #[test]
    fn test_level_numbers() {
        assert_eq!(3, Level::LOG_ERR as u8);
        assert_eq!(6, Level::from_tracing(&tracing::Level::INFO) as u8);
        assert_eq!(7, Level::from_tracing(&tracing::Level::TRACE) as u8);
        assert_eq!(format!("{}", Level::LOG_WARNING), "LOG_WARNING".to_string());
    }

    #[test]
    fn test_minimum_level() {
        assert!(Level::LOG_ERR.is_at_least(Level::LOG_INFO));
        assert!(Level::LOG_INFO.is_at_least(Level::LOG_INFO));
        assert!(!Level::LOG_DEBUG.is_at_least(Level::LOG_INFO));
        assert!(!Level::LOG_ERR.is_at_least(Level::LOG_CRIT));
    }

    #[test]
    fn test_deserialize() {
        let lvl: Level = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(lvl, Level::LOG_WARNING);
        let lvl: Level = serde_json::from_str("\"fatal\"").unwrap();
        assert_eq!(lvl, Level::LOG_CRIT);
        let fac: Facility = serde_json::from_str("\"billing\"").unwrap();
        assert_eq!(fac.as_str(), "billing");
    }
}
