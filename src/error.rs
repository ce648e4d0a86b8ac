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

//! [gelf-tracing](crate) errors

use backtrace::Backtrace;

/// [gelf-tracing](crate) error type
///
/// [gelf-tracing](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis what the caller will
/// need to repond.
///
/// Only [`Error::BadConfig`] & [`Error::Transport`] are ever returned to application code (and
/// then only while building a sink). Everything that can go wrong while shipping an individual
/// event is swallowed by [`GelfSink::emit`] and reported through [`Diagnostics`].
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
/// [`GelfSink::emit`]: crate::sink::GelfSink::emit
/// [`Diagnostics`]: crate::diagnostics::Diagnostics
#[non_exhaustive]
pub enum Error {
    /// Invalid sink configuration
    BadConfig { reason: String, back: Backtrace },
    /// Failed to compress a GELF payload
    Compression {
        source: std::io::Error,
        back: Backtrace,
    },
    /// Failed to fetch hostname (via libc) or a local IP address in lieu of one
    NoHostname {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A payload would need more chunks than GELF allows
    Oversize {
        len: usize,
        chunks: usize,
        back: Backtrace,
    },
    /// Two structured fields map to the same GELF additional field; the later one was dropped
    DuplicateField {
        field: String,
        key: String,
        back: Backtrace,
    },
    /// A structured field could not be encoded as JSON
    Serialization {
        field: String,
        source: serde_json::Error,
        back: Backtrace,
    },
    /// General transport layer error
    Transport {
        source: std::io::Error,
        back: Backtrace,
    },
}

impl Error {
    /// A short, stable name for the kind of failure; used to key diagnostics.
    #[allow(unreachable_patterns)]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::BadConfig { .. } => "config",
            Error::Compression { .. } => "compression",
            Error::DuplicateField { .. } => "serialization",
            Error::NoHostname { .. } => "hostname",
            Error::Oversize { .. } => "oversize",
            Error::Serialization { .. } => "serialization",
            Error::Transport { .. } => "transport",
            _ => "other",
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadConfig { reason, .. } => write!(f, "Bad GELF sink configuration: {}", reason),
            Error::Compression { source, .. } => {
                write!(f, "While compressing a GELF payload, got {}", source)
            }
            Error::NoHostname { source, .. } => {
                write!(f, "Couldn't determine a hostname for this host: {}", source)
            }
            Error::Oversize { len, chunks, .. } => write!(
                f,
                "A {}-byte GELF payload would need {} chunks (at most {} are allowed); dropped",
                len,
                chunks,
                crate::chunk::MAX_CHUNKS
            ),
            Error::DuplicateField { field, key, .. } => write!(
                f,
                "Field '{}' would be sent as '{}', which is already taken; dropped",
                field, key
            ),
            Error::Serialization { field, source, .. } => {
                write!(f, "Field '{}' could not be serialized: {}", field, source)
            }
            Error::Transport { source, .. } => write!(f, "Transport error: {}", source),
            _ => write!(f, "Other gelf-tracing error"),
        }
    }
}

/// Capture the current stack without symbolizing it; symbols are looked up only when the error
/// is formatted with `{:?}`.
pub(crate) fn new_backtrace() -> Backtrace {
    Backtrace::new_unresolved()
}

fn resolved(back: &Backtrace) -> Backtrace {
    let mut back = back.clone();
    back.resolve();
    back
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadConfig { back, .. }
            | Error::Compression { back, .. }
            | Error::DuplicateField { back, .. }
            | Error::NoHostname { back, .. }
            | Error::Oversize { back, .. }
            | Error::Serialization { back, .. }
            | Error::Transport { back, .. } => write!(f, "{}\n{:#?}", self, resolved(back)),
            err => write!(f, "gelf-tracing error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    #[allow(unreachable_patterns)]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Compression { source, .. } => Some(source),
            Error::NoHostname { source, .. } => Some(source.as_ref()),
            Error::Serialization { source, .. } => Some(source),
            Error::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn debug_resolves_lazily() {
        let err = Error::BadConfig {
            reason: String::from("no Graylog host given"),
            back: new_backtrace(),
        };
        assert_eq!(err.kind(), "config");
        let text = format!("{:?}", err);
        assert!(text.starts_with("Bad GELF sink configuration: no Graylog host given\n"));
        // still debuggable after the fact
        assert!(text.len() > "Bad GELF sink configuration: no Graylog host given\n".len());
    }
}
