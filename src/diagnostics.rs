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

//! The sink's self-log.
//!
//! Logging must never take down the application doing the logging, so nothing that goes wrong
//! while shipping an event is returned to the caller. It's recorded here instead: counted by kind,
//! remembered (the most recent one), and re-emitted as a [`tracing`] event on [`TARGET`], which the
//! [`Layer`](crate::layer::Layer) itself ignores.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html

use crate::error::Error;

use parking_lot::Mutex;

use std::sync::atomic::{AtomicU64, Ordering};

/// The [`tracing`] target on which diagnostics are emitted
///
/// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
pub const TARGET: &str = "gelf_tracing::diagnostics";

/// A point-in-time copy of the diagnostic counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticCounts {
    /// Fields dropped because they wouldn't serialize, or because another field already took
    /// their name
    pub serialization: u64,
    /// Events dropped because they'd need too many chunks
    pub oversize: u64,
    /// Datagrams the socket refused
    pub transport: u64,
    /// Payloads sent uncompressed because compression failed
    pub compression: u64,
    pub other: u64,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    serialization: AtomicU64,
    oversize: AtomicU64,
    transport: AtomicU64,
    compression: AtomicU64,
    other: AtomicU64,
    last: Mutex<Option<String>>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    /// Note that `err` happened. Never fails & never panics.
    #[allow(unreachable_patterns)]
    pub fn record(&self, err: &Error) {
        let counter = match err {
            Error::Serialization { .. } | Error::DuplicateField { .. } => &self.serialization,
            Error::Oversize { .. } => &self.oversize,
            Error::Transport { .. } => &self.transport,
            Error::Compression { .. } => &self.compression,
            _ => &self.other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        let text = err.to_string();
        tracing::warn!(target: TARGET, kind = err.kind(), "{}", text);
        *self.last.lock() = Some(text);
    }

    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts {
            serialization: self.serialization.load(Ordering::Relaxed),
            oversize: self.oversize.load(Ordering::Relaxed),
            transport: self.transport.load(Ordering::Relaxed),
            compression: self.compression.load(Ordering::Relaxed),
            other: self.other.load(Ordering::Relaxed),
        }
    }

    /// The text of the most recent diagnostic, if any
    pub fn last(&self) -> Option<String> {
        self.last.lock().clone()
    }
}
