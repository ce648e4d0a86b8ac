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

//! Payload compression.
//!
//! Graylog's UDP input sniffs the first bytes of each (reassembled) message: `1f 8b` is gzip,
//! `78 xx` is zlib and anything else is taken to be plain JSON. So there's nothing to negotiate;
//! the sender just picks one.

use crate::error::{new_backtrace, Error, Result};

use flate2::{
    write::{GzEncoder, ZlibEncoder},
    Compression as Level,
};
use serde::Deserialize;

use std::io::Write;

/// Which compression (if any) to apply to GELF payloads before chunking.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zlib,
}

fn io_err(err: std::io::Error) -> Error {
    Error::Compression {
        source: err,
        back: new_backtrace(),
    }
}

impl Compression {
    /// Compress `buf` at flate2's default level. Deterministic: the same input always produces the
    /// same output (gzip headers carry no timestamp or filename here).
    pub fn compress(&self, buf: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(buf.to_vec()),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::with_capacity(buf.len() / 2), Level::default());
                encoder.write_all(buf).map_err(io_err)?;
                encoder.finish().map_err(io_err)
            }
            Compression::Zlib => {
                let mut encoder =
                    ZlibEncoder::new(Vec::with_capacity(buf.len() / 2), Level::default());
                encoder.write_all(buf).map_err(io_err)?;
                encoder.finish().map_err(io_err)
            }
        }
    }
    pub fn is_enabled(&self) -> bool {
        *self != Compression::None
    }
}
