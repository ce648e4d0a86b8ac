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

//! The GELF sink.
//!
//! [`GelfSink`] takes a [`LogEvent`] the rest of the way to the network:
//!
//! ```text
//! LogEvent -> GelfFormatter -> JSON -> (Compression) -> Chunker -> Transport (x N)
//! ```
//!
//! It's also where errors stop. [`GelfSink::emit`] returns nothing; whatever goes wrong along the
//! way is handed to the sink's [`Diagnostics`] and the event (or the part of it that failed) is
//! dropped.

use crate::{
    chunk::{Chunker, Datagrams},
    compress::Compression,
    config::GelfConfig,
    diagnostics::Diagnostics,
    error::Result,
    event::LogEvent,
    facility::Level,
    gelf::GelfFormatter,
    transport::{send_datagrams, Transport, UdpTransport},
};

use std::{convert::TryFrom, sync::Arc};

pub struct GelfSink<T: Transport> {
    formatter: GelfFormatter,
    compression: Compression,
    chunker: Chunker,
    minimum_level: Level,
    transport: T,
    diagnostics: Arc<Diagnostics>,
}

impl GelfSink<UdpTransport> {
    /// Attempt to construct a [`GelfSink`] that will send uncompressed GELF messages via UDP to
    /// port 12201 on localhost
    pub fn try_default() -> Result<Self> {
        Ok(GelfSink::new(
            GelfFormatter::default(),
            Chunker::default(),
            UdpTransport::local()?,
        ))
    }
    /// Construct a [`GelfSink`] sending to the Graylog input named in `config`.
    pub fn from_config(config: &GelfConfig) -> Result<Self> {
        config.validate()?;
        let transport = UdpTransport::new((config.host.as_str(), config.port))?;
        GelfSink::with_config(config, transport)
    }
}

impl<T: Transport> GelfSink<T> {
    pub fn new(formatter: GelfFormatter, chunker: Chunker, transport: T) -> Self {
        GelfSink {
            formatter,
            compression: Compression::None,
            chunker,
            minimum_level: Level::LOG_DEBUG,
            transport,
            diagnostics: Arc::new(Diagnostics::new()),
        }
    }
    /// Configure everything but the destination from `config`; send via `transport`.
    pub fn with_config(config: &GelfConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(GelfSink::new(
            GelfFormatter::try_from(config)?,
            Chunker::new(config.max_chunk_size, config.message_id_strategy)?,
            transport,
        )
        .with_compression(config.compression)
        .with_minimum_level(config.minimum_level))
    }
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
    pub fn with_minimum_level(mut self, level: Level) -> Self {
        self.minimum_level = level;
        self
    }
    pub fn minimum_level(&self) -> Level {
        self.minimum_level
    }
    /// The self-log; it can be held onto after the sink has been handed to a subscriber.
    pub fn diagnostics(&self) -> Arc<Diagnostics> {
        self.diagnostics.clone()
    }
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Turn `event` into the datagrams that would carry it; `None` if it can't be sent at all.
    pub fn encode(&self, event: &LogEvent) -> Option<Datagrams> {
        let payload = self
            .formatter
            .format(event, |err| self.diagnostics.record(&err));
        let json = payload
            .to_bytes()
            .map_err(|err| self.diagnostics.record(&err))
            .ok()?;
        let body = if self.compression.is_enabled() {
            let compressed = self.compression.compress(&json);
            self.or_uncompressed(json, compressed)
        } else {
            json
        };
        self.chunker
            .chunk(body.into())
            .map_err(|err| self.diagnostics.record(&err))
            .ok()
    }

    /// Take the compressed payload if compression worked, else record the failure & fall back to
    /// the uncompressed `json`.
    fn or_uncompressed(&self, json: Vec<u8>, compressed: Result<Vec<u8>>) -> Vec<u8> {
        compressed.unwrap_or_else(|err| {
            self.diagnostics.record(&err);
            json
        })
    }

    /// Send `event` to Graylog, best-effort. Never fails & never blocks on the network.
    pub fn emit(&self, event: &LogEvent) {
        if !event.level().is_at_least(self.minimum_level) {
            return;
        }
        if let Some(datagrams) = self.encode(event) {
            send_datagrams(&self.transport, &datagrams, &self.diagnostics);
        }
    }
}
