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

//! Sink configuration.
//!
//! [`GelfConfig`] gathers every knob in one place. It derives [`serde::Deserialize`] (with
//! kebab-case keys & a default for everything), so it can be read from whatever configuration
//! format the application already uses:
//!
//! ```rust
//! use gelf_tracing::config::GelfConfig;
//! let config: GelfConfig = serde_json::from_str(r#"{
//!     "host": "logs.example.com",
//!     "facility": "billing",
//!     "minimum-level": "info",
//!     "short-message-max-length": 50,
//!     "message-id-strategy": "content-hash"
//! }"#).unwrap();
//! assert_eq!(config.port, 12201);
//! ```
//!
//! or built in code with [`GelfConfig::builder`].

use crate::{
    chunk::{check_chunk_size, MessageIdStrategy, DEFAULT_MAX_CHUNK_SIZE},
    compress::Compression,
    error::{new_backtrace, Error, Result},
    facility::{Facility, Level},
    gelf::NestedFields,
    transport::DEFAULT_PORT,
};

use serde::Deserialize;

/// How GELF messages reach Graylog. Only UDP is supported.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    #[default]
    Udp,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct GelfConfig {
    /// Graylog host name or address
    pub host: String,
    pub port: u16,
    pub transport: TransportKind,
    pub facility: Facility,
    /// Events less severe than this aren't sent
    pub minimum_level: Level,
    /// Zero means "don't truncate"
    pub short_message_max_length: usize,
    pub message_id_strategy: MessageIdStrategy,
    pub compression: Compression,
    /// Largest datagram to send, chunk header included
    pub max_chunk_size: usize,
    pub nested_fields: NestedFields,
    /// Overrides the `host` field of outgoing messages (which defaults to this machine's name)
    pub hostname: Option<String>,
    pub with_message_template: bool,
    /// Send the [`tracing`] target as `_target`
    ///
    /// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
    pub include_target: bool,
    /// Send the module path as `_module`
    pub include_module: bool,
    /// Send the file & line as `_file` & `_line`
    pub include_source_location: bool,
    /// Send the names of the enclosing spans as `_spans`
    pub include_spans: bool,
}

impl std::default::Default for GelfConfig {
    fn default() -> Self {
        GelfConfig {
            host: String::from("localhost"),
            port: DEFAULT_PORT,
            transport: TransportKind::default(),
            facility: Facility::default(),
            minimum_level: Level::LOG_DEBUG,
            short_message_max_length: 0,
            message_id_strategy: MessageIdStrategy::default(),
            compression: Compression::default(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            nested_fields: NestedFields::default(),
            hostname: None,
            with_message_template: true,
            include_target: false,
            include_module: false,
            include_source_location: false,
            include_spans: false,
        }
    }
}

impl GelfConfig {
    pub fn builder() -> GelfConfigBuilder {
        GelfConfigBuilder {
            imp: GelfConfig::default(),
        }
    }
    /// Check the settings that can be wrong independently of the network.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::BadConfig {
                reason: String::from("no Graylog host given"),
                back: new_backtrace(),
            });
        }
        if self.port == 0 {
            return Err(Error::BadConfig {
                reason: String::from("port 0 is not a valid destination"),
                back: new_backtrace(),
            });
        }
        check_chunk_size(self.max_chunk_size)?;
        Ok(())
    }
}

pub struct GelfConfigBuilder {
    imp: GelfConfig,
}

impl GelfConfigBuilder {
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.imp.host = host.into();
        self
    }
    pub fn port(mut self, port: u16) -> Self {
        self.imp.port = port;
        self
    }
    pub fn facility<F: Into<Facility>>(mut self, facility: F) -> Self {
        self.imp.facility = facility.into();
        self
    }
    pub fn minimum_level(mut self, level: Level) -> Self {
        self.imp.minimum_level = level;
        self
    }
    pub fn short_message_max_length(mut self, max: usize) -> Self {
        self.imp.short_message_max_length = max;
        self
    }
    pub fn message_id_strategy(mut self, strategy: MessageIdStrategy) -> Self {
        self.imp.message_id_strategy = strategy;
        self
    }
    pub fn compression(mut self, compression: Compression) -> Self {
        self.imp.compression = compression;
        self
    }
    pub fn max_chunk_size(mut self, max: usize) -> Self {
        self.imp.max_chunk_size = max;
        self
    }
    pub fn nested_fields(mut self, nested: NestedFields) -> Self {
        self.imp.nested_fields = nested;
        self
    }
    pub fn hostname<S: Into<String>>(mut self, hostname: S) -> Self {
        self.imp.hostname = Some(hostname.into());
        self
    }
    pub fn with_message_template(mut self, with_message_template: bool) -> Self {
        self.imp.with_message_template = with_message_template;
        self
    }
    pub fn with_tracing_target(mut self, include: bool) -> Self {
        self.imp.include_target = include;
        self
    }
    pub fn with_tracing_module(mut self, include: bool) -> Self {
        self.imp.include_module = include;
        self
    }
    pub fn with_tracing_source_location(mut self, include: bool) -> Self {
        self.imp.include_source_location = include;
        self
    }
    pub fn with_tracing_spans(mut self, include: bool) -> Self {
        self.imp.include_spans = include;
        self
    }
    pub fn build(self) -> GelfConfig {
        self.imp
    }
}
