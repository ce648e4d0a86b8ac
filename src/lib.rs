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

//! A [`tracing-subscriber`] [`Layer`] implementation for sending [`tracing`] [`Event`]s to
//! [Graylog] as [GELF] messages over UDP
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/0.1.35/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//! [Graylog]: https://graylog.org
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//!
//! # Introduction
//!
//! [GELF] (the Graylog Extended Log Format) is a JSON encoding of structured log events. Each
//! event carries a handful of mandatory fields (`version`, `host`, `short_message`, `timestamp` &
//! `level`) plus any number of `_`-prefixed "additional fields". Graylog accepts GELF over UDP,
//! optionally gzip- or zlib-compressed; a message too large for one datagram is split into at most
//! 128 "chunks", each with a small header that lets the server put them back together.
//!
//! This crate provides the whole path from a [`tracing`] [`Event`] to those datagrams:
//!
//! ```text
//! Event --(TracingFormatter)--> LogEvent --(GelfFormatter)--> JSON
//!       --(Compression)--> bytes --(Chunker)--> datagrams --(Transport)--> Graylog
//! ```
//!
//! Sending is fire-and-forget. Nothing that goes wrong along the way is ever returned to (or
//! panics in) the application doing the logging; failures are counted & reported through the
//! sink's [`Diagnostics`](crate::diagnostics::Diagnostics) instead.
//!
//! # Usage
//!
//! [`gelf-tracing`](crate)'s [`Layer`] comes with sane defaults:
//!
//! ```rust
//! use tracing::info;
//! use gelf_tracing::layer::Layer;
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! // The default configuration is to send uncompressed GELF messages via UDP to port 12201 on
//! // the localhost.
//! let subscriber = Registry::default().with(Layer::try_default().unwrap());
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!(user = "bilbo", attempts = 3, "Hello, world!");
//! ```
//!
//! Will produce a GELF message that looks something like this:
//!
//! ```text
//! {"_attempts":3,"_user":"bilbo","host":"bree.local","level":6,
//!  "short_message":"Hello, world!","timestamp":1656025855.123,"version":"1.1"}
//! ```
//!
//! That said, the destination, facility, compression, chunk size & so forth are all
//! configurable:
//!
//! ```no_run
//! use tracing::info;
//! use gelf_tracing::{compress::Compression, config::GelfConfig, facility::Level, layer::Layer};
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! let config = GelfConfig::builder()
//!     .host("graylog.example.com")
//!     .facility("billing")
//!     .minimum_level(Level::LOG_INFO)
//!     .compression(Compression::Gzip)
//!     .with_tracing_spans(true)
//!     .build();
//! let subscriber = Registry::default().with(Layer::from_config(&config).unwrap());
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!("Hello, world!");
//! ```
//!
//! Will send gzip'd GELF messages to port 12201 on graylog.example.com.
//!
//! Applications that don't use [`tracing`] can build [`LogEvent`](crate::event::LogEvent)s
//! themselves & hand them straight to a [`GelfSink`](crate::sink::GelfSink).

pub mod _docs;
pub mod chunk;
pub mod compress;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod facility;
pub mod gelf;
pub mod layer;
pub mod sink;
pub mod tracing;
pub mod transport;
