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

//! # General gelf-tracing Documentation
//!
//! ## Introduction
//!
//! General (i.e. not documenting a particular struct or a method) documentation goes here.
//!
//! ## From tracing Events to GELF Datagrams
//!
//! The translation from tracing [Event]s to datagrams on the wire happens in four steps:
//!
//! [Event]: tracing::Event
//!
//! 1. mapping the [Event] to a [LogEvent]: level, message, structured fields & (optionally) an
//!    exception chain
//! 2. building a GELF JSON payload from that [LogEvent]
//! 3. compressing the payload (optional) & splitting it into chunks if it's too big for one
//!    datagram
//! 4. sending each datagram to Graylog
//!
//! [LogEvent]: crate::event::LogEvent
//!
//! ### Mapping a Tracing Event
//!
//! Trait [TracingFormatter] defines the process of converting tracing [Event]s to [LogEvent]s.
//! [GelfTracingFormatter] takes the "message" field as the message, maps the tracing level to a
//! syslog severity (which is what GELF uses), and carries every other field over as a structured
//! field. A field recorded as a `&dyn Error` becomes the event's exception. It can optionally add
//! the event's target, module path, source location & enclosing span names.
//!
//! [TracingFormatter]: crate::tracing::TracingFormatter
//! [GelfTracingFormatter]: crate::tracing::GelfTracingFormatter
//!
//! ### From LogEvent to GELF Payload
//!
//! [GelfFormatter] produces the JSON object. Structured fields become `_`-prefixed additional
//! fields; names GELF won't accept are fixed up (`id` becomes `_id_`, anything outside
//! `[A-Za-z0-9_.-]` becomes `_`). Nested values are sent as JSON sub-documents or flattened into
//! one field per leaf, per [NestedFields]. A field whose value won't serialize is left out; the
//! rest of the event is still sent.
//!
//! [GelfFormatter]: crate::gelf::GelfFormatter
//! [NestedFields]: crate::gelf::NestedFields
//!
//! ### Compression & Chunking
//!
//! The payload may be gzip'd or zlib'd ([Compression]). If the result (plus the twelve-byte chunk
//! header) won't fit in `max_chunk_size` bytes, the [Chunker] splits it into chunks sharing an
//! eight-byte message id. GELF allows at most 128 chunks; a message that would need more is
//! dropped (and counted in the diagnostics). Message ids come from the clock & a counter, or from
//! a hash of the payload ([MessageIdStrategy]).
//!
//! [Compression]: crate::compress::Compression
//! [Chunker]: crate::chunk::Chunker
//! [MessageIdStrategy]: crate::chunk::MessageIdStrategy
//!
//! ### Sending the Datagrams
//!
//! Finally, each datagram is handed to a [Transport]. Only [UdpTransport] is provided; there are
//! no acknowledgements, retries or ordering guarantees. A datagram that fails to send doesn't stop
//! its siblings.
//!
//! [Transport]: crate::transport::Transport
//! [UdpTransport]: crate::transport::UdpTransport
//!
//! ## How This Process Plugs-In to the Tracing Framework
//!
//! This process connects to the tracing framework through the [Layer] type. [Layer] is
//! parameterized by the tracing formatter & the transport:
//!
//! [Layer]: crate::layer::Layer
//!
//! ```ignore
//! pub struct Layer<S, F: TracingFormatter<S>, T: Transport> where
//!    S: Subscriber + for<'a> LookupSpan<'a>,
//! ```
//!
//! Steps 2 through 4 live in [GelfSink], which the [Layer] owns. [GelfSink::emit] is also where
//! errors stop: it returns nothing, and hands whatever went wrong to the sink's [Diagnostics],
//! which counts it & re-emits it as a `tracing` warning on target `gelf_tracing::diagnostics`.
//! The [Layer] ignores events on that target.
//!
//! [GelfSink]: crate::sink::GelfSink
//! [GelfSink::emit]: crate::sink::GelfSink::emit
//! [Diagnostics]: crate::diagnostics::Diagnostics
