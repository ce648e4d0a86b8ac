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

//! Primitives for mapping [`tracing`] entities to GELF log events.
//!
//! [`TracingFormatter`] implementations turn [`Event`]s into [`LogEvent`]s. This module provides
//! a single implementation, [`GelfTracingFormatter`], that carries the "message" field over as the
//! GELF message & every other field as a structured field.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html

use crate::{
    config::GelfConfig,
    error::Result,
    event::{ExceptionInfo, FieldValue, LogEvent},
    facility::Level,
};

use std::sync::Arc;

#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

/// Map [`tracing`] [`Event`]s to [`LogEvent`]s.
///
/// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// The translation from [`tracing`] events to GELF datagrams occurs in three parts:
///
/// 1. mapping the Event to a [`LogEvent`] (level, message & structured fields)
///
/// 2. building a GELF payload from that event (see [`GelfFormatter`])
///
/// 3. compressing, chunking & transporting that payload to Graylog (see [`GelfSink`])
///
/// Trait [`TracingFormatter`] formally defines step 1: implementations say, firstly, whether
/// this event shall produce a GELF message at all, and if so, what goes into it.
///
/// [`GelfFormatter`]: crate::gelf::GelfFormatter
/// [`GelfSink`]: crate::sink::GelfSink
pub trait TracingFormatter<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// An event has occurred
    fn on_event(
        &self,
        event: &tracing::Event,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> Result<Option<LogEvent>>;
}

fn default_level_mapping(level: &tracing::Level) -> Level {
    Level::from_tracing(level)
}

/// A [`TracingFormatter`] that takes an [`Event`]s "message" field as the log message & every
/// other field as a structured field. Optionally adds the event's target, module, source location
/// & enclosing spans.
///
/// An event recorded with an [`Error`](std::error::Error) value (`error = &err as &dyn Error`)
/// gets that error's cause chain as its exception.
///
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
pub struct GelfTracingFormatter {
    map_level: Box<dyn Fn(&tracing::Level) -> Level + Send + Sync>,
    include_target: bool,
    include_module: bool,
    include_source_location: bool,
    include_spans: bool,
}

impl std::default::Default for GelfTracingFormatter {
    fn default() -> Self {
        GelfTracingFormatter {
            map_level: Box::new(default_level_mapping),
            include_target: false,
            include_module: false,
            include_source_location: false,
            include_spans: false,
        }
    }
}

impl std::convert::From<&GelfConfig> for GelfTracingFormatter {
    fn from(config: &GelfConfig) -> Self {
        GelfTracingFormatter::default()
            .with_tracing_target(config.include_target)
            .with_tracing_module(config.include_module)
            .with_tracing_source_location(config.include_source_location)
            .with_tracing_spans(config.include_spans)
    }
}

impl GelfTracingFormatter {
    /// Replace the default mapping from [`tracing::Level`] to GELF level.
    pub fn with_level_mapping<F>(mut self, map_level: F) -> Self
    where
        F: Fn(&tracing::Level) -> Level + Send + Sync + 'static,
    {
        self.map_level = Box::new(map_level);
        self
    }
    /// Send the event's target as `_target`
    pub fn with_tracing_target(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }
    /// Send the event's module path as `_module`
    pub fn with_tracing_module(mut self, include: bool) -> Self {
        self.include_module = include;
        self
    }
    /// Send the event's file & line as `_file` & `_line`
    pub fn with_tracing_source_location(mut self, include: bool) -> Self {
        self.include_source_location = include;
        self
    }
    /// Send the names of the enclosing spans, root first, as `_spans`
    pub fn with_tracing_spans(mut self, include: bool) -> Self {
        self.include_spans = include;
        self
    }
}

#[derive(Default)]
struct GelfEventVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, Arc<dyn FieldValue>)>,
    exception: Vec<ExceptionInfo>,
}

impl GelfEventVisitor {
    fn push<V: FieldValue + 'static>(&mut self, field: &tracing::field::Field, value: V) {
        // tracing-log smuggles the `log` record's metadata in as fields; we get it from
        // `normalized_metadata()` instead
        if cfg!(feature = "tracing-log") && field.name().starts_with("log.") {
            return;
        }
        let value: Arc<dyn FieldValue> = Arc::new(value);
        self.fields.push((field.name(), value));
    }
}

impl tracing::field::Visit for GelfEventVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(String::from(value));
        } else {
            self.push(field, String::from(value));
        }
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.push(field, value);
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.push(field, value);
    }
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.push(field, value);
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.push(field, value);
    }
    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        if self.exception.is_empty() {
            self.exception = ExceptionInfo::chain(value, None);
        } else {
            self.push(field, value.to_string());
        }
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            // The tracing macros `info!()`, `event!()` & the like all take care to "pre-format"
            // the `message` field so that `value` actually refers to a `std::fmt::Arguments`
            // instance, which will print to a debug format without enclosing double-quotes.
            self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, format!("{:?}", value));
        }
    }
}

impl<S> TracingFormatter<S> for GelfTracingFormatter
where
    S: tracing_core::subscriber::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(
        &self,
        event: &tracing::Event,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> Result<Option<LogEvent>> {
        // Use the `log` record's metadata for events that came in through tracing-log; for native
        // tracing events, normalized_metadata() returns None.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let mut visitor = GelfEventVisitor::default();
        event.record(&mut visitor);

        // No "message" field at all; the event's name (e.g. "event src/main.rs:12") is better
        // than nothing.
        let message = visitor
            .message
            .unwrap_or_else(|| String::from(meta.name()));

        let mut builder = LogEvent::builder((*self.map_level)(meta.level()), message)
            .exception(visitor.exception);

        if self.include_target {
            builder = builder.field("target", String::from(meta.target()));
        }
        if self.include_module {
            if let Some(module) = meta.module_path() {
                builder = builder.field("module", String::from(module));
            }
        }
        if self.include_source_location {
            if let Some(file) = meta.file() {
                builder = builder.field("file", String::from(file));
            }
            if let Some(line) = meta.line() {
                builder = builder.field("line", line);
            }
        }
        if self.include_spans {
            if let Some(scope) = ctx.event_scope(event) {
                let spans: Vec<&'static str> = scope.from_root().map(|span| span.name()).collect();
                if !spans.is_empty() {
                    builder = builder.field("spans", spans);
                }
            }
        }

        // The event's own fields win over the metadata above
        for (name, value) in visitor.fields {
            builder = builder.field_arc(name, value);
        }

        Ok(Some(builder.build()))
    }
}
