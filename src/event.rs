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

//! Captured log events.
//!
//! A [`LogEvent`] is what the front-end (the [`tracing`](crate::tracing) bridge, or application
//! code calling [`GelfSink::emit`](crate::sink::GelfSink::emit) directly) hands to the sink. It is
//! immutable once built & cheap to clone.
//!
//! Field values are kept in their native form behind [`FieldValue`] and only turned into JSON by
//! the [`GelfFormatter`](crate::gelf::GelfFormatter). That's where a value that refuses to serialize
//! gets caught & dropped, without taking the rest of the event with it.

use crate::facility::Level;

use chrono::prelude::*;

use std::{collections::BTreeMap, sync::Arc};

/// Anything that can be rendered as a JSON value.
///
/// There's a blanket implementation for every [`serde::Serialize`] type, so applications can hand
/// their own structs to [`LogEventBuilder::field`] and have them shipped as GELF sub-documents.
pub trait FieldValue: std::fmt::Debug + Send + Sync {
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
}

impl<T> FieldValue for T
where
    T: serde::Serialize + std::fmt::Debug + Send + Sync,
{
    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// One link in an error's cause chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// The error's type, when known
    pub kind: Option<String>,
    pub message: String,
}

impl ExceptionInfo {
    pub fn new<S: Into<String>>(kind: Option<&str>, message: S) -> ExceptionInfo {
        ExceptionInfo {
            kind: kind.map(String::from),
            message: message.into(),
        }
    }
    /// Walk `err` & its `source()`s, outermost first.
    ///
    /// `dyn Error` won't tell us its concrete type, so only the outermost link gets a `kind`, and
    /// only if the caller supplies one.
    pub fn chain(err: &(dyn std::error::Error + 'static), kind: Option<&str>) -> Vec<ExceptionInfo> {
        let mut chain = vec![ExceptionInfo::new(kind, err.to_string())];
        let mut next = err.source();
        while let Some(cause) = next {
            chain.push(ExceptionInfo::new(None, cause.to_string()));
            next = cause.source();
        }
        chain
    }
}

impl std::fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Some(kind) => write!(f, "{}: {}", kind, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A structured log event.
#[derive(Clone, Debug)]
pub struct LogEvent {
    timestamp: DateTime<Utc>,
    level: Level,
    template: String,
    message: String,
    fields: BTreeMap<String, Arc<dyn FieldValue>>,
    exception: Vec<ExceptionInfo>,
}

impl LogEvent {
    /// Start building an event at `level` whose rendered message is `message`. The timestamp
    /// defaults to now & the template to the rendered message.
    pub fn builder<S: Into<String>>(level: Level, message: S) -> LogEventBuilder {
        let message = message.into();
        LogEventBuilder {
            imp: LogEvent {
                timestamp: Utc::now(),
                level,
                template: message.clone(),
                message,
                fields: BTreeMap::new(),
                exception: Vec::new(),
            },
        }
    }
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
    pub fn level(&self) -> Level {
        self.level
    }
    pub fn template(&self) -> &str {
        &self.template
    }
    pub fn message(&self) -> &str {
        &self.message
    }
    /// Fields, in key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &dyn FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
    /// The exception chain, outermost first; empty if there was no exception.
    pub fn exception(&self) -> &[ExceptionInfo] {
        &self.exception
    }
}

pub struct LogEventBuilder {
    imp: LogEvent,
}

impl LogEventBuilder {
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.imp.timestamp = timestamp;
        self
    }
    pub fn template<S: Into<String>>(mut self, template: S) -> Self {
        self.imp.template = template.into();
        self
    }
    /// Add a field; a later field with the same name replaces an earlier one.
    pub fn field<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: FieldValue + 'static,
    {
        self.imp.fields.insert(name.into(), Arc::new(value));
        self
    }
    pub fn field_arc<K: Into<String>>(mut self, name: K, value: Arc<dyn FieldValue>) -> Self {
        self.imp.fields.insert(name.into(), value);
        self
    }
    pub fn exception(mut self, chain: Vec<ExceptionInfo>) -> Self {
        self.imp.exception = chain;
        self
    }
    /// Record `err` (and its causes) as this event's exception.
    pub fn error(self, err: &(dyn std::error::Error + 'static)) -> Self {
        self.exception(ExceptionInfo::chain(err, None))
    }
    pub fn build(self) -> LogEvent {
        self.imp
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[derive(Debug)]
    struct Outer(Inner);
    #[derive(Debug)]
    struct Inner;

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Nested Exception")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }
    impl std::fmt::Display for Inner {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Level One exception")
        }
    }
    impl std::error::Error for Inner {}

    #[test]
    fn exception_chain_is_outer_to_inner() {
        let chain = ExceptionInfo::chain(&Outer(Inner), Some("NotImplemented"));
        assert_eq!(
            chain,
            vec![
                ExceptionInfo::new(Some("NotImplemented"), "Nested Exception"),
                ExceptionInfo::new(None, "Level One exception"),
            ]
        );
        assert_eq!(chain[0].to_string(), "NotImplemented: Nested Exception");
    }

    #[test]
    fn builder_defaults() {
        let event = LogEvent::builder(Level::LOG_INFO, "Hello, world!")
            .field("b", 2)
            .field("a", "one")
            .field("b", 3)
            .build();
        assert_eq!(event.template(), "Hello, world!");
        assert!(event.exception().is_empty());
        let names: Vec<&str> = event.fields().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
        let b = event.fields().find(|(k, _)| *k == "b").unwrap().1;
        assert_eq!(b.to_json().unwrap(), serde_json::json!(3));
    }
}
