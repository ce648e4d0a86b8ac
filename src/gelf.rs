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

//! [GELF] 1.1 message formatting
//!
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//!
//! [`GelfFormatter`] turns a [`LogEvent`] into a [`GelfPayload`]: a JSON object with the five
//! mandatory GELF fields (`version`, `host`, `short_message`, `timestamp` & `level`), an optional
//! `full_message`, and one `_`-prefixed "additional field" per structured field on the event.

use crate::{
    error::{new_backtrace, Error, Result},
    event::{ExceptionInfo, LogEvent},
    facility::Facility,
};

use serde::Deserialize;
use serde_json::{Map, Value};

type StdResult<T, E> = std::result::Result<T, E>;

/// The GELF version this crate speaks
pub const GELF_VERSION: &str = "1.1";

/// The additional field carrying the facility
pub const FACILITY_FIELD: &str = "_facility";
/// The additional field carrying the message template, when it differs from the message
pub const TEMPLATE_FIELD: &str = "_message_template";
/// The additional field carrying an event's exception chain
pub const EXCEPTION_FIELD: &str = "_exception";

/// How to ship structured field values that aren't scalars.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NestedFields {
    /// Send objects & arrays as JSON sub-documents under a single `_name` key
    #[default]
    Inline,
    /// Flatten them into one key per leaf: `{"test": {"Bar": {"Id": 2}}}` becomes `_test_Bar_Id`,
    /// & array elements are keyed by index
    Flatten,
}

/// A complete GELF message, ready to be serialized.
///
/// Keys are kept sorted, so two events with the same content always serialize to the same bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct GelfPayload(Map<String, Value>);

impl GelfPayload {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.0).map_err(|err| Error::Serialization {
            field: String::from("<payload>"),
            source: err,
            back: new_backtrace(),
        })
    }
}

/// Attempt to figure-out a value for the GELF `host` field.
///
/// First try [gethostname()], then the local IP address, and finally settle for "localhost".
///
/// [gethostname()]: https://man7.org/linux/man-pages/man2/gethostname.2.html
pub fn default_host() -> String {
    hostname::get()
        .map_err(|err| Error::NoHostname {
            source: Box::new(err),
            back: new_backtrace(),
        })
        .and_then(|hn| match hn.into_string() {
            Ok(s) if !s.is_empty() => Ok(s),
            _ => Err(Error::BadConfig {
                reason: String::from("hostname is empty or not UTF-8"),
                back: new_backtrace(),
            }),
        })
        .or_else(|_| {
            local_ip_address::local_ip()
                .map(|ip| ip.to_string())
                .map_err(|err| Error::NoHostname {
                    source: Box::new(err),
                    back: new_backtrace(),
                })
        })
        .unwrap_or_else(|_| String::from("localhost"))
}

/// Map a structured field name to a legal GELF additional field name.
///
/// GELF requires additional field names to match `^[\w\.\-]*$` and forbids `_id` (Graylog uses it
/// internally).
fn additional_field_name(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 1);
    key.push('_');
    key.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
            c
        } else {
            '_'
        }
    }));
    if key == "_id" {
        key.push('_');
    }
    key
}

/// Truncate `msg` to at most `max` characters; never splits a character.
fn truncate(msg: &str, max: usize) -> &str {
    match msg.char_indices().nth(max) {
        Some((idx, _)) => &msg[..idx],
        None => msg,
    }
}

fn exception_to_json(chain: &[ExceptionInfo]) -> Value {
    Value::Array(
        chain
            .iter()
            .map(|link| {
                let mut obj = Map::new();
                if let Some(kind) = &link.kind {
                    obj.insert(String::from("type"), Value::String(kind.clone()));
                }
                obj.insert(String::from("message"), Value::String(link.message.clone()));
                Value::Object(obj)
            })
            .collect(),
    )
}

/// A formatter that produces [GELF] 1.1 messages.
///
/// [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
pub struct GelfFormatter {
    host: String,
    facility: Facility,
    short_message_max_length: Option<usize>,
    nested: NestedFields,
    with_message_template: bool,
}

impl std::default::Default for GelfFormatter {
    fn default() -> Self {
        GelfFormatter {
            host: default_host(),
            facility: Facility::default(),
            short_message_max_length: None,
            nested: NestedFields::default(),
            with_message_template: true,
        }
    }
}

pub struct GelfFormatterBuilder {
    imp: GelfFormatter,
}

impl GelfFormatterBuilder {
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.imp.host = host.into();
        self
    }
    pub fn facility<F: Into<Facility>>(mut self, facility: F) -> Self {
        self.imp.facility = facility.into();
        self
    }
    /// Cap `short_message` at `max` characters; zero means "don't truncate".
    pub fn short_message_max_length(mut self, max: usize) -> Self {
        self.imp.short_message_max_length = if max > 0 { Some(max) } else { None };
        self
    }
    pub fn nested_fields(mut self, nested: NestedFields) -> Self {
        self.imp.nested = nested;
        self
    }
    pub fn with_message_template(mut self, with_message_template: bool) -> Self {
        self.imp.with_message_template = with_message_template;
        self
    }
    pub fn build(self) -> GelfFormatter {
        self.imp
    }
}

impl GelfFormatter {
    pub fn builder() -> GelfFormatterBuilder {
        GelfFormatterBuilder {
            imp: GelfFormatter::default(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build the GELF message for `event`.
    ///
    /// This cannot fail as a whole: a field whose value won't serialize, or whose GELF name is
    /// already taken, is left out, and `on_error` is told about it.
    pub fn format(&self, event: &LogEvent, mut on_error: impl FnMut(Error)) -> GelfPayload {
        let mut map = Map::new();

        map.insert(String::from("version"), Value::from(GELF_VERSION));
        map.insert(String::from("host"), Value::from(self.host.as_str()));

        let message = event.message();
        let short = match self.short_message_max_length {
            Some(max) => truncate(message, max),
            None => message,
        };
        // Graylog rejects an empty `short_message`
        map.insert(
            String::from("short_message"),
            Value::from(if short.is_empty() { "-" } else { short }),
        );

        if short != message || !event.exception().is_empty() {
            let mut full = String::from(message);
            for (i, link) in event.exception().iter().enumerate() {
                full.push('\n');
                if i > 0 {
                    full.push_str("caused by: ");
                }
                full.push_str(&link.to_string());
            }
            map.insert(String::from("full_message"), Value::from(full));
        }

        map.insert(
            String::from("timestamp"),
            Value::from(event.timestamp().timestamp_millis() as f64 / 1000.0),
        );
        map.insert(String::from("level"), Value::from(event.level() as u8));

        // The builder's own additional fields go in first, so that a structured field with the
        // same name can't shadow them.
        if !self.facility.is_empty() {
            map.insert(
                String::from(FACILITY_FIELD),
                Value::from(self.facility.as_str()),
            );
        }
        if self.with_message_template && event.template() != message {
            map.insert(String::from(TEMPLATE_FIELD), Value::from(event.template()));
        }
        if !event.exception().is_empty() {
            self.insert_additional(
                &mut map,
                "exception",
                String::from(EXCEPTION_FIELD),
                exception_to_json(event.exception()),
                &mut on_error,
            );
        }

        for (name, value) in event.fields() {
            match value.to_json() {
                Ok(json) => self.insert_additional(
                    &mut map,
                    name,
                    additional_field_name(name),
                    json,
                    &mut on_error,
                ),
                Err(err) => on_error(Error::Serialization {
                    field: String::from(name),
                    source: err,
                    back: new_backtrace(),
                }),
            }
        }

        GelfPayload(map)
    }

    /// Insert `value` under `key` (flattening it first, if so configured). A key that's already
    /// taken keeps its value; the newcomer is reported to `on_error` on behalf of `field`.
    fn insert_additional(
        &self,
        map: &mut Map<String, Value>,
        field: &str,
        key: String,
        value: Value,
        on_error: &mut impl FnMut(Error),
    ) {
        match (self.nested, value) {
            (_, Value::Null) => (),
            (NestedFields::Flatten, Value::Object(obj)) => {
                for (k, v) in obj {
                    let sub = additional_field_name(&k);
                    self.insert_additional(map, field, format!("{}{}", key, sub), v, on_error);
                }
            }
            (NestedFields::Flatten, Value::Array(arr)) => {
                for (i, v) in arr.into_iter().enumerate() {
                    self.insert_additional(map, field, format!("{}_{}", key, i), v, on_error);
                }
            }
            (_, value) => {
                if map.contains_key(&key) {
                    on_error(Error::DuplicateField {
                        field: String::from(field),
                        key,
                        back: new_backtrace(),
                    });
                } else {
                    map.insert(key, value);
                }
            }
        }
    }
}

impl std::convert::TryFrom<&crate::config::GelfConfig> for GelfFormatter {
    type Error = Error;
    fn try_from(config: &crate::config::GelfConfig) -> StdResult<Self, Self::Error> {
        let mut builder = GelfFormatter::builder()
            .facility(config.facility.clone())
            .short_message_max_length(config.short_message_max_length)
            .nested_fields(config.nested_fields)
            .with_message_template(config.with_message_template);
        if let Some(host) = &config.hostname {
            if host.is_empty() {
                return Err(Error::BadConfig {
                    reason: String::from("hostname override is empty"),
                    back: new_backtrace(),
                });
            }
            builder = builder.host(host.clone());
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::facility::Level;

    use chrono::prelude::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Refuses;

    impl serde::Serialize for Refuses {
        fn serialize<S: serde::Serializer>(&self, _s: S) -> StdResult<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to serialize"))
        }
    }

    #[derive(Debug, serde::Serialize)]
    #[allow(non_snake_case)]
    struct Bar {
        Id: u32,
        Prop: &'static str,
        TestBarBooleanProperty: bool,
    }

    fn builder() -> GelfFormatterBuilder {
        GelfFormatter::builder().host("bree.local")
    }

    fn epoch_event(msg: &str) -> crate::event::LogEventBuilder {
        LogEvent::builder(Level::LOG_INFO, msg).timestamp(std::time::UNIX_EPOCH.into())
    }

    #[test]
    fn test_mandatory_fields() {
        let payload = builder().build().format(
            &epoch_event("Hello, world!")
                .timestamp(Utc.timestamp_millis_opt(1_500_000_000_123).unwrap())
                .build(),
            |err| panic!("{}", err),
        );
        assert_eq!(
            payload.into_value(),
            json!({
                "version": "1.1",
                "host": "bree.local",
                "short_message": "Hello, world!",
                "timestamp": 1_500_000_000.123,
                "level": 6
            })
        );
    }

    #[test]
    fn test_short_message_truncation() {
        let f = builder().short_message_max_length(5).build();
        let payload = f.format(&epoch_event("Hello, 世界!").build(), |_| ());
        assert_eq!(payload.get("short_message"), Some(&json!("Hello")));
        assert_eq!(payload.get("full_message"), Some(&json!("Hello, 世界!")));

        let f = builder().short_message_max_length(8).build();
        let payload = f.format(&epoch_event("Hello, 世界!").build(), |_| ());
        assert_eq!(payload.get("short_message"), Some(&json!("Hello, 世")));

        // zero means "no cap"
        let f = builder().short_message_max_length(0).build();
        let payload = f.format(&epoch_event("Hello, 世界!").build(), |_| ());
        assert_eq!(payload.get("short_message"), Some(&json!("Hello, 世界!")));
        assert!(payload.get("full_message").is_none());
    }

    #[test]
    fn test_exception() {
        let event = epoch_event("test exception with object")
            .exception(vec![
                ExceptionInfo::new(Some("NotImplemented"), "Nested Exception"),
                ExceptionInfo::new(Some("InvalidOperation"), "Level One exception"),
            ])
            .build();
        let payload = builder().build().format(&event, |_| ());
        assert_eq!(
            payload.get("short_message"),
            Some(&json!("test exception with object"))
        );
        assert_eq!(
            payload.get("full_message"),
            Some(&json!(
                "test exception with object\nNotImplemented: Nested Exception\ncaused by: InvalidOperation: Level One exception"
            ))
        );
        assert_eq!(
            payload.get("_exception"),
            Some(&json!([
                {"type": "NotImplemented", "message": "Nested Exception"},
                {"type": "InvalidOperation", "message": "Level One exception"}
            ]))
        );
    }

    #[test]
    fn test_additional_fields() {
        let event = epoch_event("SomeComplexTestEntry")
            .template("SomeComplexTestEntry {@test}")
            .field("id", 1)
            .field("user name", "sp1ff")
            .field("facility", "should not win")
            .field("nothing", Option::<u8>::None)
            .field(
                "bar",
                Bar {
                    Id: 2,
                    Prop: "123",
                    TestBarBooleanProperty: false,
                },
            )
            .build();
        let mut dropped = Vec::new();
        let payload = builder()
            .facility("VolkovTestFacility")
            .build()
            .format(&event, |err| dropped.push(err.to_string()));
        assert_eq!(dropped.len(), 1);
        assert!(dropped[0].contains("'facility'"), "{}", dropped[0]);
        assert_eq!(payload.get("_id"), None);
        assert_eq!(payload.get("_id_"), Some(&json!(1)));
        assert_eq!(payload.get("_user_name"), Some(&json!("sp1ff")));
        assert_eq!(payload.get("_facility"), Some(&json!("VolkovTestFacility")));
        assert_eq!(payload.get("_nothing"), None);
        assert_eq!(
            payload.get("_message_template"),
            Some(&json!("SomeComplexTestEntry {@test}"))
        );
        assert_eq!(
            payload.get("_bar"),
            Some(&json!({"Id": 2, "Prop": "123", "TestBarBooleanProperty": false}))
        );
        // the template was the only difference, so no full_message
        assert!(payload.get("full_message").is_none());

        let payload = builder()
            .with_message_template(false)
            .nested_fields(NestedFields::Flatten)
            .build()
            .format(&event, |_| ());
        assert_eq!(payload.get("_message_template"), None);
        assert_eq!(payload.get("_bar"), None);
        assert_eq!(payload.get("_bar_Id"), Some(&json!(2)));
        assert_eq!(payload.get("_bar_Prop"), Some(&json!("123")));
        assert_eq!(payload.get("_bar_TestBarBooleanProperty"), Some(&json!(false)));
    }

    #[test]
    fn test_flatten_arrays() {
        let event = epoch_event("arrays")
            .field("tags", vec!["a", "b"])
            .field("matrix", vec![vec![1, 2], vec![3]])
            .build();
        let payload = builder()
            .nested_fields(NestedFields::Flatten)
            .build()
            .format(&event, |_| ());
        assert_eq!(payload.get("_tags_0"), Some(&json!("a")));
        assert_eq!(payload.get("_tags_1"), Some(&json!("b")));
        assert_eq!(payload.get("_matrix_0_1"), Some(&json!(2)));
        assert_eq!(payload.get("_matrix_1_0"), Some(&json!(3)));
    }

    #[test]
    fn test_failing_field_is_omitted() {
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), "tuple keys aren't JSON object keys");
        let event = epoch_event("still sent")
            .field("bad", Refuses)
            .field("worse", map)
            .field("good", true)
            .build();
        let mut failed = Vec::new();
        let payload = builder().build().format(&event, |err| {
            assert_eq!(err.kind(), "serialization");
            failed.push(format!("{}", err));
        });
        assert_eq!(failed.len(), 2);
        assert!(failed[0].contains("'bad'"));
        assert!(failed[1].contains("'worse'"));
        assert_eq!(payload.get("_bad"), None);
        assert_eq!(payload.get("_worse"), None);
        assert_eq!(payload.get("_good"), Some(&json!(true)));
        assert_eq!(payload.get("short_message"), Some(&json!("still sent")));
    }

    #[test]
    fn test_colliding_names_are_reported() {
        let event = epoch_event("collisions")
            .field("id", 1)
            .field("id_", 2)
            .field("user name", "sp1ff")
            .field("user_name", "mike")
            .build();
        let mut dropped = Vec::new();
        let payload = builder().build().format(&event, |err| {
            assert_eq!(err.kind(), "serialization");
            dropped.push(err.to_string());
        });
        assert_eq!(dropped.len(), 2);
        assert!(dropped.iter().any(|d| d.contains("'_id_'")));
        assert!(dropped.iter().any(|d| d.contains("'_user_name'")));
        assert!(payload.get("_id_").is_some());
        assert!(payload.get("_user_name").is_some());

        // flattening can collide, too
        let event = epoch_event("flattened")
            .field("a", json!({"b": 1}))
            .field("a_b", 2)
            .build();
        let mut dropped = 0;
        builder()
            .nested_fields(NestedFields::Flatten)
            .build()
            .format(&event, |_| dropped += 1);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_deterministic_bytes() {
        let f = builder().build();
        let a = f.format(&epoch_event("same").field("b", 1).field("a", 2).build(), |_| ());
        let b = f.format(&epoch_event("same").field("a", 2).field("b", 1).build(), |_| ());
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
        let text = String::from_utf8(a.to_bytes().unwrap()).unwrap();
        assert!(text.starts_with("{\"_a\":2,\"_b\":1,"), "{}", text);
    }

    #[test]
    fn test_empty_message() {
        let payload = builder().build().format(&epoch_event("").build(), |_| ());
        assert_eq!(payload.get("short_message"), Some(&json!("-")));
        assert!(payload.get("full_message").is_none());
    }
}
