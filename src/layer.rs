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

//! [gelf-tracing](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! A basic struct [`Layer`] is defined, with convenience constructors for the common case
//! ([`GelfTracingFormatter`] over UDP). Consumers of this crate are of course free to implement
//! the [`TracingFormatter`] and [`Transport`] traits for themselves & provide their own
//! implementations.

use crate::{
    chunk::Chunker,
    config::GelfConfig,
    diagnostics::{Diagnostics, TARGET},
    error::Result,
    gelf::GelfFormatter,
    sink::GelfSink,
    tracing::{GelfTracingFormatter, TracingFormatter},
    transport::{Transport, UdpTransport},
};

use tracing::Event;
use tracing_subscriber::layer::Context;

use std::sync::Arc;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that will send [`Event`]s to
/// Graylog as GELF messages.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
pub struct Layer<S, F: TracingFormatter<S>, T: Transport>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_formatter: F,
    sink: GelfSink<T>,
    // I need the Subscriber implementation type as a type parameter to transmit it to the
    // TracingFormatter trait. 👇 gets the compiler to shut-up about unused type parameters.
    subscriber_type: std::marker::PhantomData<S>,
}

/// A [`Layer`] implementation with the following characteristics:
///
/// - Uses [`GelfTracingFormatter`] for mapping from Tracing events to log events
/// - Sends the resulting GELF messages over UDP
///
/// May be used with any [`tracing_subscriber::Subscriber`] implementation that supports
/// [`LookupSpan`].
///
/// [`tracing_subscriber::Subscriber`]: https://docs.rs/tracing/latest/tracing/trait.Subscriber.html
/// [`LookupSpan`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/registry/trait.LookupSpan.html
impl<S> Layer<S, GelfTracingFormatter, UdpTransport>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// Attempt to construct a [`Layer`] that will send GELF messages via UDP to port 12201 on
    /// localhost
    pub fn try_default() -> Result<Self> {
        Ok(Layer::new(
            GelfTracingFormatter::default(),
            GelfSink::try_default()?,
        ))
    }
    /// Attempt to construct a [`Layer`] sending to the Graylog input described by `config`
    pub fn from_config(config: &GelfConfig) -> Result<Self> {
        Ok(Layer::new(
            GelfTracingFormatter::from(config),
            GelfSink::from_config(config)?,
        ))
    }
}

impl<S, F: TracingFormatter<S>, T: Transport> Layer<S, F, T>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// construct Layer with custom inners
    pub fn new(tracing_formatter: F, sink: GelfSink<T>) -> Self {
        Layer {
            tracing_formatter,
            sink,
            subscriber_type: std::marker::PhantomData,
        }
    }
    pub fn sink(&self) -> &GelfSink<T> {
        &self.sink
    }
    /// The sink's self-log; grab this before handing the [`Layer`] to a subscriber.
    pub fn diagnostics(&self) -> Arc<Diagnostics> {
        self.sink.diagnostics()
    }
}

/// Customize a [`Layer`] implementation with the following characteristics:
///
/// - Uses [`GelfTracingFormatter`] for mapping from Tracing events to log events
///
/// With a custom [`Transport`] implementation.  May be used with any
/// [`tracing_subscriber::Subscriber`] implementation that supports [`LookupSpan`].
///
/// [`tracing_subscriber::Subscriber`]: https://docs.rs/tracing/latest/tracing/trait.Subscriber.html
/// [`LookupSpan`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/registry/trait.LookupSpan.html
impl<S, T: Transport> Layer<S, GelfTracingFormatter, T>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// Construct a Layer that will send uncompressed GELF messages via transport `transport`
    pub fn with_transport(transport: T) -> Self {
        Layer::new(
            GelfTracingFormatter::default(),
            GelfSink::new(GelfFormatter::default(), Chunker::default(), transport),
        )
    }

    /// Construct a Layer configured by `config` that will send via transport `transport`
    /// (`config.host` & `config.port` are ignored)
    pub fn with_config_and_transport(config: &GelfConfig, transport: T) -> Result<Self> {
        Ok(Layer::new(
            GelfTracingFormatter::from(config),
            GelfSink::with_config(config, transport)?,
        ))
    }
}

/// This is the Big Tuna-- the [`Layer`] implementation.
///
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
impl<S, F, T> tracing_subscriber::layer::Layer<S> for Layer<S, F, T>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    F: TracingFormatter<S> + 'static,
    T: Transport + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        // Our own diagnostics are reported via `tracing`; shipping them would risk a feedback loop
        if event.metadata().target() == TARGET {
            return;
        }
        match self.tracing_formatter.on_event(event, ctx) {
            Ok(Some(log_event)) => self.sink.emit(&log_event),
            Ok(None) => (),
            Err(err) => self.sink.diagnostics().record(&err),
        }
    }
}

#[cfg(test)]
mod smoke {

    use super::*;

    use crate::{facility::Level, sink::test::MemoryTransport};

    use serde_json::json;
    use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

    fn config() -> crate::config::GelfConfigBuilder {
        GelfConfig::builder()
            .hostname("bree.local")
            .facility("smoke")
    }

    #[derive(Debug)]
    struct Inner;
    impl std::fmt::Display for Inner {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "disk on fire")
        }
    }
    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);
    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "couldn't save")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn info_with_fields() {
        let transport = MemoryTransport::default();
        let layer = Layer::new(
            GelfTracingFormatter::default().with_tracing_target(true),
            GelfSink::with_config(&config().build(), transport.clone()).unwrap(),
        );
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(answer = 42, name = "bilbo", ratio = 0.5, ok = true, "Hello, 世界!");
        });

        let messages = transport.messages();
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg["version"], json!("1.1"));
        assert_eq!(msg["host"], json!("bree.local"));
        assert_eq!(msg["short_message"], json!("Hello, 世界!"));
        assert_eq!(msg["level"], json!(6));
        assert_eq!(msg["_facility"], json!("smoke"));
        assert_eq!(msg["_answer"], json!(42));
        assert_eq!(msg["_name"], json!("bilbo"));
        assert_eq!(msg["_ratio"], json!(0.5));
        assert_eq!(msg["_ok"], json!(true));
        assert_eq!(msg["_target"], json!(module_path!()));
        assert!(msg.get("full_message").is_none());
        assert!(msg.get("_module").is_none());
    }

    #[test]
    fn minimum_level() {
        let transport = MemoryTransport::default();
        let layer = Layer::with_config_and_transport(
            &config().minimum_level(Level::LOG_WARNING).build(),
            transport.clone(),
        )
        .unwrap();
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::trace!("Hello, 世界!");
            tracing::debug!("Hello, 世界!");
            tracing::info!("Hello, 世界!");
            tracing::warn!("Hello, 世界!");
            tracing::error!("Hello, 世界!");
        });
        let levels: Vec<_> = transport
            .messages()
            .into_iter()
            .map(|m| m["level"].clone())
            .collect();
        assert_eq!(levels, vec![json!(4), json!(3)]);
    }

    #[test]
    fn exception_chain() {
        let transport = MemoryTransport::default();
        let layer = Layer::with_config_and_transport(&config().build(), transport.clone()).unwrap();
        let subscriber = Registry::default().with(layer);
        let err = Outer(Inner);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(error = &err as &(dyn std::error::Error + 'static), "save failed");
        });

        let messages = transport.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["short_message"], json!("save failed"));
        assert_eq!(
            messages[0]["full_message"],
            json!("save failed\ncouldn't save\ncaused by: disk on fire")
        );
        assert_eq!(
            messages[0]["_exception"],
            json!([{"message": "couldn't save"}, {"message": "disk on fire"}])
        );
    }

    #[test]
    fn spans_and_location() {
        let transport = MemoryTransport::default();
        let layer = Layer::with_config_and_transport(
            &config()
                .with_tracing_spans(true)
                .with_tracing_module(true)
                .with_tracing_source_location(true)
                .build(),
            transport.clone(),
        )
        .unwrap();
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            let outer = tracing::info_span!("request");
            let _guard = outer.enter();
            tracing::info_span!("handler").in_scope(|| tracing::info!("in the thick of it"));
        });

        let messages = transport.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["_spans"], json!(["request", "handler"]));
        assert_eq!(messages[0]["_module"], json!(module_path!()));
        assert_eq!(messages[0]["_file"], json!(file!()));
        assert!(messages[0]["_line"].is_u64());
    }

    #[test]
    fn diagnostics_are_not_shipped() {
        let transport = MemoryTransport::default();
        let layer = Layer::with_config_and_transport(
            &config().max_chunk_size(64).build(),
            transport.clone(),
        )
        .unwrap();
        let diagnostics = layer.diagnostics();
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "gelf_tracing::diagnostics", "not for Graylog");
            // 128 chunks of 52 bytes can't hold this, so the sink will complain (on the
            // diagnostics target)
            tracing::info!("{}", "x".repeat(128 * 52));
        });
        assert!(transport.sent.lock().is_empty());
        assert_eq!(diagnostics.counts().oversize, 1);
    }
}
