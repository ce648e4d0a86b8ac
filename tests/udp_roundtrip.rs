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

//! Send GELF messages over a real UDP socket on the loopback interface & put them back together.

use gelf_tracing::{
    chunk::{Chunk, MessageIdStrategy, Reassembler},
    compress::Compression,
    config::GelfConfig,
    diagnostics::DiagnosticCounts,
    event::LogEvent,
    facility::Level,
    layer::Layer,
    sink::GelfSink,
};

use flate2::read::ZlibDecoder;
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

use std::{io::Read, net::UdpSocket, time::Duration};

fn graylog() -> UdpSocket {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    server
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    server
}

fn config(server: &UdpSocket) -> gelf_tracing::config::GelfConfigBuilder {
    GelfConfig::builder()
        .host("127.0.0.1")
        .port(server.local_addr().unwrap().port())
        .hostname("bree.local")
        .facility("VolkovTestFacility")
}

/// Read datagrams until one complete message has been reassembled; return it & the number of
/// datagrams it took.
fn receive(server: &UdpSocket) -> (Vec<u8>, usize) {
    let mut reassembler = Reassembler::new();
    let mut buf = vec![0u8; 65536];
    let mut count = 0;
    loop {
        let n = server.recv(&mut buf).unwrap();
        count += 1;
        if let Some(msg) = reassembler.push(&buf[..n]) {
            return (msg, count);
        }
    }
}

#[test]
fn chunked_message_through_the_layer() {
    let server = graylog();
    let layer = Layer::from_config(&config(&server).max_chunk_size(1024).build()).unwrap();
    let diagnostics = layer.diagnostics();
    let subscriber = Registry::default().with(layer);

    let profile = "BattleProfile ".repeat(300);
    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!(profile = profile.as_str(), id = 7, "battle report");
    });

    let (msg, count) = receive(&server);
    assert!(count > 1);
    let msg: Value = serde_json::from_slice(&msg).unwrap();
    assert_eq!(msg["version"], json!("1.1"));
    assert_eq!(msg["host"], json!("bree.local"));
    assert_eq!(msg["short_message"], json!("battle report"));
    assert_eq!(msg["level"], json!(4));
    assert_eq!(msg["_facility"], json!("VolkovTestFacility"));
    assert_eq!(msg["_profile"], json!(profile));
    assert_eq!(msg["_id_"], json!(7));
    assert!(msg.get("_id").is_none());
    assert_eq!(diagnostics.counts(), DiagnosticCounts::default());
}

#[test]
fn compressed_message() {
    let server = graylog();
    let sink = GelfSink::from_config(&config(&server).compression(Compression::Zlib).build())
        .unwrap();
    sink.emit(
        &LogEvent::builder(Level::LOG_ERR, "SomeComplexTestEntry")
            .field("test", json!({"Bar": {"Id": 2, "Prop": "123"}, "TestPropertyOne": 1}))
            .build(),
    );

    let mut buf = vec![0u8; 65536];
    let n = server.recv(&mut buf).unwrap();
    let mut text = String::new();
    ZlibDecoder::new(&buf[..n]).read_to_string(&mut text).unwrap();
    let msg: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(msg["level"], json!(3));
    assert_eq!(msg["_test"]["Bar"]["Id"], json!(2));
    assert_eq!(msg["_test"]["TestPropertyOne"], json!(1));
}

#[test]
fn content_hash_ids_on_the_wire() {
    let server = graylog();
    let sink = GelfSink::from_config(
        &config(&server)
            .max_chunk_size(512)
            .message_id_strategy(MessageIdStrategy::ContentHash)
            .build(),
    )
    .unwrap();
    let event = LogEvent::builder(Level::LOG_INFO, "TestSend")
        .field("payload", "z".repeat(2000))
        .build();
    sink.emit(&event);
    sink.emit(&event);

    let mut buf = vec![0u8; 65536];
    let mut ids = Vec::new();
    let mut reassembler = Reassembler::new();
    let mut messages = 0;
    while messages < 2 {
        let n = server.recv(&mut buf).unwrap();
        ids.push(Chunk::decode(&buf[..n]).unwrap().message_id);
        if reassembler.push(&buf[..n]).is_some() {
            messages += 1;
        }
    }
    assert!(ids.iter().all(|id| *id == ids[0]));
}
