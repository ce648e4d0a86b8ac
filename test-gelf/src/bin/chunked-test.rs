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

//! Play Graylog: listen on a loopback UDP port, send ourselves one large message & check that
//! it comes back together.

use gelf_tracing::{
    chunk::{Chunk, Reassembler},
    config::GelfConfig,
    layer::Layer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

use std::{net::UdpSocket, time::Duration};

pub fn main() {
    let server = UdpSocket::bind("127.0.0.1:0").unwrap();
    server
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let subscriber = Registry::default().with(
        Layer::from_config(
            &GelfConfig::builder()
                .host("127.0.0.1")
                .port(server.local_addr().unwrap().port())
                .facility("VolkovTestFacility")
                .build(),
        )
        .unwrap(),
    );
    let _guard = tracing::subscriber::set_default(subscriber);

    let big = "0123456789".repeat(2000);
    info!(big = big.as_str(), "a message too big for one datagram");

    let mut reassembler = Reassembler::new();
    let mut buf = vec![0u8; 65536];
    let mut chunks = 0;
    let msg = loop {
        let n = server.recv(&mut buf).unwrap();
        let chunk = Chunk::decode(&buf[..n]).unwrap();
        println!(
            "chunk {}/{} ({} bytes)",
            chunk.sequence_number + 1,
            chunk.sequence_count,
            n
        );
        chunks += 1;
        if let Some(msg) = reassembler.push(&buf[..n]) {
            break msg;
        }
    };

    let msg: serde_json::Value = serde_json::from_slice(&msg).unwrap();
    assert_eq!(msg["_big"], serde_json::Value::from(big));
    assert_eq!(chunks, 3);
    println!("reassembled {} chunks into {} bytes of GELF", chunks, msg.to_string().len());
}
