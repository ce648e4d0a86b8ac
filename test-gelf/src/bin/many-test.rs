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

//! Send a thousand messages from ten threads, with content-hash message ids & a chunk size small
//! enough that each message is chunked.

use gelf_tracing::{chunk::MessageIdStrategy, config::GelfConfig, layer::Layer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

use std::time::Duration;

pub fn main() {
    let layer = Layer::from_config(
        &GelfConfig::builder()
            .facility("VolkovTestFacility")
            .message_id_strategy(MessageIdStrategy::ContentHash)
            .max_chunk_size(512)
            .build(),
    )
    .unwrap();
    let diagnostics = layer.diagnostics();
    tracing::subscriber::set_global_default(Registry::default().with(layer)).unwrap();

    std::thread::scope(|s| {
        for t in 0..10 {
            s.spawn(move || {
                for i in 0..100 {
                    std::thread::sleep(Duration::from_millis(5));
                    info!(
                        thread = t,
                        profile = i,
                        padding = "BattleProfile ".repeat(100).as_str(),
                        "TestSend {}",
                        t * 100 + i
                    );
                }
            });
        }
    });

    println!("{:?}", diagnostics.counts());
}
