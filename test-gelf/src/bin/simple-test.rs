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

//! Test writing to a Graylog GELF UDP input on port 12201 on the local host.

use gelf_tracing::{layer::Layer, tracing::GelfTracingFormatter, transport::UdpTransport};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    let layer = Layer::<Registry, GelfTracingFormatter, UdpTransport>::try_default().unwrap();
    let diagnostics = layer.diagnostics();
    // Setup the real subsriber...
    let subscriber = Registry::default().with(layer);
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("Hello, 世界!");
    debug!("Hello, 世界!");
    info!(battle_profile = "Hobbit, level 3", "battle profile: Hobbit, level 3");
    warn!("Hello, 世界!");
    error!("Hello, 世界!");

    println!("{:?}", diagnostics.counts());
}
