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

//! Log an error with a cause chain through the [`tracing`] layer.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html

use gelf_tracing::{config::GelfConfig, layer::Layer};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

#[derive(Debug)]
struct LevelOne;

impl std::fmt::Display for LevelOne {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Level One exception")
    }
}

impl std::error::Error for LevelOne {}

#[derive(Debug)]
struct Nested(LevelOne);

impl std::fmt::Display for Nested {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nested Exception")
    }
}

impl std::error::Error for Nested {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

fn save() -> Result<(), Nested> {
    Err(Nested(LevelOne))
}

pub fn main() {
    let subscriber = Registry::default().with(
        Layer::from_config(
            &GelfConfig::builder()
                .facility("VolkovTestFacility")
                .with_tracing_source_location(true)
                .build(),
        )
        .unwrap(),
    );
    let _guard = tracing::subscriber::set_default(subscriber);

    if let Err(err) = save() {
        error!(
            error = &err as &(dyn std::error::Error + 'static),
            test_property_one = "1",
            "test exception with object"
        );
    }
}
