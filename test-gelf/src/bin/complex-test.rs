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

//! Send events carrying a nested structure, straight through a [`GelfSink`], with a minimum level
//! of "critical" & a 50-character cap on the short message.

use gelf_tracing::{
    config::GelfConfig, event::LogEvent, facility::Level, gelf::NestedFields, sink::GelfSink,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Bar {
    id: i32,
    prop: String,
    test_bar_boolean_property: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TestClass {
    id: i32,
    test_class_boolean_property: bool,
    test_property_one: String,
    bar: Bar,
    test_property_two: String,
    test_property_three: String,
}

pub fn main() {
    let test = std::sync::Arc::new(TestClass {
        id: 1,
        test_class_boolean_property: true,
        test_property_one: String::from("1"),
        bar: Bar {
            id: 2,
            prop: String::from("123"),
            test_bar_boolean_property: false,
        },
        test_property_two: String::from("2"),
        test_property_three: String::from("3"),
    });

    let sink = GelfSink::from_config(
        &GelfConfig::builder()
            .facility("VolkovTestFacility")
            .minimum_level(Level::LOG_CRIT)
            .short_message_max_length(50)
            .build(),
    )
    .unwrap();
    // Only the LOG_CRIT event should make it
    for level in [Level::LOG_INFO, Level::LOG_DEBUG, Level::LOG_CRIT, Level::LOG_ERR] {
        sink.emit(
            &LogEvent::builder(level, format!("SomeComplexTestEntry {:?}", level))
                .template("SomeComplexTestEntry {@test}")
                .field_arc("test", test.clone())
                .build(),
        );
    }

    // The same, flattened: `_test_Bar_Id` & friends
    let sink = GelfSink::from_config(
        &GelfConfig::builder()
            .facility("VolkovTestFacility")
            .nested_fields(NestedFields::Flatten)
            .build(),
    )
    .unwrap();
    sink.emit(
        &LogEvent::builder(Level::LOG_INFO, "SomeComplexTestEntry (flattened)")
            .field_arc("test", test)
            .build(),
    );

    println!("{:?}", sink.diagnostics().counts());
}
