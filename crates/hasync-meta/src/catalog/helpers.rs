use std::sync::LazyLock;

use crate::schema::{DefaultValue::*, Field, Schema};

/// Storage-collection helper types with a declared schema.
pub const INPUT_HELPER_TYPES: &[&str] = &[
    "input_boolean",
    "input_number",
    "input_select",
    "input_text",
    "input_datetime",
    "input_button",
];

static INPUT_BOOLEAN: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "input_boolean",
        vec![
            Field::str("id").required(),
            Field::str("name"),
            Field::str("icon"),
            Field::bool("initial"),
        ],
    )
});

static INPUT_NUMBER: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "input_number",
        vec![
            Field::str("id").required(),
            Field::str("name"),
            Field::str("icon"),
            Field::float("min").or(Float(0.0)),
            Field::float("max").or(Float(100.0)),
            Field::float("step").or(Float(1.0)),
            Field::float("initial"),
            Field::str("unit_of_measurement"),
            Field::choice("mode", &["box", "slider"]).or(Str("slider")),
        ],
    )
});

static INPUT_SELECT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "input_select",
        vec![
            Field::str("id").required(),
            Field::str("name"),
            Field::str("icon"),
            Field::list("options"),
            Field::str("initial"),
        ],
    )
});

static INPUT_TEXT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "input_text",
        vec![
            Field::str("id").required(),
            Field::str("name"),
            Field::str("icon"),
            Field::int("min").or(Int(0)),
            Field::int("max").or(Int(100)),
            Field::str("initial"),
            Field::str("pattern"),
            Field::choice("mode", &["text", "password"]).or(Str("text")),
        ],
    )
});

static INPUT_DATETIME: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "input_datetime",
        vec![
            Field::str("id").required(),
            Field::str("name"),
            Field::str("icon"),
            Field::bool("has_date").or(Bool(true)),
            Field::bool("has_time").or(Bool(true)),
            Field::str("initial"),
        ],
    )
});

static INPUT_BUTTON: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "input_button",
        vec![Field::str("id").required(), Field::str("name"), Field::str("icon")],
    )
});

/// Schema of an input helper type, if it has one.
pub fn input_helper(helper_type: &str) -> Option<&'static Schema> {
    let schema: &'static LazyLock<Schema> = match helper_type {
        "input_boolean" => &INPUT_BOOLEAN,
        "input_number" => &INPUT_NUMBER,
        "input_select" => &INPUT_SELECT,
        "input_text" => &INPUT_TEXT,
        "input_datetime" => &INPUT_DATETIME,
        "input_button" => &INPUT_BUTTON,
        _ => return None,
    };
    Some(LazyLock::force(schema))
}
