use std::sync::LazyLock;

use crate::schema::{DefaultValue::*, Field, Schema};

const MODES: &[&str] = &["single", "restart", "queued", "parallel"];

static AUTOMATION: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "automation",
        vec![
            Field::str("id").required(),
            Field::str("alias").or(Str("")),
            Field::str("description").or(Str("")),
            Field::list("trigger"),
            Field::list("condition"),
            Field::list("action"),
            Field::choice("mode", MODES).or(Str("single")),
        ],
    )
});

static SCRIPT: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "script",
        vec![
            Field::str("id").required(),
            Field::str("alias"),
            Field::str("description"),
            Field::str("icon"),
            Field::choice("mode", MODES).or(Str("single")),
            Field::list("sequence"),
        ],
    )
});

static SCENE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "scene",
        vec![
            Field::str("id").required(),
            Field::str("name"),
            Field::str("icon"),
            Field::map("entities"),
        ],
    )
});

pub fn automation() -> &'static Schema {
    &AUTOMATION
}

pub fn script() -> &'static Schema {
    &SCRIPT
}

pub fn scene() -> &'static Schema {
    &SCENE
}
