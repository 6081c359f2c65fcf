//! Config-entry helpers: template and group subtypes plus single-form domains

use std::sync::LazyLock;

use crate::schema::{DefaultValue::*, Field, Schema};

static TEMPLATE_SENSOR: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "template.sensor",
        vec![
            Field::str("entry_id"),
            Field::str("id"),
            Field::str("name").required(),
            Field::str("state").required(),
            Field::str("unit_of_measurement"),
            Field::str("device_class"),
            Field::str("state_class"),
            Field::str("device_id"),
            Field::str("availability"),
        ],
    )
});

static TEMPLATE_BINARY_SENSOR: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "template.binary_sensor",
        vec![
            Field::str("entry_id"),
            Field::str("id"),
            Field::str("name").required(),
            Field::str("state").required(),
            Field::str("device_class"),
            Field::str("device_id"),
            Field::str("availability"),
        ],
    )
});

static TEMPLATE_SWITCH: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "template.switch",
        vec![
            Field::str("entry_id"),
            Field::str("id"),
            Field::str("name").required(),
            Field::str("value_template"),
            Field::any("turn_on"),
            Field::any("turn_off"),
            Field::str("device_id"),
            Field::str("availability"),
        ],
    )
});

static GROUP_BINARY_SENSOR: LazyLock<Schema> =
    LazyLock::new(|| group_with_all("group.binary_sensor"));

static GROUP_LIGHT: LazyLock<Schema> = LazyLock::new(|| group_with_all("group.light"));

static GROUP_SENSOR: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "group.sensor",
        vec![
            Field::str("entry_id"),
            Field::str("id"),
            Field::str("name").required(),
            Field::list("entities"),
            Field::str("type"),
            Field::bool("hide_members").or(Bool(false)),
        ],
    )
});

static INTEGRATION: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "integration",
        vec![
            Field::str("entry_id"),
            Field::str("name").required(),
            Field::str("source").required(),
            Field::choice("method", &["trapezoidal", "left", "right"]).or(Str("trapezoidal")),
            Field::int("round"),
            Field::map("max_sub_interval"),
        ],
    )
});

static UTILITY_METER: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "utility_meter",
        vec![
            Field::str("entry_id"),
            Field::str("name").required(),
            Field::str("source").required(),
            Field::str("cycle"),
            Field::map("offset"),
            Field::bool("periodically_resetting").or(Bool(true)),
            Field::bool("always_available").or(Bool(false)),
            Field::bool("delta_values").or(Bool(false)),
            Field::bool("net_consumption").or(Bool(false)),
            Field::list("tariffs"),
        ],
    )
});

static THRESHOLD: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "threshold",
        vec![
            Field::str("entry_id"),
            Field::str("name").required(),
            Field::str("entity_id").required(),
            Field::float("hysteresis").or(Float(0.0)),
            Field::float("lower"),
            Field::float("upper"),
        ],
    )
});

static TOD: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "tod",
        vec![
            Field::str("entry_id"),
            Field::str("name").required(),
            Field::str("after_time").required(),
            Field::str("before_time").required(),
        ],
    )
});

fn group_with_all(name: &'static str) -> Schema {
    Schema::new(
        name,
        vec![
            Field::str("entry_id"),
            Field::str("id"),
            Field::str("name").required(),
            Field::list("entities"),
            Field::bool("hide_members").or(Bool(false)),
            Field::bool("all").or(Bool(false)),
        ],
    )
}

/// Schema of a template helper subtype.
pub fn template(subtype: &str) -> Option<&'static Schema> {
    let schema: &'static LazyLock<Schema> = match subtype {
        "sensor" => &TEMPLATE_SENSOR,
        "binary_sensor" => &TEMPLATE_BINARY_SENSOR,
        "switch" => &TEMPLATE_SWITCH,
        _ => return None,
    };
    Some(LazyLock::force(schema))
}

/// Schema of a group helper subtype. Other group platforms share the
/// light/binary_sensor shape.
pub fn group(subtype: &str) -> Option<&'static Schema> {
    let schema: &'static LazyLock<Schema> = match subtype {
        "sensor" => &GROUP_SENSOR,
        "binary_sensor" => &GROUP_BINARY_SENSOR,
        "light" | "cover" | "fan" | "lock" | "media_player" | "switch" | "event" => &GROUP_LIGHT,
        _ => return None,
    };
    Some(LazyLock::force(schema))
}

/// Schema of a single-form config-entry helper domain.
pub fn config_entry(domain: &str) -> Option<&'static Schema> {
    let schema: &'static LazyLock<Schema> = match domain {
        "integration" => &INTEGRATION,
        "utility_meter" => &UTILITY_METER,
        "threshold" => &THRESHOLD,
        "tod" => &TOD,
        _ => return None,
    };
    Some(LazyLock::force(schema))
}
