use std::sync::LazyLock;

use crate::schema::{DefaultValue::*, Field, Schema};

static DASHBOARD_META: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "dashboard",
        vec![
            Field::str("title").or(Str("")),
            Field::str("icon"),
            Field::str("url_path"),
            Field::bool("show_in_sidebar").or(Bool(true)),
            Field::bool("require_admin").or(Bool(false)),
        ],
    )
});

static VIEW: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new(
        "view",
        vec![
            Field::str("type"),
            Field::str("title").or(Str("")),
            Field::str("path"),
            Field::str("icon"),
            Field::any("badges"),
            Field::list("cards"),
        ],
    )
});

/// Dashboard registry fields (everything except the document itself).
pub fn dashboard_meta() -> &'static Schema {
    &DASHBOARD_META
}

/// One view of a dashboard document.
pub fn view() -> &'static Schema {
    &VIEW
}
