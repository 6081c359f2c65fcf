//! Properties of the normalizer over every built-in schema

use hasync_meta::{Record, Schema, catalog, normalize_schemaless};
use proptest::prelude::*;
use serde_json::{Value, json};

fn all_schemas() -> Vec<&'static Schema> {
    let mut schemas = vec![
        catalog::automation(),
        catalog::script(),
        catalog::scene(),
        catalog::dashboard_meta(),
        catalog::view(),
    ];
    schemas.extend(catalog::INPUT_HELPER_TYPES.iter().filter_map(|t| catalog::input_helper(t)));
    schemas.extend(["sensor", "binary_sensor", "switch"].iter().filter_map(|s| catalog::template(s)));
    schemas.extend(["sensor", "binary_sensor", "light"].iter().filter_map(|s| catalog::group(s)));
    schemas.extend(
        ["integration", "utility_meter", "threshold", "tod"]
            .iter()
            .filter_map(|d| catalog::config_entry(d)),
    );
    schemas
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1000i64..1000).prop_map(Value::from),
        (-1000.0f64..1000.0).prop_map(|f| json!(f)),
        prop_oneof![
            Just("".to_string()),
            Just("single".to_string()),
            Just("yes".to_string()),
            Just("5".to_string()),
            "[a-z ]{1,6}",
        ]
        .prop_map(Value::String),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    scalar().prop_recursive(2, 8, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
            prop::collection::vec(("[a-c]", inner), 0..3)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect())),
        ]
    })
}

/// A record drawing keys from the schema's declared names plus extras.
fn record_for(schema: &'static Schema) -> impl Strategy<Value = Vec<(String, Value)>> {
    let mut names: Vec<String> = schema.fields().iter().map(|f| f.name.to_string()).collect();
    names.extend(["extra_a", "extra_b", "_meta"].map(String::from));
    let names = prop::sample::subsequence(names.clone(), 0..=names.len());
    names.prop_flat_map(|keys| {
        let n = keys.len();
        (Just(keys), prop::collection::vec(value(), n))
    })
    .prop_map(|(keys, values)| keys.into_iter().zip(values).collect())
}

fn schema_and_record() -> impl Strategy<Value = (usize, Vec<(String, Value)>)> {
    let count = all_schemas().len();
    (0..count).prop_flat_map(|i| (Just(i), record_for(all_schemas()[i])))
}

proptest! {
    #[test]
    fn test_normalize_is_idempotent((idx, pairs) in schema_and_record()) {
        let schema = all_schemas()[idx];
        let raw: Record = pairs.into_iter().collect();
        if let Ok(once) = schema.normalize_record(&raw) {
            let twice = schema.normalize_record(&once).unwrap();
            prop_assert_eq!(&twice, &once);
            let keys_once: Vec<_> = once.keys().collect();
            let keys_twice: Vec<_> = twice.keys().collect();
            prop_assert_eq!(keys_twice, keys_once);
        }
    }

    #[test]
    fn test_key_order_does_not_matter((idx, pairs) in schema_and_record(), seed in any::<u64>()) {
        let schema = all_schemas()[idx];
        let raw: Record = pairs.iter().cloned().collect();
        let mut shuffled = pairs;
        // Deterministic rotation plus reversal covers every relative order change we need
        if !shuffled.is_empty() {
            let by = (seed as usize) % shuffled.len();
            shuffled.rotate_left(by);
            if seed % 2 == 0 {
                shuffled.reverse();
            }
        }
        let permuted: Record = shuffled.into_iter().collect();
        prop_assert_eq!(schema.normalize_record(&raw), schema.normalize_record(&permuted));
    }

    #[test]
    fn test_schemaless_is_idempotent(pairs in prop::collection::vec(("[a-e]", value()), 0..6)) {
        let raw: Record = pairs.into_iter().collect();
        let once = normalize_schemaless(&raw);
        prop_assert_eq!(normalize_schemaless(&once), once);
    }
}

#[test]
fn test_automation_canonical_form() {
    let raw: Record = json!({
        "mode": "single",
        "action": [{"service": "light.turn_on"}],
        "alias": "Morning",
        "trigger": [{"platform": "time", "at": "07:00"}],
        "id": "morning",
        "condition": [],
        "variables": {"x": 1}
    })
    .as_object()
    .cloned()
    .unwrap();

    let out = catalog::automation().normalize_record(&raw).unwrap();
    assert_eq!(
        out.keys().collect::<Vec<_>>(),
        vec!["id", "alias", "trigger", "action", "variables"]
    );
}

#[test]
fn test_input_number_rejects_text_bounds() {
    let raw: Record = json!({"id": "vol", "name": "Volume", "max": "loud"})
        .as_object()
        .cloned()
        .unwrap();
    assert!(catalog::input_helper("input_number").unwrap().normalize(&raw).is_err());
}
