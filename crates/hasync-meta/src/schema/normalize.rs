//! Canonical form of a record

use serde_json::{Number, Value};
use tracing::trace;

use super::{Field, FieldType, Schema};
use crate::{NormalizedRecord, Record, Result, SchemaError};

impl Schema {
    /// Validate `raw` and return its canonical form.
    ///
    /// Declared fields are coerced to their type and dropped when absent,
    /// null, or equal to their default. Unknown fields pass through with
    /// only nulls removed. The result is a fixed point: normalizing it
    /// again yields the same record.
    pub fn normalize(&self, raw: &Record) -> Result<NormalizedRecord> {
        let mut out = NormalizedRecord::default();

        for field in self.fields() {
            match raw.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        return Err(SchemaError::MissingField {
                            schema: self.name().to_string(),
                            field: field.name.to_string(),
                        });
                    }
                }
                Some(value) => {
                    let coerced = self.coerce(field, value)?;
                    if coerced != *value {
                        trace!(schema = self.name(), field = field.name, from = %value, to = %coerced, "coerced field");
                    }
                    let is_default = field.default.is_some_and(|d| d.matches(&coerced));
                    if !is_default || field.required {
                        out.declared.insert(field.name.to_string(), coerced);
                    }
                }
            }
        }

        for (key, value) in raw {
            if value.is_null() || self.declares(key) {
                continue;
            }
            out.extra.insert(key.clone(), value.clone());
        }

        Ok(out)
    }

    /// Shorthand for `normalize(raw)?.into_record()`.
    pub fn normalize_record(&self, raw: &Record) -> Result<Record> {
        self.normalize(raw).map(NormalizedRecord::into_record)
    }

    fn coerce(&self, field: &Field, value: &Value) -> Result<Value> {
        let mismatch = || SchemaError::TypeMismatch {
            schema: self.name().to_string(),
            field: field.name.to_string(),
            expected: field.ty.describe(),
            found: describe_value(value).to_string(),
        };

        match field.ty {
            FieldType::Any => Ok(value.clone()),
            FieldType::Str => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            FieldType::Bool => coerce_bool(value).map(Value::Bool).ok_or_else(mismatch),
            FieldType::Int => coerce_int(value).map(Value::from).ok_or_else(mismatch),
            FieldType::Float => coerce_float(value)
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            FieldType::List => match value {
                Value::Array(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            FieldType::Map => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            FieldType::Choice(allowed) => match value {
                Value::String(s) if allowed.contains(&s.as_str()) => Ok(value.clone()),
                Value::String(s) => Err(SchemaError::InvalidChoice {
                    schema: self.name().to_string(),
                    field: field.name.to_string(),
                    value: s.clone(),
                    allowed: allowed.iter().map(|a| a.to_string()).collect(),
                }),
                _ => Err(mismatch()),
            },
        }
    }
}

/// Canonical form for records without a declared schema: nulls removed,
/// order kept.
pub fn normalize_schemaless(raw: &Record) -> Record {
    raw.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn describe_value(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DefaultValue, Field};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn sample() -> Schema {
        Schema::new(
            "sample",
            vec![
                Field::str("id").required(),
                Field::str("alias").or(DefaultValue::Str("")),
                Field::float("max").or(DefaultValue::Float(100.0)),
                Field::bool("enabled").or(DefaultValue::Bool(true)),
                Field::choice("mode", &["single", "queued"]).or(DefaultValue::Str("single")),
                Field::list("action"),
            ],
        )
    }

    #[test]
    fn test_declared_order_then_extras() {
        let raw = record(json!({"zzz": 1, "action": [{"x": 1}], "id": "a", "alias": "A"}));
        let out = sample().normalize_record(&raw).unwrap();
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["id", "alias", "action", "zzz"]);
    }

    #[test]
    fn test_defaults_and_nulls_elided() {
        let raw = record(json!({
            "id": "a", "alias": "", "max": 100, "enabled": "yes",
            "mode": "single", "action": [], "note": null
        }));
        let out = sample().normalize_record(&raw).unwrap();
        assert_eq!(out, record(json!({"id": "a"})));
    }

    #[test]
    fn test_float_coerces_integers() {
        let raw = record(json!({"id": "a", "max": 50}));
        let out = sample().normalize_record(&raw).unwrap();
        assert_eq!(out["max"], json!(50.0));
    }

    #[test]
    fn test_wrong_primitive_is_rejected() {
        let raw = record(json!({"id": "a", "alias": 5}));
        let err = sample().normalize(&raw).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref field, .. } if field == "alias"));
    }

    #[test]
    fn test_choice_outside_set_is_rejected() {
        let raw = record(json!({"id": "a", "mode": "parallel"}));
        let err = sample().normalize(&raw).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidChoice { .. }));
    }

    #[test]
    fn test_missing_required_field() {
        let err = sample().normalize(&record(json!({"alias": "x"}))).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                schema: "sample".into(),
                field: "id".into()
            }
        );
    }

    #[test]
    fn test_schemaless_drops_nulls_keeps_order() {
        let raw = record(json!({"b": 1, "a": null, "c": {"d": null}}));
        let out = normalize_schemaless(&raw);
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        // Nested nulls are data
        assert_eq!(out["c"], json!({"d": null}));
    }

    #[rstest]
    #[case(json!(true), Some(true))]
    #[case(json!("yes"), Some(true))]
    #[case(json!("On"), Some(true))]
    #[case(json!("TRUE"), Some(true))]
    #[case(json!("1"), Some(true))]
    #[case(json!(1), Some(true))]
    #[case(json!(false), Some(false))]
    #[case(json!("no"), Some(false))]
    #[case(json!("off"), Some(false))]
    #[case(json!("0"), Some(false))]
    #[case(json!(0), Some(false))]
    #[case(json!(2), None)]
    #[case(json!(1.5), None)]
    #[case(json!("maybe"), None)]
    #[case(json!(""), None)]
    #[case(json!([true]), None)]
    fn test_bool_coercion(#[case] value: Value, #[case] expected: Option<bool>) {
        assert_eq!(coerce_bool(&value), expected);
    }

    #[rstest]
    #[case(json!(3), Some(3))]
    #[case(json!(-4), Some(-4))]
    #[case(json!(3.0), Some(3))]
    #[case(json!(-2.0), Some(-2))]
    #[case(json!(1.5), None)]
    #[case(json!("42"), Some(42))]
    #[case(json!(" 7 "), Some(7))]
    #[case(json!("4.5"), None)]
    #[case(json!("ten"), None)]
    #[case(json!(true), None)]
    fn test_int_coercion(#[case] value: Value, #[case] expected: Option<i64>) {
        assert_eq!(coerce_int(&value), expected);
    }

    #[rstest]
    #[case(json!(2), Some(2.0))]
    #[case(json!(0.25), Some(0.25))]
    #[case(json!("1.5"), Some(1.5))]
    #[case(json!("inf"), None)]
    #[case(json!("-infinity"), None)]
    #[case(json!("nan"), None)]
    #[case(json!("abc"), None)]
    #[case(json!(false), None)]
    fn test_float_coercion(#[case] value: Value, #[case] expected: Option<f64>) {
        assert_eq!(coerce_float(&value), expected);
    }

    fn typed() -> Schema {
        Schema::new(
            "typed",
            vec![Field::bool("flag"), Field::int("count"), Field::float("ratio")],
        )
    }

    #[test]
    fn test_coerced_values_are_stored_canonically() {
        let raw = record(json!({"flag": "off", "count": 3.0, "ratio": "0.5"}));
        let out = typed().normalize_record(&raw).unwrap();
        assert_eq!(out, record(json!({"flag": false, "count": 3, "ratio": 0.5})));
    }

    #[rstest]
    #[case("flag", json!("maybe"))]
    #[case("flag", json!(2))]
    #[case("count", json!(1.5))]
    #[case("ratio", json!("inf"))]
    fn test_uncoercible_values_are_type_mismatches(#[case] field: &str, #[case] value: Value) {
        let mut raw = Record::new();
        raw.insert(field.to_string(), value);
        let err = typed().normalize(&raw).unwrap_err();
        assert!(
            matches!(err, SchemaError::TypeMismatch { field: ref f, .. } if f == field),
            "{err:?}"
        );
    }
}
