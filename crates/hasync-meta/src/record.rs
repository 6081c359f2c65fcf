//! Entity records

use serde_json::{Map, Value};

/// A raw entity: string keys in source order.
///
/// Equality ignores key order.
pub type Record = Map<String, Value>;

/// A record after schema validation.
///
/// Declared fields are kept in schema order, fields the schema does not know
/// in their source order. Both halves are merged back by [`into_record`].
///
/// [`into_record`]: NormalizedRecord::into_record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    pub declared: Record,
    pub extra: Record,
}

impl NormalizedRecord {
    pub fn into_record(self) -> Record {
        let mut out = self.declared;
        out.extend(self.extra);
        out
    }

    pub fn to_record(&self) -> Record {
        self.clone().into_record()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.declared.get(key).or_else(|| self.extra.get(key))
    }
}

/// Remove top-level keys starting with `_`.
///
/// These hold local bookkeeping and never take part in comparisons.
pub fn strip_bookkeeping(record: &mut Record) {
    record.retain(|key, _| !key.starts_with('_'));
}

/// A copy of `record` with `key` set to `value` as its first entry.
pub fn ensure_leading(record: &Record, key: &str, value: Value) -> Record {
    let mut out = Record::new();
    out.insert(key.to_string(), value);
    for (k, v) in record {
        if k != key {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_bookkeeping() {
        let mut record = json!({"id": "a", "_filename": "a.yaml", "_config_keys": []})
            .as_object()
            .cloned()
            .unwrap();
        strip_bookkeeping(&mut record);
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_ensure_leading_moves_key_first() {
        let record = json!({"alias": "A", "id": "old"}).as_object().cloned().unwrap();
        let out = ensure_leading(&record, "id", json!("new"));
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["id", "alias"]);
        assert_eq!(out["id"], json!("new"));
    }

    #[test]
    fn test_equality_ignores_key_order() {
        let a = json!({"x": 1, "y": 2}).as_object().cloned().unwrap();
        let b = json!({"y": 2, "x": 1}).as_object().cloned().unwrap();
        assert_eq!(a, b);
    }
}
