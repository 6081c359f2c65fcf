//! YAML document format for entity files
//!
//! Documents are string-keyed mappings kept in insertion order. Multi-line
//! strings are emitted as literal blocks by `serde_yaml`; callers are expected
//! to have removed absent values before writing.

use serde_json::{Map, Value};

use crate::{Error, NormalizedPath, Result, io};

/// A single entity file: a string-keyed mapping in file order.
pub type Document = Map<String, Value>;

/// Parse YAML text into a document.
///
/// An empty file is an empty document. Anything other than a mapping at
/// the top level is rejected.
pub fn parse_document(text: &str, path: &NormalizedPath) -> Result<Document> {
    match parse_value(text, path)? {
        Value::Null => Ok(Document::new()),
        Value::Object(map) => Ok(map),
        _ => Err(Error::NotAMapping {
            path: path.to_native(),
        }),
    }
}

/// Parse YAML text into an arbitrary value.
pub fn parse_value(text: &str, path: &NormalizedPath) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(text).map_err(|e| Error::YamlParse {
        path: path.to_native(),
        message: e.to_string(),
    })
}

/// Render a document as YAML text.
pub fn render_document(doc: &Document, path: &NormalizedPath) -> Result<String> {
    render_value(&Value::Object(doc.clone()), path)
}

/// Render any value as YAML text.
pub fn render_value(value: &Value, path: &NormalizedPath) -> Result<String> {
    serde_yaml::to_string(value).map_err(|e| Error::YamlSerialize {
        path: path.to_native(),
        message: e.to_string(),
    })
}

/// Read and parse a document from disk.
pub fn read_document(path: &NormalizedPath) -> Result<Document> {
    let text = io::read_text(path)?;
    parse_document(&text, path)
}

/// Read and parse any YAML value from disk.
pub fn read_value(path: &NormalizedPath) -> Result<Value> {
    let text = io::read_text(path)?;
    parse_value(&text, path)
}

/// Atomically write a document to disk.
pub fn write_document(path: &NormalizedPath, doc: &Document) -> Result<()> {
    let text = render_document(doc, path)?;
    io::write_text(path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn empty_text_is_empty_document() {
        let parsed = parse_document("  \n", &NormalizedPath::new("a.yaml")).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn sequence_at_top_level_is_rejected() {
        let err = parse_document("- a\n- b\n", &NormalizedPath::new("a.yaml")).unwrap_err();
        assert!(matches!(err, Error::NotAMapping { .. }));
    }

    #[test]
    fn keys_keep_insertion_order() {
        let d = doc(json!({"id": "x", "alias": "A", "action": []}));
        let text = render_document(&d, &NormalizedPath::new("x.yaml")).unwrap();
        let id = text.find("id:").unwrap();
        let alias = text.find("alias:").unwrap();
        let action = text.find("action:").unwrap();
        assert!(id < alias && alias < action, "order lost:\n{text}");
    }

    #[test]
    fn multiline_strings_use_literal_blocks() {
        let d = doc(json!({"state": "{% if x %}\non\n{% endif %}\n"}));
        let text = render_document(&d, &NormalizedPath::new("t.yaml")).unwrap();
        assert!(text.contains("state: |"), "expected literal block:\n{text}");
        let back = parse_document(&text, &NormalizedPath::new("t.yaml")).unwrap();
        assert_eq!(back, d);
    }
}
