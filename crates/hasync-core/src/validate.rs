//! Offline checks of the local tree
//!
//! Each kind validates its own files: YAML syntax, required fields and
//! field types. Jinja templates found anywhere in a file are collected by a
//! [`TemplateVisitor`] so the caller can render them against the remote.

use hasync_fs::{NormalizedPath, yaml};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::Result;
use crate::kind::EntityKind;
use crate::sync::Scope;

/// A problem in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub path: String,
    pub message: String,
}

/// A template string and where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateRef {
    pub path: String,
    /// Dotted field path inside the file, e.g. `action[0].data.message`
    pub field: String,
    pub template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub files_checked: usize,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub templates: Vec<TemplateRef>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.files_checked += other.files_checked;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.templates.extend(other.templates);
    }

    pub fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Finding {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Receives every scalar string of a document with its field path.
pub trait Visitor {
    fn visit_str(&mut self, field: &str, value: &str);
}

/// Walk `value` depth-first, calling `visitor` for every string.
pub fn walk(value: &Value, visitor: &mut impl Visitor) {
    let mut field = String::new();
    walk_at(value, &mut field, visitor);
}

fn walk_at(value: &Value, field: &mut String, visitor: &mut impl Visitor) {
    match value {
        Value::String(s) => visitor.visit_str(field, s),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let len = field.len();
                field.push_str(&format!("[{i}]"));
                walk_at(item, field, visitor);
                field.truncate(len);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let len = field.len();
                if !field.is_empty() {
                    field.push('.');
                }
                field.push_str(key);
                walk_at(item, field, visitor);
                field.truncate(len);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Collects Jinja templates and reports unbalanced delimiters.
#[derive(Debug, Default)]
pub struct TemplateVisitor {
    /// `(field, template)` pairs in document order
    pub templates: Vec<(String, String)>,
    /// `(field, message)` pairs
    pub problems: Vec<(String, String)>,
}

impl Visitor for TemplateVisitor {
    fn visit_str(&mut self, field: &str, value: &str) {
        if !is_template(value) {
            return;
        }
        if let Some(problem) = unbalanced(value) {
            self.problems.push((field.to_string(), problem));
        }
        self.templates.push((field.to_string(), value.to_string()));
    }
}

pub fn is_template(value: &str) -> bool {
    value.contains("{{") || value.contains("{%")
}

/// Describe the first delimiter pair whose open and close counts differ.
fn unbalanced(value: &str) -> Option<String> {
    [("{{", "}}"), ("{%", "%}")].iter().find_map(|(open, close)| {
        let opens = value.matches(open).count();
        let closes = value.matches(close).count();
        (opens != closes).then(|| format!("unbalanced template: {opens} '{open}' but {closes} '{close}'"))
    })
}

/// Check every local file of `kind` within `scope`.
///
/// # Errors
///
/// Fails only if the kind's directory cannot be listed; problems inside
/// files are findings.
pub fn validate_kind(kind: &dyn EntityKind, scope: &Scope) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    for file in kind.local_files()?.into_iter().filter(|f| scope.contains(f)) {
        report.merge(validate_file(kind, &file));
    }
    debug!(kind = kind.name(), files = report.files_checked, errors = report.errors.len(), "validated");
    Ok(report)
}

fn validate_file(kind: &dyn EntityKind, file: &NormalizedPath) -> ValidationReport {
    let mut report = ValidationReport {
        files_checked: 1,
        ..Default::default()
    };
    let path = file.to_string();
    let doc = match yaml::read_document(file) {
        Ok(doc) => doc,
        Err(e) => {
            report.error(&path, e.to_string());
            return report;
        }
    };

    let check = kind.check_local(file, &doc);
    for message in check.errors {
        report.error(&path, message);
    }
    for message in check.warnings {
        report.warnings.push(Finding {
            path: path.clone(),
            message,
        });
    }

    let mut visitor = TemplateVisitor::default();
    walk(&Value::Object(doc), &mut visitor);
    for (field, message) in visitor.problems {
        report.error(&path, format!("{field}: {message}"));
    }
    report.templates = visitor
        .templates
        .into_iter()
        .map(|(field, template)| TemplateRef {
            path: path.clone(),
            field,
            template,
        })
        .collect();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_templates_collected_with_field_paths() {
        let doc = json!({
            "alias": "Plain",
            "action": [
                {"service": "notify.phone", "data": {"message": "{{ states('sensor.t') }}"}},
                {"if": [{"condition": "template", "value_template": "{% if x %}1{% endif %}"}]}
            ]
        });
        let mut visitor = TemplateVisitor::default();
        walk(&doc, &mut visitor);
        let fields: Vec<_> = visitor.templates.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(fields, vec!["action[0].data.message", "action[1].if[0].value_template"]);
        assert!(visitor.problems.is_empty());
    }

    #[test]
    fn test_unbalanced_delimiters() {
        let doc = json!({"state": "{{ states('sensor.t') }"});
        let mut visitor = TemplateVisitor::default();
        walk(&doc, &mut visitor);
        assert_eq!(visitor.problems.len(), 1);
        assert_eq!(visitor.problems[0].0, "state");
        assert!(visitor.problems[0].1.contains("'{{'"));
    }

    #[test]
    fn test_plain_strings_are_not_templates() {
        assert!(!is_template("turn on at {sunset}"));
        assert!(is_template("{% set x = 1 %}"));
    }
}
