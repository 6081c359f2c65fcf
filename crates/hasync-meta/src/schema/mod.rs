//! Field schemas
//!
//! A [`Schema`] is an ordered list of [`Field`]s. Output key order follows
//! declaration order, so the catalog entries double as the on-disk layout.

mod normalize;

use serde_json::Value;

pub use normalize::normalize_schemaless;

/// Value type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Str,
    Bool,
    Int,
    Float,
    List,
    Map,
    /// A string restricted to a fixed set of values.
    Choice(&'static [&'static str]),
    /// Anything; only nulls are treated as absent.
    Any,
}

impl FieldType {
    pub fn describe(&self) -> String {
        match self {
            Self::Str => "string".into(),
            Self::Bool => "boolean".into(),
            Self::Int => "integer".into(),
            Self::Float => "number".into(),
            Self::List => "list".into(),
            Self::Map => "mapping".into(),
            Self::Choice(values) => format!("one of {}", values.join("/")),
            Self::Any => "any value".into(),
        }
    }
}

/// Default of a declared field. A value equal to it is elided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Str(&'static str),
    Bool(bool),
    Int(i64),
    Float(f64),
    EmptyList,
    EmptyMap,
}

impl DefaultValue {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Str(d), Value::String(s)) => d == s,
            (Self::Bool(d), Value::Bool(b)) => d == b,
            (Self::Int(d), Value::Number(n)) => n.as_f64() == Some(*d as f64),
            (Self::Float(d), Value::Number(n)) => n.as_f64() == Some(*d),
            (Self::EmptyList, Value::Array(a)) => a.is_empty(),
            (Self::EmptyMap, Value::Object(o)) => o.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub default: Option<DefaultValue>,
    pub required: bool,
}

impl Field {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            default: None,
            required: false,
        }
    }

    pub const fn str(name: &'static str) -> Self {
        Self::new(name, FieldType::Str)
    }

    pub const fn bool(name: &'static str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub const fn float(name: &'static str) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub const fn list(name: &'static str) -> Self {
        Self::new(name, FieldType::List).or(DefaultValue::EmptyList)
    }

    pub const fn map(name: &'static str) -> Self {
        Self::new(name, FieldType::Map).or(DefaultValue::EmptyMap)
    }

    pub const fn any(name: &'static str) -> Self {
        Self::new(name, FieldType::Any)
    }

    pub const fn choice(name: &'static str, values: &'static [&'static str]) -> Self {
        Self::new(name, FieldType::Choice(values))
    }

    /// Set the default value.
    pub const fn or(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Declared field set of one record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: &'static str,
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<Field>) -> Self {
        Self { name, fields }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Names of the fields that must be present.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }
}
