//! Record model, field schemas and normalization for ha-sync.
//!
//! Every comparison between a local file and a remote entity goes through
//! [`Schema::normalize`] (or [`normalize_schemaless`] for record shapes that
//! have no declared schema), so two records are equal exactly when their
//! normalized forms are.

pub mod catalog;
pub mod error;
pub mod record;
pub mod schema;

pub use error::{Result, SchemaError};
pub use record::{NormalizedRecord, Record, ensure_leading, strip_bookkeeping};
pub use schema::{DefaultValue, Field, FieldType, Schema, normalize_schemaless};
