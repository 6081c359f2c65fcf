//! Built-in schemas for every entity kind
//!
//! Field lists mirror the record shapes the remote application returns.
//! Anything not declared here passes through normalization untouched.

mod config_entries;
mod dashboard;
mod entities;
mod helpers;

pub use config_entries::{config_entry, group, template};
pub use dashboard::{dashboard_meta, view};
pub use entities::{automation, scene, script};
pub use helpers::{INPUT_HELPER_TYPES, input_helper};
