//! Local entity store primitives for ha-sync
//!
//! Provides normalized paths, atomic writes, the YAML document format and
//! the filename derivation rules shared by every entity kind.

pub mod error;
pub mod io;
pub mod naming;
pub mod path;
pub mod store;
pub mod yaml;

pub use error::{Error, Result};
pub use naming::{filename_from_id, filename_from_name, id_from_filename, slugify};
pub use path::NormalizedPath;
pub use store::LocalStore;
pub use yaml::Document;
