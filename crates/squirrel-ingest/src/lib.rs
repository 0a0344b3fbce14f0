//! Data ingestion for Squirrel projects: manifest-described source
//! directories plus the filesystem loader the replay evaluator calls for
//! `load_table(..)`.

pub mod error;
pub mod loader;
pub mod manifest;

pub use error::{IngestError, Result};
pub use loader::{FsLoader, read_csv, read_json, read_source};
pub use manifest::{DataSource, Manifest, MANIFEST_FILE, SourceKind};
