//! Squirrel transformation log: codec, controller, replay and cache.
//!
//! The log is an editable text file; a marked region inside it holds one
//! entry per recorded action, each tagged with a `#sq_action:` trailer.
//! This crate parses and rewrites that region ([`log`]), drives mutations
//! under a per-file lock ([`controller`]), folds the entries over a fresh
//! table environment ([`replay`]) and caches the result by content hash
//! ([`cache`]).

pub mod cache;
pub mod controller;
pub mod error;
pub mod log;
pub mod replay;

pub use cache::{TableCache, fingerprint};
pub use controller::{Controller, EntrySummary, parse_reorder_request};
pub use error::{PipelineError, Result};
pub use log::{Entry, Log};
pub use replay::{EntryOutcome, EntryStatus, ReplayMode, ReplayOptions, ReplayReport, replay};
