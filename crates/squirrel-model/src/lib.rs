//! Table value model for the Squirrel transformation engine.
//!
//! This crate holds the data shapes shared by the script evaluator, the
//! ingest layer and the pipeline:
//!
//! - **scalar**: dynamically typed cell values with sort and equality rules
//! - **table**: ordered named columns plus the replay table environment
//! - **infer**: best-effort scalar parsing for text sources
//! - **stats**: on-demand per-column statistics for presentation

pub mod error;
pub mod infer;
pub mod scalar;
pub mod stats;
pub mod table;

pub use error::{ModelError, Result};
pub use infer::parse_scalar;
pub use scalar::Scalar;
pub use stats::{ColumnStats, NumericStats, TextStats, column_stats};
pub use table::{Column, Table, TableEnv};
