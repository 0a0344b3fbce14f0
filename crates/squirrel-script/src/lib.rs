//! Restricted statement language replayed from the Squirrel transformation log.
//!
//! Log entries are statements in a small, closed language instead of trusted
//! host-language code. The grammar is what the action code generator emits:
//! assignments into the `tables` environment, a fixed set of table and
//! series methods, and a handful of free functions (`load_table`, `merge`,
//! `concat`, ...). Anything outside that vetted surface is a parse or
//! evaluation error, never arbitrary execution.
//!
//! - **lexer** / **parser**: statement-per-line source into an AST;
//!   `#` comments (including `#sq_action:` trailers) run to end of line
//! - **value**: runtime values (scalars, series, tables, lambdas)
//! - **eval**: statement execution against a mutable [`TableEnv`], with an
//!   optional deadline so a runaway expression cannot hang a replay
//! - **funcs** / **table_ops** / **series_ops**: the builtin allow-list

pub mod ast;
pub mod error;
pub mod eval;
pub mod funcs;
pub mod lexer;
pub mod parser;
pub mod series_ops;
pub mod table_ops;
pub mod value;

pub use error::{Result, ScriptError};
pub use eval::{Context, TableLoader, execute, execute_program};
pub use parser::parse_program;
pub use value::Value;
