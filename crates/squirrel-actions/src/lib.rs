//! Action catalog for the Squirrel transformation log.
//!
//! An action is a named, parameterized transformation. The catalog maps
//! kind names to static definitions; instantiating a kind validates its
//! parameters, and the instance renders both a human label and the
//! statement body that goes into the log (see `squirrel-pipeline`). The
//! `addressing` module handles the `t[X]` / `c[Y]` shorthand users write
//! in free-form fields.

pub mod addressing;
pub mod catalog;
pub mod error;
mod kinds;
pub mod params;

pub use catalog::{ActionInstance, Catalog, KindDef};
pub use error::{ActionError, Result};
pub use params::{ParamSpec, Params};
