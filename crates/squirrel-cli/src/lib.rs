//! CLI library components for the squirrel pipeline tool.

pub mod logging;
