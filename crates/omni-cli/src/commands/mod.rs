//! CLI commands

pub mod compose;
pub mod diff;
pub mod split;
pub mod validate;
