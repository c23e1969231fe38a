//! CLI command handlers

pub mod tree;
pub mod walk;
