//! CLI Layer
//!
//! Command handlers behind the `draftsmith` binary.

pub mod commands;
