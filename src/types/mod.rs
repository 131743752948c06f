//! Shared Types
//!
//! Error taxonomy and the crate-wide `Result` alias.

pub mod error;

pub use error::{ClassifiedError, DraftError, ErrorClassifier, ErrorKind, Result};
