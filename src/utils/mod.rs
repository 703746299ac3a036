//! Utilities
//!
//! Common utilities used throughout the pipeline.

pub mod error;

pub use error::*;
