//! Lindex common types, errors, and utilities.
//!
//! This crate provides shared definitions used across all lindex components.

pub mod config;
pub mod error;
pub mod layout;

pub use config::StoreConfig;
pub use error::{LindexError, Result};
pub use layout::{BlockOffset, DEFAULT_BLOCK_SIZE, NIL};
