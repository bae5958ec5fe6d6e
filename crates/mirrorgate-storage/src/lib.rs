//! Mirrorgate Storage Library
//!
//! This crate provides the storage abstraction for uploaded assets and a
//! local filesystem implementation.
//!
//! # Storage key format
//!
//! Keys are flat, sanitized file names under a single `media/` prefix:
//! `media/{filename}`. Keys must not contain `..` or a leading `/`.

pub mod local;
pub mod traits;

// Re-export commonly used types
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
