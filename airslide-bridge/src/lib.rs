//! Library surface of the bridge host binary.
//!
//! Exposed so the config, profile, and replay layers are unit-testable
//! outside the binary.

pub mod config;
pub mod profile;
pub mod replay;
