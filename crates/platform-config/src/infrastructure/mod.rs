//! Infrastructure layer for the configuration tool.
//!
//! Contains OS-facing adapters: local file streams, install location lookup,
//! and options/location handling for the command line.

pub mod install;
pub mod storage;
pub mod streams;
