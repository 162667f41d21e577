//! Storage infrastructure: everything that maps user input and options files
//! onto the configuration store.
//!
//! - `options` reads and writes the TOML options file.
//! - `location` turns command-line locations (URLs or paths) into URLs.
//!
//! The `platform.cfg` format itself lives in `platform-config-core`; the
//! store in `application::store` decides when to read and write it.

pub mod location;
pub mod options;
