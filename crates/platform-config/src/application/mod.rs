//! Application layer: the configuration store and the ports it depends on.

pub mod options;
pub mod ports;
pub mod store;
