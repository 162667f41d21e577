//! Domain entities for the platform configuration.
//!
//! Everything here is plain data plus the rules that keep it valid.  The only
//! I/O is the read-only descriptor scan in [`detect`], which touches the local
//! file system and never the network.

/// Site entries, site policies, and policy types.
pub mod site;

/// Feature and plugin descriptor detection for local sites.
pub mod detect;
