//! # platform-config-core
//!
//! Shared types for the platform site configuration: site entries, site
//! policies, descriptor detection, and the `platform.cfg` codec.
//!
//! This crate holds no stream or install-location logic; those live in the
//! `platform-config` crate, which owns the configuration store.
//!
//! # Architecture overview (for beginners)
//!
//! A platform installation draws its plugins and features from one or more
//! *sites*.  Each site is a URL with a policy saying which of the plugins and
//! features found there are active.  The set of configured sites is saved to a
//! small text file so that the next start sees the same configuration.
//!
//! - **`domain`** – `SiteEntry`, `SitePolicy`, `PolicyType`, and the scan that
//!   finds `feature.xml` / `plugin.xml` descriptors on a local site.
//!
//! - **`format`** – The `key=value` property reader and writer, and the codec
//!   that maps sites to indexed keys (`site.0.url`, `site.0.policy`, ...).

pub mod domain;
pub mod format;

// Re-export the most-used types at the crate root so callers can write
// `platform_config_core::SiteEntry`.
pub use domain::detect::{detect_features, detect_plugins};
pub use domain::site::{PolicyError, PolicyType, SiteEntry, SitePolicy};
pub use format::codec::{decode_sites, encode_configuration, write_configuration};
pub use format::properties::PropertySet;
pub use url::Url;
