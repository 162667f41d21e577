//! Options that tune the behaviour of a [`super::store::ConfigurationStore`].

use serde::{Deserialize, Serialize};

/// Construction-time options for the configuration store.
///
/// Every field has a default so that a partial (or empty) options file is
/// valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Emit load/save diagnostics at `info` instead of `debug`.
    #[serde(default)]
    pub verbose_logging: bool,
}

impl StoreOptions {
    pub fn verbose() -> Self {
        Self {
            verbose_logging: true,
        }
    }
}
