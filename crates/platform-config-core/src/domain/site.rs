//! Site entries and the policies attached to them.
//!
//! A *site* is a URL-addressable location holding installable plugins and
//! features.  Every configured site carries a [`SitePolicy`] that decides which
//! of those plugins and features are active:
//!
//! | Policy          | Meaning                                              |
//! |-----------------|------------------------------------------------------|
//! | `USER_INCLUDE`  | only the listed identifiers are active               |
//! | `USER_EXCLUDE`  | everything is active except the listed identifiers   |
//! | `SITE_INCLUDE`  | the site itself decides; the list is advisory        |
//!
//! # Why no `Option` fields? (for beginners)
//!
//! An entry without a URL or without a policy is meaningless, so the
//! constructor takes both by value.  The type system then guarantees that
//! every `SiteEntry` in the program has both, and no code path needs to check.

use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::detect::{detect_features, detect_plugins};

/// Errors raised when constructing a [`SitePolicy`] from untyped input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The numeric policy code is not one of 0, 1, 2.
    #[error("unknown site policy code: {0}")]
    UnknownCode(i32),

    /// The textual policy token is not one of the on-disk tokens.
    #[error("unknown site policy token: {0:?}")]
    UnknownToken(String),
}

// ── PolicyType ────────────────────────────────────────────────────────────────

/// The kind of policy applied to a site.
///
/// The discriminants are the numeric codes used by the platform API; the
/// on-disk representation is the hyphenated token returned by [`Self::token`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    #[serde(rename = "USER-INCLUDE")]
    UserInclude = 0,
    #[default]
    #[serde(rename = "USER-EXCLUDE")]
    UserExclude = 1,
    #[serde(rename = "SITE-INCLUDE")]
    SiteInclude = 2,
}

impl PolicyType {
    /// All policy types, ordered by numeric code.
    pub const ALL: [Self; 3] = [Self::UserInclude, Self::UserExclude, Self::SiteInclude];

    /// Numeric code of this policy type.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Token written to `site.<i>.policy`.
    pub fn token(self) -> &'static str {
        match self {
            Self::UserInclude => "USER-INCLUDE",
            Self::UserExclude => "USER-EXCLUDE",
            Self::SiteInclude => "SITE-INCLUDE",
        }
    }
}

impl TryFrom<i32> for PolicyType {
    type Error = PolicyError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(PolicyError::UnknownCode(code))
    }
}

impl FromStr for PolicyType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.token() == s)
            .ok_or_else(|| PolicyError::UnknownToken(s.to_string()))
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ── SitePolicy ────────────────────────────────────────────────────────────────

/// A policy type plus the ordered identifiers it applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePolicy {
    #[serde(rename = "type")]
    policy_type: PolicyType,
    list: Vec<String>,
}

impl SitePolicy {
    pub fn new(policy_type: PolicyType, list: Vec<String>) -> Self {
        Self { policy_type, list }
    }

    /// Builds a policy from a numeric code, as the platform API does.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnknownCode`] when `code` is not 0, 1 or 2.
    pub fn from_code(code: i32, list: Vec<String>) -> Result<Self, PolicyError> {
        Ok(Self::new(PolicyType::try_from(code)?, list))
    }

    pub fn policy_type(&self) -> PolicyType {
        self.policy_type
    }

    pub fn list(&self) -> &[String] {
        &self.list
    }

    pub fn set_list(&mut self, list: Vec<String>) {
        self.list = list;
    }
}

// ── SiteEntry ─────────────────────────────────────────────────────────────────

/// One configured site: its URL, its policy, and lazily detected descriptors.
///
/// Detection results are cached in the entry the first time they are asked
/// for and never refreshed.  Use [`detect_features`] / [`detect_plugins`]
/// directly for a fresh scan.
#[derive(Debug, Clone)]
pub struct SiteEntry {
    url: Url,
    policy: SitePolicy,
    features: OnceCell<Vec<String>>,
    plugins: OnceCell<Vec<String>>,
}

impl SiteEntry {
    pub fn new(url: Url, policy: SitePolicy) -> Self {
        Self {
            url,
            policy,
            features: OnceCell::new(),
            plugins: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn site_policy(&self) -> &SitePolicy {
        &self.policy
    }

    pub fn site_policy_mut(&mut self) -> &mut SitePolicy {
        &mut self.policy
    }

    pub fn set_site_policy(&mut self, policy: SitePolicy) {
        self.policy = policy;
    }

    /// Returns `true` when descriptors can be detected for this site
    /// (only `file:` URLs).
    pub fn supports_detection(&self) -> bool {
        self.url.scheme() == "file"
    }

    /// Feature descriptors under `install/features`, scanned once per entry.
    pub fn detected_features(&self) -> &[String] {
        self.features.get_or_init(|| detect_features(&self.url))
    }

    /// Plugin and fragment descriptors under `plugins`, scanned once per entry.
    pub fn detected_plugins(&self) -> &[String] {
        self.plugins.get_or_init(|| detect_plugins(&self.url))
    }
}

/// Two entries are equal when URL and policy match; cached detection
/// results do not take part.
impl PartialEq for SiteEntry {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.policy == other.policy
    }
}

impl Eq for SiteEntry {}

// ── Tests ─────────────────────────────────────────────────────────────────────
