//! Best-effort detection of feature and plugin descriptors on a local site.
//!
//! Layout of a site on disk:
//!
//! ```text
//! <site>/
//!   install/features/<feature-dir>/feature.xml
//!   plugins/<plugin-dir>/plugin.xml      (or fragment.xml)
//! ```
//!
//! Only one directory level below each root is inspected.  Results are
//! returned as `/`-separated paths relative to the site root, sorted so that
//! the output does not depend on directory iteration order.  Nothing here is
//! persisted; a missing or unreadable directory simply yields no entries.

use std::path::{Path, PathBuf};

use tracing::trace;
use url::Url;

/// Features root, relative to the site.
pub const FEATURES_DIR: &str = "install/features";
/// Plugins root, relative to the site.
pub const PLUGINS_DIR: &str = "plugins";

pub const FEATURE_XML: &str = "feature.xml";
pub const PLUGIN_XML: &str = "plugin.xml";
pub const FRAGMENT_XML: &str = "fragment.xml";

/// Scans `<site>/install/features/*/feature.xml`.
///
/// Returns an empty list for non-`file:` URLs.
pub fn detect_features(site: &Url) -> Vec<String> {
    let Some(root) = local_root(site, FEATURES_DIR) else {
        return Vec::new();
    };
    scan(&root, FEATURES_DIR, &[FEATURE_XML])
}

/// Scans `<site>/plugins/*/plugin.xml`, accepting `fragment.xml` when a
/// directory has no `plugin.xml`.
///
/// Returns an empty list for non-`file:` URLs.
pub fn detect_plugins(site: &Url) -> Vec<String> {
    let Some(root) = local_root(site, PLUGINS_DIR) else {
        return Vec::new();
    };
    scan(&root, PLUGINS_DIR, &[PLUGIN_XML, FRAGMENT_XML])
}

fn local_root(site: &Url, relative: &str) -> Option<PathBuf> {
    if site.scheme() != "file" {
        return None;
    }
    let base = site.to_file_path().ok()?;
    Some(relative.split('/').fold(base, |p, seg| p.join(seg)))
}

/// Lists `<root>/<dir>/<descriptor>` for the first descriptor name that
/// exists in each child directory.
fn scan(root: &Path, prefix: &str, descriptors: &[&str]) -> Vec<String> {
    let Ok(children) = std::fs::read_dir(root) else {
        trace!("no descriptor root at {}", root.display());
        return Vec::new();
    };

    let mut found: Vec<String> = children
        .filter_map(Result::ok)
        .filter_map(|child| {
            let name = child.file_name().to_string_lossy().into_owned();
            descriptors
                .iter()
                .find(|d| child.path().join(d).exists())
                .map(|d| format!("{prefix}/{name}/{d}"))
        })
        .collect();
    found.sort();
    found
}
