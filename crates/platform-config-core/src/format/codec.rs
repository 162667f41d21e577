//! Codec for `platform.cfg`, the persisted site configuration.
//!
//! File layout:
//! ```text
//! version=1.0
//! site.<i>.url=<absolute-url>
//! site.<i>.policy=<USER-INCLUDE|USER-EXCLUDE|SITE-INCLUDE>
//! site.<i>.list.<j>=<up to 10 comma-separated identifiers>
//! ...
//! eof=eof
//! ```
//! `<i>` is 0-based and contiguous.  `list.<j>` lines only appear for a
//! non-empty policy list.  `eof=eof` is always the last line; a file without it
//! was not written completely.
//!
//! Decoding is lenient at the site level:
//!
//! | Input                         | Result                                   |
//! |-------------------------------|------------------------------------------|
//! | `site.<i>.url` missing        | enumeration stops at `i`                 |
//! | `site.<i>.url` not a URL      | enumeration stops at `i`                 |
//! | `site.<i>.policy` missing     | default policy (`USER-EXCLUDE`, empty)   |
//! | `site.<i>.policy` unknown     | default policy (`USER-EXCLUDE`, empty)   |
//!
//! The `eof` check is left to the caller (see [`is_complete`]) so that the
//! store can report the file location in its error.

use std::io::{self, Write};

use tracing::debug;
use url::Url;

use crate::domain::site::{PolicyType, SiteEntry, SitePolicy};
use crate::format::properties::{write_attribute, PropertySet};

pub const CFG_VERSION: &str = "version";
pub const VERSION: &str = "1.0";
pub const CFG_SITE: &str = "site";
pub const CFG_URL: &str = "url";
pub const CFG_POLICY: &str = "policy";
pub const CFG_LIST: &str = "list";
pub const EOF: &str = "eof";

/// Maximum number of identifiers written on one `list.<j>` line.
pub const LIST_CHUNK_LEN: usize = 10;

// ── List wrapping ─────────────────────────────────────────────────────────────

/// Joins `items` with commas, starting a new segment every `chunk_len` items.
///
/// An empty slice yields no segments.  `chunk_len` must be non-zero.
pub fn chunk_list(items: &[String], chunk_len: usize) -> Vec<String> {
    items.chunks(chunk_len).map(|chunk| chunk.join(",")).collect()
}

/// Reverses [`chunk_list`]: splits every segment on commas, trims each token,
/// and drops empty tokens.
pub fn join_list_segments<'a, I>(segments: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    segments
        .into_iter()
        .flat_map(|segment| segment.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Writes `sites` in the order given, followed by the `eof` marker.
///
/// The marker is written even when `sites` is empty.
///
/// # Errors
///
/// Propagates any error from the underlying writer.
pub fn write_configuration<'a, W, I>(w: &mut W, sites: I) -> io::Result<()>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a SiteEntry>,
{
    write_attribute(w, CFG_VERSION, VERSION)?;
    for (i, entry) in sites.into_iter().enumerate() {
        write_site(w, &format!("{CFG_SITE}.{i}"), entry)?;
    }
    write_attribute(w, EOF, EOF)
}

/// Convenience wrapper around [`write_configuration`] producing a `String`.
pub fn encode_configuration<'a, I>(sites: I) -> String
where
    I: IntoIterator<Item = &'a SiteEntry>,
{
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_configuration(&mut buf, sites);
    String::from_utf8_lossy(&buf).into_owned()
}

fn write_site<W: Write + ?Sized>(w: &mut W, id: &str, entry: &SiteEntry) -> io::Result<()> {
    let policy = entry.site_policy();
    write_attribute(w, &format!("{id}.{CFG_URL}"), entry.url().as_str())?;
    write_attribute(w, &format!("{id}.{CFG_POLICY}"), policy.policy_type().token())?;
    write_list(w, &format!("{id}.{CFG_LIST}"), policy.list())
}

fn write_list<W: Write + ?Sized>(w: &mut W, id: &str, list: &[String]) -> io::Result<()> {
    for (j, segment) in chunk_list(list, LIST_CHUNK_LEN).iter().enumerate() {
        write_attribute(w, &format!("{id}.{j}"), segment)?;
    }
    Ok(())
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Returns `true` when the property set carries the `eof=eof` marker.
pub fn is_complete(props: &PropertySet) -> bool {
    props.get(EOF) == Some(EOF)
}

/// Reads `site.0`, `site.1`, ... until the first index that does not yield a
/// site.  Duplicates are returned as found; callers decide which one wins.
pub fn decode_sites(props: &PropertySet) -> Vec<SiteEntry> {
    (0..)
        .map_while(|i| decode_site(props, &format!("{CFG_SITE}.{i}")))
        .collect()
}

/// Decodes a single site rooted at `name` (e.g. `site.3`).
///
/// Returns `None` when the URL is missing or malformed.
pub fn decode_site(props: &PropertySet, name: &str) -> Option<SiteEntry> {
    let raw_url = props.attribute(&format!("{name}.{CFG_URL}"))?;
    let url = match Url::parse(raw_url) {
        Ok(url) => url,
        Err(e) => {
            debug!("{name}: malformed site URL {raw_url:?} ({e}); stopping site enumeration");
            return None;
        }
    };

    let policy = match props.attribute(&format!("{name}.{CFG_POLICY}")) {
        None => SitePolicy::default(),
        Some(token) => match token.parse::<PolicyType>() {
            Ok(policy_type) => {
                SitePolicy::new(policy_type, decode_list(props, &format!("{name}.{CFG_LIST}")))
            }
            Err(e) => {
                debug!("{name}: {e}; using default policy");
                SitePolicy::default()
            }
        },
    };

    Some(SiteEntry::new(url, policy))
}

/// Concatenates `<name>.0`, `<name>.1`, ... up to the first missing segment.
fn decode_list(props: &PropertySet, name: &str) -> Vec<String> {
    let segments = (0..).map_while(|j| props.attribute(&format!("{name}.{j}")));
    join_list_segments(segments)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
