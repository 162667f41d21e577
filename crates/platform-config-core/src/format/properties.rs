//! Flat `key=value` property text.
//!
//! The reader understands the subset of the classic properties format that
//! platform configuration files use:
//!
//! - one pair per line; the key ends at the first `=`, `:` or whitespace,
//!   so `key=value`, `key: value` and `key value` are equivalent;
//! - whitespace around the key and before the value is ignored;
//! - blank lines and lines starting with `#` or `!` are skipped;
//! - when a key repeats, the last occurrence wins;
//! - text that is not valid UTF-8 is read as ISO-8859-1 (see
//!   [`PropertySet::from_bytes`]).
//!
//! Escape sequences are neither produced nor interpreted.  A value containing a
//! newline cannot be represented, and the writer does not try to: it emits the
//! value verbatim, exactly as existing files expect.

use std::collections::HashMap;
use std::io::{self, Write};

/// An unordered set of properties read from a configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    values: HashMap<String, String>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses property text.  Lines without a separator define a key with an
    /// empty value.
    pub fn parse(text: &str) -> Self {
        let mut set = Self::new();
        for line in text.lines() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = split_pair(line);
            set.insert(key, value);
        }
        set
    }

    /// Parses raw file content: UTF-8 when valid, ISO-8859-1 otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::parse(text),
            Err(_) => Self::parse(&bytes.iter().map(|&b| char::from(b)).collect::<String>()),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw value as stored.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value with surrounding whitespace removed; this is how attributes are
    /// interpreted.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Splits a non-blank line into key and raw value.
///
/// Whitespace between key and separator is skipped, and so is whitespace
/// after it.  A whitespace-only separator is followed by at most one `=`/`:`.
fn split_pair(line: &str) -> (&str, &str) {
    let Some(end) = line.find(|c: char| c == '=' || c == ':' || c.is_whitespace()) else {
        return (line, "");
    };
    let rest = line[end..].trim_start();
    let value = rest.strip_prefix(['=', ':']).unwrap_or(rest).trim_start();
    (&line[..end], value)
}

/// Writes a single `key=value` line.
///
/// # Errors
///
/// Propagates any error from the underlying writer.
pub fn write_attribute<W: Write + ?Sized>(w: &mut W, key: &str, value: &str) -> io::Result<()> {
    writeln!(w, "{key}={}", escaped_value(value))
}

/// Values are written verbatim; see the module documentation.
fn escaped_value(value: &str) -> &str {
    value
}
