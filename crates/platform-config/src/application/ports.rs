//! Boundaries between the configuration store and the outside world.
//!
//! The store never touches a socket or a file handle by itself.  It asks a
//! [`StreamOpener`] for byte streams and an [`InstallLocation`] for the root of
//! the current installation.  Production implementations live in
//! `infrastructure`; tests substitute in-memory or mocked ones.

use std::fmt;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Direction of a requested stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Read,
    Write,
}

impl fmt::Display for StreamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("input"),
            Self::Write => f.write_str("output"),
        }
    }
}

/// Error type for [`StreamOpener`] operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The opener cannot provide a stream in this direction for this scheme.
    #[error("{mode} streams are not supported for scheme {scheme:?}")]
    Unsupported { scheme: String, mode: StreamMode },

    /// The stream could not be opened.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Opens byte streams addressed by URL.
pub trait StreamOpener {
    /// Opens `url` for reading.
    fn open_read(&self, url: &Url) -> Result<Box<dyn Read>, StreamError>;

    /// Opens `url` for writing, truncating any previous content.
    ///
    /// Implementations that cannot write to `url` must return
    /// [`StreamError::Unsupported`] so that callers can choose a fallback.
    fn open_write(&self, url: &Url) -> Result<Box<dyn Write>, StreamError>;
}

/// Error type for [`InstallLocation`] lookups.
#[derive(Debug, Error)]
pub enum InstallLocationError {
    /// The configured install directory is relative.
    #[error("install directory {0} is not an absolute path")]
    NotAbsolute(PathBuf),

    /// The path of the running executable could not be determined.
    #[error("could not determine the running executable: {0}")]
    CurrentExe(#[source] io::Error),

    /// The executable path has no parent directory.
    #[error("executable path {0} has no parent directory")]
    NoParent(PathBuf),
}

/// Supplies the base URL of the current installation.
#[cfg_attr(test, mockall::automock)]
pub trait InstallLocation {
    fn install_url(&self) -> Result<Url, InstallLocationError>;
}
