//! Stream openers for configuration files.
//!
//! [`FileStreams`] is the production opener.  It reads `file:` URLs and, like
//! a plain URL connection for local files, offers no output streams: every
//! write request is answered with [`StreamError::Unsupported`].  The store
//! reacts to that by writing `file:` URLs directly, so saving to a local
//! configuration still works while other schemes fail loudly.
//!
//! # Testability
//!
//! [`mock::MemoryStreams`] keeps files in memory and lets tests control how
//! writes behave.

use std::fs::File;
use std::io::{self, Read, Write};

use tracing::trace;
use url::Url;

use crate::application::ports::{StreamError, StreamMode, StreamOpener};

pub mod mock;

/// Opens local files addressed by `file:` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStreams;

impl StreamOpener for FileStreams {
    fn open_read(&self, url: &Url) -> Result<Box<dyn Read>, StreamError> {
        if url.scheme() != "file" {
            return Err(unsupported(url, StreamMode::Read));
        }
        let path = url.to_file_path().map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{url} is not a local file path"),
            )
        })?;
        trace!("opening {} for reading", path.display());
        Ok(Box::new(File::open(path)?))
    }

    fn open_write(&self, url: &Url) -> Result<Box<dyn Write>, StreamError> {
        Err(unsupported(url, StreamMode::Write))
    }
}

fn unsupported(url: &Url, mode: StreamMode) -> StreamError {
    StreamError::Unsupported {
        scheme: url.scheme().to_string(),
        mode,
    }
}
