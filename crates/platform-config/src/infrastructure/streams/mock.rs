//! In-memory stream opener for tests.
//!
//! Files are kept in a shared map keyed by URL.  Written content becomes
//! visible when the writer is dropped, the way a closed file would, and every
//! dropped writer is counted so tests can check that streams are released.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use url::Url;

use crate::application::ports::{StreamError, StreamMode, StreamOpener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteBehavior {
    Accept,
    Unsupported,
    Fail,
}

/// A [`StreamOpener`] backed by memory.  Clones share the same files.
#[derive(Debug, Clone)]
pub struct MemoryStreams {
    files: Arc<Mutex<HashMap<Url, Vec<u8>>>>,
    closed_writers: Arc<Mutex<u32>>,
    writes: WriteBehavior,
    reads_fail: bool,
}

impl MemoryStreams {
    /// Creates an opener that accepts reads and writes for any URL.
    pub fn new() -> Self {
        Self::with_writes(WriteBehavior::Accept)
    }

    /// Creates an opener that reports every write as unsupported.
    pub fn read_only() -> Self {
        Self::with_writes(WriteBehavior::Unsupported)
    }

    /// Creates an opener whose writers fail on every write.
    pub fn failing_writes() -> Self {
        Self::with_writes(WriteBehavior::Fail)
    }

    /// Creates an opener whose reads fail with a permission error, whether or
    /// not a file is stored.
    pub fn failing_reads() -> Self {
        Self {
            reads_fail: true,
            ..Self::new()
        }
    }

    fn with_writes(writes: WriteBehavior) -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            closed_writers: Arc::new(Mutex::new(0)),
            writes,
            reads_fail: false,
        }
    }

    /// Stores `content` at `url`, replacing anything already there.
    pub fn insert(&self, url: &Url, content: &str) {
        self.insert_bytes(url, content.as_bytes());
    }

    /// Stores raw bytes at `url`, replacing anything already there.
    pub fn insert_bytes(&self, url: &Url, content: &[u8]) {
        self.files
            .lock()
            .expect("lock poisoned")
            .insert(url.clone(), content.to_vec());
    }

    /// Returns the content stored at `url`, if any.
    pub fn contents(&self, url: &Url) -> Option<String> {
        self.files
            .lock()
            .expect("lock poisoned")
            .get(url)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Number of writers that have been dropped.
    pub fn closed_writer_count(&self) -> u32 {
        *self.closed_writers.lock().expect("lock poisoned")
    }
}

impl Default for MemoryStreams {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamOpener for MemoryStreams {
    fn open_read(&self, url: &Url) -> Result<Box<dyn Read>, StreamError> {
        if self.reads_fail {
            let err = io::Error::new(io::ErrorKind::PermissionDenied, format!("{url} unreadable"));
            return Err(err.into());
        }
        let files = self.files.lock().expect("lock poisoned");
        match files.get(url) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(io::Error::new(io::ErrorKind::NotFound, format!("{url} not found")).into()),
        }
    }

    fn open_write(&self, url: &Url) -> Result<Box<dyn Write>, StreamError> {
        if self.writes == WriteBehavior::Unsupported {
            return Err(StreamError::Unsupported {
                scheme: url.scheme().to_string(),
                mode: StreamMode::Write,
            });
        }
        Ok(Box::new(MemorySink {
            url: url.clone(),
            buf: Vec::new(),
            fail: self.writes == WriteBehavior::Fail,
            files: Arc::clone(&self.files),
            closed_writers: Arc::clone(&self.closed_writers),
        }))
    }
}

struct MemorySink {
    url: Url,
    buf: Vec<u8>,
    fail: bool,
    files: Arc<Mutex<HashMap<Url, Vec<u8>>>>,
    closed_writers: Arc<Mutex<u32>>,
}

impl Write for MemorySink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        if !self.fail {
            if let Ok(mut files) = self.files.lock() {
                files.insert(self.url.clone(), std::mem::take(&mut self.buf));
            }
        }
        if let Ok(mut closed) = self.closed_writers.lock() {
            *closed += 1;
        }
    }
}
