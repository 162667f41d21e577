//! Turns user-supplied locations into URLs.
//!
//! Command-line arguments may be URLs (`file:///opt/app/`, `http://...`) or
//! plain paths (`./install/platform.cfg`, `C:\app`).  Relative paths are
//! resolved against the current directory.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

/// What the location points at.  Site locations are directories and get a
/// trailing `/`; configuration locations are files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Directory,
    File,
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("{0} cannot be expressed as a file URL")]
    NotRepresentable(PathBuf),
}

/// Parses `arg` as a URL, or as a file system path when it is not one.
///
/// Single-letter schemes are treated as Windows drive letters.  A directory
/// URL always ends with `/`, so relative joins land inside it.
///
/// # Errors
///
/// Returns [`LocationError`] when a path cannot be made absolute or converted.
pub fn resolve_location(arg: &str, kind: LocationKind) -> Result<Url, LocationError> {
    if let Ok(mut url) = Url::parse(arg) {
        if url.scheme().len() > 1 {
            if kind == LocationKind::Directory && !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            return Ok(url);
        }
    }

    let path = Path::new(arg);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(LocationError::CurrentDir)?
            .join(path)
    };

    let url = match kind {
        LocationKind::Directory => Url::from_directory_path(&absolute),
        LocationKind::File => Url::from_file_path(&absolute),
    };
    url.map_err(|()| LocationError::NotRepresentable(absolute))
}
