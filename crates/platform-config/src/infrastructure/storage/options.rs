//! TOML persistence for [`StoreOptions`].
//!
//! Example options file:
//!
//! ```toml
//! verbose_logging = true
//! ```
//!
//! A missing file is not an error: the defaults apply, exactly as on a first
//! run.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::application::options::StoreOptions;

/// Error type for options file operations.
#[derive(Debug, Error)]
pub enum OptionsError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing options at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse options TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads options from `path`, returning the defaults if the file does not
/// exist.
///
/// # Errors
///
/// Returns [`OptionsError::Io`] for file-system errors other than "not found",
/// and [`OptionsError::Parse`] if the TOML is malformed.
pub fn load_options(path: &Path) -> Result<StoreOptions, OptionsError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreOptions::default()),
        Err(source) => Err(OptionsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_options_returns_default_when_file_absent() {
        let dir = TempDir::new().unwrap();
        let options = load_options(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(options, StoreOptions::default());
        assert!(!options.verbose_logging);
    }

    #[test]
    fn test_empty_options_file_uses_defaults() {
        let options: StoreOptions = toml::from_str("").expect("empty TOML is valid");
        assert_eq!(options, StoreOptions::default());
    }

    #[test]
    fn test_load_options_reads_verbose_flag() {
        // Arrange
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "verbose_logging = true\n").unwrap();

        // Act
        let loaded = load_options(&path).unwrap();

        // Assert
        assert_eq!(loaded, StoreOptions::verbose());
    }

    #[test]
    fn test_load_options_invalid_toml_returns_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "verbose_logging = [[[").unwrap();

        assert!(matches!(load_options(&path), Err(OptionsError::Parse(_))));
    }
}
