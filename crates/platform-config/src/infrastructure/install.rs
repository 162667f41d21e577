//! Install location providers.
//!
//! The install location is the directory the platform runs from.  It is the
//! site of the default configuration and the parent of `install/platform.cfg`.
//!
//! Resolution order for [`EnvInstallLocation`]:
//! 1. `PLATFORM_INSTALL_DIR`, when set;
//! 2. the directory containing the running executable.

use std::path::{Path, PathBuf};

use url::Url;

use crate::application::ports::{InstallLocation, InstallLocationError};

/// Environment variable overriding the install directory.
pub const INSTALL_DIR_ENV: &str = "PLATFORM_INSTALL_DIR";

/// Converts an absolute directory path to a `file:` URL with a trailing `/`,
/// so that relative joins land inside the directory.
///
/// # Errors
///
/// Returns [`InstallLocationError::NotAbsolute`] for relative paths.
pub fn directory_url(dir: &Path) -> Result<Url, InstallLocationError> {
    Url::from_directory_path(dir).map_err(|()| InstallLocationError::NotAbsolute(dir.to_path_buf()))
}

/// An install location fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedInstallLocation {
    url: Url,
}

impl FixedInstallLocation {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// # Errors
    ///
    /// Returns [`InstallLocationError::NotAbsolute`] for relative paths.
    pub fn from_dir(dir: &Path) -> Result<Self, InstallLocationError> {
        Ok(Self::new(directory_url(dir)?))
    }
}

impl InstallLocation for FixedInstallLocation {
    fn install_url(&self) -> Result<Url, InstallLocationError> {
        Ok(self.url.clone())
    }
}

/// Resolves the install location from the environment on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvInstallLocation;

impl InstallLocation for EnvInstallLocation {
    fn install_url(&self) -> Result<Url, InstallLocationError> {
        let dir = match std::env::var_os(INSTALL_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => executable_dir()?,
        };
        directory_url(&dir)
    }
}

fn executable_dir() -> Result<PathBuf, InstallLocationError> {
    let exe = std::env::current_exe().map_err(InstallLocationError::CurrentExe)?;
    let dir = exe.parent().map(Path::to_path_buf);
    dir.ok_or(InstallLocationError::NoParent(exe))
}
