//! The configuration store: the set of configured sites and its persistence.
//!
//! A [`ConfigurationStore`] maps site URLs to [`SiteEntry`] values.  It is
//! filled either by loading a `platform.cfg` file or by synthesizing the
//! default configuration for the current installation, then mutated with
//! [`ConfigurationStore::configure_site`] /
//! [`ConfigurationStore::unconfigure_site`] and written back with
//! [`ConfigurationStore::save`].
//!
//! # Integrity marker
//!
//! Every save ends with `eof=eof`.  A load that does not find that pair fails
//! with [`ConfigError::Incomplete`] instead of silently accepting a file whose
//! write was interrupted.
//!
//! # Threading
//!
//! The store does no locking.  Mutation goes through `&mut self`, so sharing
//! it between threads requires an external `Mutex`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};

use platform_config_core::format::codec::{decode_sites, is_complete, write_configuration};
use platform_config_core::{PolicyError, PropertySet, SiteEntry, SitePolicy};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::options::StoreOptions;
use super::ports::{InstallLocation, InstallLocationError, StreamError, StreamMode, StreamOpener};

/// Directory below the install root that holds the configuration file.
pub const INSTALL_DIR: &str = "install";
/// Name of the configuration file.
pub const CONFIG_FILE: &str = "platform.cfg";

/// Error type for configuration store operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `save()` was called on a store that has no configuration location.
    #[error("unable to {action} configuration: no location set")]
    MissingLocation { action: &'static str },

    /// A stream could not be opened, read, or written.
    #[error("I/O error accessing configuration at {url}: {source}")]
    Io {
        url: Url,
        #[source]
        source: io::Error,
    },

    /// The file was found but does not end with the `eof=eof` marker.
    #[error("incomplete configuration file {url}")]
    Incomplete { url: Url },

    /// The stream opener does not support this direction for the URL, and no
    /// fallback applies.
    #[error("{mode} streams are not supported for {url}")]
    Unsupported { url: Url, mode: StreamMode },

    /// The configuration location could not be derived from the install URL.
    #[error("cannot derive configuration location from {base}: {source}")]
    Location {
        base: Url,
        #[source]
        source: url::ParseError,
    },

    /// The install location could not be determined.
    #[error(transparent)]
    InstallLocation(#[from] InstallLocationError),
}

impl ConfigError {
    fn io(url: &Url, source: io::Error) -> Self {
        Self::Io {
            url: url.clone(),
            source,
        }
    }

    fn stream(url: &Url, err: StreamError) -> Self {
        match err {
            StreamError::Unsupported { mode, .. } => Self::Unsupported {
                url: url.clone(),
                mode,
            },
            StreamError::Io(source) => Self::io(url, source),
        }
    }

    /// Returns `true` when the error means "there is no file at this URL".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Conventional location of the configuration file for an installation:
/// `<install>/install/platform.cfg`.
///
/// # Errors
///
/// Returns [`ConfigError::Location`] if `install` cannot serve as a base URL.
pub fn default_config_location(install: &Url) -> Result<Url, ConfigError> {
    install
        .join(&format!("{INSTALL_DIR}/{CONFIG_FILE}"))
        .map_err(|source| ConfigError::Location {
            base: install.clone(),
            source,
        })
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// In-memory set of configured sites, keyed by URL.
#[derive(Debug)]
pub struct ConfigurationStore<S> {
    sites: HashMap<Url, SiteEntry>,
    config_location: Option<Url>,
    streams: S,
    options: StoreOptions,
}

impl<S: StreamOpener> ConfigurationStore<S> {
    /// Creates an empty store with no configuration location.
    pub fn new(streams: S, options: StoreOptions) -> Self {
        Self {
            sites: HashMap::new(),
            config_location: None,
            streams,
            options,
        }
    }

    /// Creates a store from the file at `url` and remembers `url` as the
    /// configuration location.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::load`].
    pub fn open(url: Url, streams: S, options: StoreOptions) -> Result<Self, ConfigError> {
        let mut store = Self::new(streams, options);
        store.load(&url)?;
        store.config_location = Some(url);
        Ok(store)
    }

    /// Creates a store for the current installation.
    ///
    /// Loads `<install>/install/platform.cfg` when it exists and is complete;
    /// otherwise falls back to [`Self::setup_default_configuration`].
    ///
    /// # Errors
    ///
    /// Returns install-location errors, and load errors other than a missing or
    /// incomplete file.
    pub fn initialize_current(
        install: &dyn InstallLocation,
        streams: S,
        options: StoreOptions,
    ) -> Result<Self, ConfigError> {
        let mut store = Self::new(streams, options);
        let install_url = install.install_url()?;
        let location = default_config_location(&install_url)?;

        match store.load(&location) {
            Ok(()) => store.config_location = Some(location),
            Err(e) if e.is_not_found() => {
                store.diagnostic(format_args!("no configuration at {location}"));
                store.apply_default(install_url, location);
            }
            Err(ConfigError::Incomplete { url }) => {
                warn!("ignoring incomplete configuration file {url}");
                store.apply_default(install_url, location);
            }
            Err(e) => return Err(e),
        }
        Ok(store)
    }

    // ── Factories ─────────────────────────────────────────────────────────────

    pub fn create_site_entry(&self, url: Url, policy: SitePolicy) -> SiteEntry {
        SiteEntry::new(url, policy)
    }

    /// Builds a policy from a numeric type code (0, 1 or 2).
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnknownCode`] for any other code.
    pub fn create_site_policy(
        &self,
        code: i32,
        list: Vec<String>,
    ) -> Result<SitePolicy, PolicyError> {
        SitePolicy::from_code(code, list)
    }

    // ── Site registry ─────────────────────────────────────────────────────────

    /// Registers `entry` under its URL.
    ///
    /// When an entry already exists for the URL it is kept unless `replace` is
    /// `true`.  Returns `true` when `entry` was stored.
    pub fn configure_site(&mut self, entry: SiteEntry, replace: bool) -> bool {
        match self.sites.entry(entry.url().clone()) {
            Entry::Occupied(mut existing) if replace => {
                existing.insert(entry);
                true
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
        }
    }

    /// Removes the entry with the same URL as `entry`, if any.
    pub fn unconfigure_site(&mut self, entry: &SiteEntry) -> Option<SiteEntry> {
        self.sites.remove(entry.url())
    }

    /// All configured entries, in no particular order.
    pub fn configured_sites(&self) -> Vec<&SiteEntry> {
        self.sites.values().collect()
    }

    pub fn find_configured_site(&self, url: &Url) -> Option<&SiteEntry> {
        self.sites.get(url)
    }

    // ── Location ──────────────────────────────────────────────────────────────

    pub fn configuration_location(&self) -> Option<&Url> {
        self.config_location.as_ref()
    }

    pub fn set_configuration_location(&mut self, url: Url) {
        self.config_location = Some(url);
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Reads the configuration file at `url` and registers its sites.
    ///
    /// Sites are added with `replace == false`: entries already in the store,
    /// and the first of several entries with the same URL, win.  Text that is
    /// not valid UTF-8 is read as ISO-8859-1.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Io`] if the stream cannot be opened or read.
    /// - [`ConfigError::Unsupported`] if the opener cannot read `url`.
    /// - [`ConfigError::Incomplete`] if the `eof=eof` marker is missing.
    pub fn load(&mut self, url: &Url) -> Result<(), ConfigError> {
        let mut bytes = Vec::new();
        {
            let mut reader = self
                .streams
                .open_read(url)
                .map_err(|e| ConfigError::stream(url, e))?;
            reader
                .read_to_end(&mut bytes)
                .map_err(|e| ConfigError::io(url, e))?;
        }

        let props = PropertySet::from_bytes(&bytes);
        if !is_complete(&props) {
            self.diagnostic(format_args!("skipping incomplete configuration file {url}"));
            return Err(ConfigError::Incomplete { url: url.clone() });
        }
        self.diagnostic(format_args!("using configuration file {url}"));

        for entry in decode_sites(&props) {
            if !self.configure_site(entry, false) {
                debug!("duplicate site in {url}; keeping the first entry");
            }
        }
        Ok(())
    }

    /// Saves to the configuration location.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingLocation`] when no location is set, otherwise any
    /// error from [`Self::save_to`].
    pub fn save(&self) -> Result<(), ConfigError> {
        let url = self
            .config_location
            .as_ref()
            .ok_or(ConfigError::MissingLocation { action: "save" })?;
        self.save_to(url)
    }

    /// Writes every configured site to `url`, followed by `eof=eof`.
    ///
    /// When the stream opener reports output as unsupported and `url` is a
    /// `file:` URL, the file is written directly (parent directories are
    /// created).  The output stream is closed on every path out of this call.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Unsupported`] for unsupported non-`file:` URLs.
    /// - [`ConfigError::Io`] for open, write, or flush failures.
    pub fn save_to(&self, url: &Url) -> Result<(), ConfigError> {
        let sink: Box<dyn Write> = match self.streams.open_write(url) {
            Ok(sink) => sink,
            Err(StreamError::Unsupported { .. }) if url.scheme() == "file" => {
                self.diagnostic(format_args!("writing {url} directly to the file system"));
                Box::new(create_file(url)?)
            }
            Err(e) => return Err(ConfigError::stream(url, e)),
        };

        let mut w = BufWriter::new(sink);
        write_configuration(&mut w, self.sites.values())
            .and_then(|()| w.flush())
            .map_err(|e| ConfigError::io(url, e))?;

        self.diagnostic(format_args!("saved {} site(s) to {url}", self.sites.len()));
        Ok(())
    }

    /// Configures exactly one site, the installation itself, with the default
    /// policy (`USER-EXCLUDE`, empty list), and points the configuration
    /// location at `<install>/install/platform.cfg`.
    ///
    /// # Errors
    ///
    /// Install-location errors, or [`ConfigError::Location`].
    pub fn setup_default_configuration(
        &mut self,
        install: &dyn InstallLocation,
    ) -> Result<(), ConfigError> {
        let install_url = install.install_url()?;
        let location = default_config_location(&install_url)?;
        self.apply_default(install_url, location);
        Ok(())
    }

    fn apply_default(&mut self, install_url: Url, location: Url) {
        self.configure_site(SiteEntry::new(install_url, SitePolicy::default()), false);
        self.diagnostic(format_args!("creating default configuration {location}"));
        self.config_location = Some(location);
    }

    fn diagnostic(&self, args: fmt::Arguments<'_>) {
        if self.options.verbose_logging {
            info!("{args}");
        } else {
            debug!("{args}");
        }
    }
}

fn create_file(url: &Url) -> Result<File, ConfigError> {
    let path = url.to_file_path().map_err(|()| {
        ConfigError::io(
            url,
            io::Error::new(io::ErrorKind::InvalidInput, "not a local file path"),
        )
    })?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| ConfigError::io(url, e))?;
    }
    File::create(&path).map_err(|e| ConfigError::io(url, e))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockInstallLocation;
    use crate::infrastructure::streams::mock::MemoryStreams;
    use platform_config_core::PolicyType;

    fn url(s: &str) -> Url {
        Url::parse(s).expect("valid url")
    }

    fn entry(s: &str, policy_type: PolicyType, list: &[&str]) -> SiteEntry {
        SiteEntry::new(
            url(s),
            SitePolicy::new(policy_type, list.iter().map(|s| s.to_string()).collect()),
        )
    }

    fn store() -> ConfigurationStore<MemoryStreams> {
        ConfigurationStore::new(MemoryStreams::new(), StoreOptions::default())
    }

    fn install_at(s: &'static str) -> MockInstallLocation {
        let mut install = MockInstallLocation::new();
        install.expect_install_url().returning(move || Ok(url(s)));
        install
    }

    // ── configure / unconfigure ───────────────────────────────────────────────

    #[test]
    fn test_configure_site_twice_without_replace_keeps_first() {
        // Arrange
        let mut store = store();
        let first = entry("file:///a/", PolicyType::UserInclude, &["x"]);
        let second = entry("file:///a/", PolicyType::SiteInclude, &[]);

        // Act
        assert!(store.configure_site(first.clone(), false));
        let stored = store.configure_site(second, false);

        // Assert
        assert!(!stored);
        assert_eq!(store.configured_sites().len(), 1);
        assert_eq!(store.find_configured_site(&url("file:///a/")), Some(&first));
    }

    #[test]
    fn test_configure_site_with_replace_overwrites_policy() {
        let mut store = store();
        store.configure_site(entry("file:///a/", PolicyType::UserInclude, &["x"]), false);

        let replacement = entry("file:///a/", PolicyType::SiteInclude, &["y", "z"]);
        assert!(store.configure_site(replacement.clone(), true));

        let found = store.find_configured_site(&url("file:///a/")).unwrap();
        assert_eq!(found, &replacement);
        assert_eq!(found.site_policy().policy_type(), PolicyType::SiteInclude);
    }

    #[test]
    fn test_unconfigure_site_removes_matching_url_only() {
        let mut store = store();
        store.configure_site(entry("file:///a/", PolicyType::UserExclude, &[]), false);
        store.configure_site(entry("file:///b/", PolicyType::UserExclude, &[]), false);

        // A different policy on the lookup entry does not matter; only the URL does.
        let target = entry("file:///a/", PolicyType::SiteInclude, &[]);
        let removed = store.unconfigure_site(&target);

        assert!(removed.is_some());
        assert!(store.find_configured_site(&url("file:///a/")).is_none());
        assert!(store.find_configured_site(&url("file:///b/")).is_some());
    }

    #[test]
    fn test_unconfigure_absent_site_is_noop() {
        let mut store = store();
        let removed = store.unconfigure_site(&entry("file:///a/", PolicyType::UserExclude, &[]));
        assert!(removed.is_none());
        assert!(store.configured_sites().is_empty());
    }

    #[test]
    fn test_create_site_policy_rejects_unknown_code() {
        let store = store();
        assert!(store.create_site_policy(1, Vec::new()).is_ok());
        assert_eq!(
            store.create_site_policy(9, Vec::new()),
            Err(PolicyError::UnknownCode(9))
        );
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_missing_eof_marker_is_incomplete() {
        // Arrange
        let streams = MemoryStreams::new();
        let location = url("mem://cfg/platform.cfg");
        streams.insert(&location, "version=1.0\nsite.0.url=file:///a/\n");
        let mut store = ConfigurationStore::new(streams, StoreOptions::default());

        // Act
        let result = store.load(&location);

        // Assert
        assert!(matches!(result, Err(ConfigError::Incomplete { .. })));
        assert!(store.configured_sites().is_empty(), "nothing is registered");
    }

    #[test]
    fn test_load_missing_file_is_io_not_found() {
        let mut store = store();
        let err = store.load(&url("mem://cfg/absent.cfg")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_duplicate_urls_first_occurrence_wins() {
        let streams = MemoryStreams::new();
        let location = url("mem://cfg/platform.cfg");
        streams.insert(
            &location,
            "site.0.url=file:///a/\n\
             site.0.policy=USER-INCLUDE\n\
             site.1.url=file:///a/\n\
             site.1.policy=SITE-INCLUDE\n\
             eof=eof\n",
        );
        let mut store = ConfigurationStore::new(streams, StoreOptions::default());

        store.load(&location).unwrap();

        let found = store.find_configured_site(&url("file:///a/")).unwrap();
        assert_eq!(found.site_policy().policy_type(), PolicyType::UserInclude);
        assert_eq!(store.configured_sites().len(), 1);
    }

    #[test]
    fn test_load_does_not_replace_existing_entries() {
        let streams = MemoryStreams::new();
        let location = url("mem://cfg/platform.cfg");
        streams.insert(&location, "site.0.url=file:///a/\nsite.0.policy=SITE-INCLUDE\neof=eof\n");
        let mut store = ConfigurationStore::new(streams, StoreOptions::default());
        store.configure_site(entry("file:///a/", PolicyType::UserInclude, &[]), false);

        store.load(&location).unwrap();

        let found = store.find_configured_site(&url("file:///a/")).unwrap();
        assert_eq!(found.site_policy().policy_type(), PolicyType::UserInclude);
    }

    // ── save ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_save_without_location_fails() {
        let store = store();
        assert!(matches!(
            store.save(),
            Err(ConfigError::MissingLocation { action: "save" })
        ));
    }

    #[test]
    fn test_save_then_open_round_trips_sites() {
        // Arrange
        let streams = MemoryStreams::new();
        let location = url("mem://cfg/platform.cfg");
        let mut store = ConfigurationStore::new(streams.clone(), StoreOptions::default());
        store.configure_site(entry("file:///a/", PolicyType::UserInclude, &["p1", "p2"]), false);
        store.configure_site(entry("http://example.com/s/", PolicyType::SiteInclude, &[]), false);
        store.set_configuration_location(location.clone());

        // Act
        store.save().unwrap();
        let reopened =
            ConfigurationStore::open(location.clone(), streams, StoreOptions::default()).unwrap();

        // Assert
        assert_eq!(reopened.configured_sites().len(), 2);
        assert_eq!(
            reopened.find_configured_site(&url("file:///a/")),
            store.find_configured_site(&url("file:///a/"))
        );
        assert_eq!(reopened.configuration_location(), Some(&location));
    }

    #[test]
    fn test_save_empty_store_still_writes_eof() {
        let streams = MemoryStreams::new();
        let location = url("mem://cfg/platform.cfg");
        let store = ConfigurationStore::new(streams.clone(), StoreOptions::default());

        store.save_to(&location).unwrap();

        assert_eq!(streams.contents(&location).unwrap(), "version=1.0\neof=eof\n");
    }

    #[test]
    fn test_save_unsupported_non_file_scheme_propagates() {
        let store = ConfigurationStore::new(MemoryStreams::read_only(), StoreOptions::default());
        let err = store.save_to(&url("http://example.com/platform.cfg")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Unsupported {
                mode: StreamMode::Write,
                ..
            }
        ));
    }

    #[test]
    fn test_save_closes_writer_when_write_fails() {
        let streams = MemoryStreams::failing_writes();
        let store = ConfigurationStore::new(streams.clone(), StoreOptions::default());

        let result = store.save_to(&url("mem://cfg/platform.cfg"));

        assert!(matches!(result, Err(ConfigError::Io { .. })));
        assert_eq!(streams.closed_writer_count(), 1);
    }

    // ── default configuration ─────────────────────────────────────────────────

    #[test]
    fn test_setup_default_configuration_uses_install_location() {
        // Arrange
        let mut store = store();
        let install = install_at("file:///opt/platform/");

        // Act
        store.setup_default_configuration(&install).unwrap();

        // Assert
        let sites = store.configured_sites();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].url().as_str(), "file:///opt/platform/");
        assert_eq!(sites[0].site_policy().policy_type(), PolicyType::UserExclude);
        assert!(sites[0].site_policy().list().is_empty());
        assert_eq!(
            store.configuration_location().map(Url::as_str),
            Some("file:///opt/platform/install/platform.cfg")
        );
    }

    #[test]
    fn test_initialize_current_without_file_sets_up_default() {
        let install = install_at("mem://install/");

        let store = ConfigurationStore::initialize_current(
            &install,
            MemoryStreams::new(),
            StoreOptions::verbose(),
        )
        .unwrap();

        assert_eq!(store.configured_sites().len(), 1);
        assert_eq!(
            store.configuration_location().map(Url::as_str),
            Some("mem://install/install/platform.cfg")
        );
    }

    #[test]
    fn test_initialize_current_loads_existing_file() {
        let streams = MemoryStreams::new();
        streams.insert(
            &url("mem://install/install/platform.cfg"),
            "site.0.url=file:///elsewhere/\nsite.0.policy=USER-INCLUDE\neof=eof\n",
        );
        let install = install_at("mem://install/");

        let store =
            ConfigurationStore::initialize_current(&install, streams, StoreOptions::default())
                .unwrap();

        let sites = store.configured_sites();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].url().as_str(), "file:///elsewhere/");
    }

    #[test]
    fn test_initialize_current_ignores_incomplete_file() {
        let streams = MemoryStreams::new();
        streams.insert(
            &url("mem://install/install/platform.cfg"),
            "site.0.url=file:///elsewhere/\n",
        );
        let install = install_at("mem://install/");

        let store =
            ConfigurationStore::initialize_current(&install, streams, StoreOptions::default())
                .unwrap();

        let sites = store.configured_sites();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].url().as_str(), "mem://install/");
    }

    #[test]
    fn test_initialize_current_propagates_install_location_error() {
        let mut install = MockInstallLocation::new();
        install
            .expect_install_url()
            .returning(|| Err(InstallLocationError::NotAbsolute("relative".into())));

        let result = ConfigurationStore::initialize_current(
            &install,
            MemoryStreams::new(),
            StoreOptions::default(),
        );

        assert!(matches!(result, Err(ConfigError::InstallLocation(_))));
    }

    #[test]
    fn test_initialize_current_propagates_read_failure_without_default() {
        // Arrange: the file exists but cannot be read
        let streams = MemoryStreams::failing_reads();
        let install = install_at("mem://install/");

        // Act
        let result =
            ConfigurationStore::initialize_current(&install, streams, StoreOptions::default());

        // Assert
        let err = result.expect_err("a read failure must not fall back to the default");
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_load_reads_latin1_text() {
        let streams = MemoryStreams::new();
        let location = url("mem://cfg/platform.cfg");
        streams.insert_bytes(
            &location,
            b"site.0.url=file:///a/\n\
              site.0.policy=USER-INCLUDE\n\
              site.0.list.0=org.caf\xe9\n\
              eof=eof\n",
        );
        let mut store = ConfigurationStore::new(streams, StoreOptions::default());

        store.load(&location).unwrap();

        let found = store.find_configured_site(&url("file:///a/")).unwrap();
        assert_eq!(found.site_policy().list(), ["org.caf\u{e9}".to_string()]);
    }
}
