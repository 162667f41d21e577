//! `platform-config` command-line tool.
//!
//! Inspects and edits `platform.cfg` site configurations.
//!
//! ```text
//! platform-config init   [--install <dir|url>] [--save]
//! platform-config show   --config <file|url> [--json]
//! platform-config add    --config <file|url> --site <dir|url>
//!                        [--policy TOKEN] [--list a,b] [--replace]
//! platform-config remove --config <file|url> --site <dir|url>
//! platform-config detect --site <dir|url>
//! ```
//!
//! Diagnostics go to stderr through `tracing`; `RUST_LOG` overrides the level.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use platform_config::application::store::{ConfigError, ConfigurationStore};
use platform_config::infrastructure::install::{EnvInstallLocation, FixedInstallLocation};
use platform_config::infrastructure::storage::location::{resolve_location, LocationKind};
use platform_config::infrastructure::storage::options::load_options;
use platform_config::infrastructure::streams::FileStreams;
use platform_config::StoreOptions;
use platform_config_core::{detect_features, detect_plugins, PolicyType, SiteEntry, SitePolicy};

#[derive(Parser)]
#[command(version, about = "Inspect and edit platform site configurations")]
struct Cli {
    /// Log configuration load/save decisions at info level.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML file with store options.
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the configuration of an installation, or create the default one.
    Init {
        /// Install directory; defaults to PLATFORM_INSTALL_DIR or the
        /// executable's directory.
        #[arg(long)]
        install: Option<String>,

        /// Write the configuration back to its location.
        #[arg(long)]
        save: bool,
    },
    /// Print the sites of a configuration file.
    Show {
        #[arg(long)]
        config: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Add a site to a configuration file (created if missing).
    Add {
        #[arg(long)]
        config: String,

        #[arg(long)]
        site: String,

        /// USER-INCLUDE, USER-EXCLUDE or SITE-INCLUDE.
        #[arg(long, default_value = "USER-EXCLUDE")]
        policy: String,

        /// Comma-separated identifiers for the policy.
        #[arg(long, value_delimiter = ',')]
        list: Vec<String>,

        /// Replace an existing entry for the same site.
        #[arg(long)]
        replace: bool,
    },
    /// Remove a site from a configuration file.
    Remove {
        #[arg(long)]
        config: String,

        #[arg(long)]
        site: String,
    },
    /// List feature and plugin descriptors found on a local site.
    Detect {
        #[arg(long)]
        site: String,
    },
}

/// Printable view of one site.
#[derive(Serialize)]
struct SiteReport<'a> {
    url: &'a Url,
    policy: &'a SitePolicy,
    features: &'a [String],
    plugins: &'a [String],
}

impl<'a> SiteReport<'a> {
    fn new(entry: &'a SiteEntry) -> Self {
        Self {
            url: entry.url(),
            policy: entry.site_policy(),
            features: entry.detected_features(),
            plugins: entry.detected_plugins(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut options = match &cli.options {
        Some(path) => load_options(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => StoreOptions::default(),
    };
    options.verbose_logging |= cli.verbose;

    match cli.command {
        Command::Init { install, save } => init(install.as_deref(), save, options),
        Command::Show { config, json } => show(&config, json, options),
        Command::Add {
            config,
            site,
            policy,
            list,
            replace,
        } => add(&config, &site, &policy, list, replace, options),
        Command::Remove { config, site } => remove(&config, &site, options),
        Command::Detect { site } => detect(&site),
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn init(install: Option<&str>, save: bool, options: StoreOptions) -> Result<()> {
    let store = match install {
        Some(arg) => {
            let url = resolve_location(arg, LocationKind::Directory)?;
            ConfigurationStore::initialize_current(
                &FixedInstallLocation::new(url),
                FileStreams,
                options,
            )
        }
        None => ConfigurationStore::initialize_current(&EnvInstallLocation, FileStreams, options),
    }
    .context("initializing configuration")?;

    print_sites(&store, false)?;
    if save {
        store.save().context("saving configuration")?;
        if let Some(location) = store.configuration_location() {
            info!("configuration written to {location}");
        }
    }
    Ok(())
}

fn show(config: &str, json: bool, options: StoreOptions) -> Result<()> {
    let location = resolve_location(config, LocationKind::File)?;
    let store = ConfigurationStore::open(location.clone(), FileStreams, options)
        .with_context(|| format!("loading {location}"))?;
    print_sites(&store, json)
}

fn add(
    config: &str,
    site: &str,
    policy: &str,
    list: Vec<String>,
    replace: bool,
    options: StoreOptions,
) -> Result<()> {
    let mut store = open_or_empty(config, options)?;
    let url = resolve_location(site, LocationKind::Directory)?;
    let policy_type: PolicyType = policy.parse()?;
    let entry = store.create_site_entry(url.clone(), SitePolicy::new(policy_type, list));

    if store.configure_site(entry, replace) {
        store.save().context("saving configuration")?;
        info!("configured {url}");
    } else {
        info!("{url} is already configured; use --replace to overwrite it");
    }
    Ok(())
}

fn remove(config: &str, site: &str, options: StoreOptions) -> Result<()> {
    let location = resolve_location(config, LocationKind::File)?;
    let mut store = ConfigurationStore::open(location.clone(), FileStreams, options)
        .with_context(|| format!("loading {location}"))?;
    let url = resolve_location(site, LocationKind::Directory)?;

    let target = store.create_site_entry(url.clone(), SitePolicy::default());
    if store.unconfigure_site(&target).is_some() {
        store.save().context("saving configuration")?;
        info!("removed {url}");
    } else {
        info!("{url} is not configured");
    }
    Ok(())
}

fn detect(site: &str) -> Result<()> {
    let url = resolve_location(site, LocationKind::Directory)?;
    for feature in detect_features(&url) {
        println!("feature {feature}");
    }
    for plugin in detect_plugins(&url) {
        println!("plugin  {plugin}");
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Opens `config`, or starts an empty store at that location when the file
/// does not exist yet.
fn open_or_empty(config: &str, options: StoreOptions) -> Result<ConfigurationStore<FileStreams>> {
    let location = resolve_location(config, LocationKind::File)?;
    match ConfigurationStore::open(location.clone(), FileStreams, options.clone()) {
        Ok(store) => Ok(store),
        Err(e) if e.is_not_found() => {
            let mut store = ConfigurationStore::new(FileStreams, options);
            store.set_configuration_location(location);
            Ok(store)
        }
        Err(e @ ConfigError::Incomplete { .. }) => {
            Err(e).context("refusing to overwrite an incomplete configuration")
        }
        Err(e) => Err(e).with_context(|| format!("loading {location}")),
    }
}

fn print_sites(store: &ConfigurationStore<FileStreams>, json: bool) -> Result<()> {
    let mut sites = store.configured_sites();
    sites.sort_by(|a, b| a.url().as_str().cmp(b.url().as_str()));
    let reports: Vec<SiteReport<'_>> = sites.into_iter().map(SiteReport::new).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        let policy = report.policy;
        println!("{}", report.url);
        println!("  policy:   {}", policy.policy_type());
        if !policy.list().is_empty() {
            println!("  list:     {}", policy.list().join(","));
        }
        println!("  features: {}", report.features.len());
        println!("  plugins:  {}", report.plugins.len());
    }
    Ok(())
}
