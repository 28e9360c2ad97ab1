//! Configuration for marquee.
//!
//! Values are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A config file. TOML, YAML or JSON, picked by extension. Defaults to
//!    `config.toml` in the platform config directory, which may be absent.
//! 3. Environment variables prefixed `MARQUEE_`, with `__` between nested
//!    keys: `MARQUEE_MOVIES__API_KEY=...` sets `movies.api_key`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "MARQUEE_";
const CONFIG_FILE: &str = "config.toml";
const STORE_FILE: &str = "collections.json";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "marquee")
}

/// Where the config file is looked for when none is given explicitly.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn default_store_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join(STORE_FILE),
        None => PathBuf::from(STORE_FILE),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The collections document.
    pub store_path: PathBuf,
    pub library: LibraryConfig,
    pub movies: AcquisitionConfig,
    pub shows: AcquisitionConfig,
    pub discovery: DiscoveryConfig,
    pub http: HttpConfig,
    pub monitor: MonitorConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            library: LibraryConfig::default(),
            movies: AcquisitionConfig {
                url: "http://127.0.0.1:7878".to_string(),
                api_key: String::new(),
                root_folder: "/movies".to_string(),
                quality_profile: 1,
            },
            shows: AcquisitionConfig {
                url: "http://127.0.0.1:8989".to_string(),
                api_key: String::new(),
                root_folder: "/tv".to_string(),
                quality_profile: 1,
            },
            discovery: DiscoveryConfig::default(),
            http: HttpConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

/// The media server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub url: String,
    pub token: String,
    /// Name of the library section holding movies.
    pub movie_section: String,
    /// Name of the library section holding shows.
    pub show_section: String,
}
impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:32400".to_string(),
            token: String::new(),
            movie_section: "Movies".to_string(),
            show_section: "TV Shows".to_string(),
        }
    }
}

/// A movie or show acquisition service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Leave blank to disable the service.
    pub url: String,
    pub api_key: String,
    pub root_folder: String,
    pub quality_profile: u32,
}
impl AcquisitionConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// API client id. Discovery is unavailable without one.
    pub client_id: String,
    pub url: String,
}
impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { client_id: String::new(), url: "https://api.trakt.tv".to_string() }
    }
}
impl DiscoveryConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Applies to each request separately.
    pub timeout_secs: u64,
}
impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}
impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub auto_scan_minutes: u64,
}
impl Default for MonitorConfig {
    fn default() -> Self {
        Self { auto_scan_minutes: 10 }
    }
}
impl MonitorConfig {
    pub fn auto_scan_interval(&self) -> Duration {
        Duration::from_secs(self.auto_scan_minutes * 60)
    }
}

impl Config {
    /// Loads from `path`, or from [`default_config_path`] when `None`.
    ///
    /// An explicitly given file must exist; the default one may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = match path {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::Invalid(format!("config file not found: {}", path.display())));
                }
                Self::figment(Some(path))?
            },
            None => Self::figment(default_config_path().as_deref().filter(|p| p.is_file()))?,
        };
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            let extension = file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                Some("json") => figment.merge(Json::file(file)),
                _ => exn::bail!(ErrorKind::Invalid(format!("unsupported config format: {}", file.display()))),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("http.timeout_secs must be greater than zero".to_string()));
        }
        if self.monitor.auto_scan_minutes == 0 {
            exn::bail!(ErrorKind::Invalid("monitor.auto_scan_minutes must be greater than zero".to_string()));
        }
        if self.library.url.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("library.url is required".to_string()));
        }
        Ok(())
    }
}
