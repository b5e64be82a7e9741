// Configuration: layered deploy settings. Precedence, highest first:
// command-line flags, environment variables, the TOML config file,
// defaults.
//
//     site = "my-site"
//     public = "dist"
//     credentials = "service-account.json"
//
//     [logging]
//     level = "info"

use crate::api::DEFAULT_API_BASE;
use crate::error::{DeployError, Result};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "firebase-deploy.toml";

pub const ENV_SITE: &str = "FIREBASE_SITE";
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_TOKEN: &str = "FIREBASE_TOKEN";
pub const ENV_API_URL: &str = "FIREBASE_HOSTING_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Hosting site name (`<site>.web.app`).
    #[serde(default)]
    pub site: Option<String>,

    /// Directory to deploy.
    #[serde(default)]
    pub public: Option<PathBuf>,

    /// Service-account key file.
    #[serde(default)]
    pub credentials: Option<PathBuf>,

    /// Pre-issued access token; used instead of `credentials` when set.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            site: None,
            public: None,
            credentials: None,
            token: None,
            api_base: default_api_base(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub site: Option<String>,
    pub public: Option<PathBuf>,
    pub credentials: Option<PathBuf>,
    pub token: Option<String>,
    pub api_base: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl DeployConfig {
    pub fn from_toml(data: &str) -> Result<Self> {
        toml::from_str(data).map_err(|e| DeployError::Config(e.to_string()))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
        let mut config = Self::from_toml(&data)?;
        // Relative paths in the file are relative to the file itself.
        if let Some(dir) = path.parent() {
            config.public = config.public.map(|p| dir.join(p));
            config.credentials = config.credentials.map(|p| dir.join(p));
        }
        Ok(config)
    }

    /// Load `explicit` if given, otherwise `firebase-deploy.toml` in `cwd`
    /// when it exists, otherwise defaults.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from_file(path),
            None => {
                let candidate = cwd.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::load_from_file(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply environment variables from `env` on top of the file values.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) {
        let get = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();
        if let Some(site) = get(ENV_SITE) {
            self.site = Some(site);
        }
        // A key path from a higher layer displaces a token from a lower
        // one; a token in the same layer still wins.
        if let Some(path) = get(ENV_CREDENTIALS) {
            self.credentials = Some(PathBuf::from(path));
            self.token = None;
        }
        if let Some(token) = get(ENV_TOKEN) {
            self.token = Some(token);
        }
        if let Some(url) = get(ENV_API_URL) {
            self.api_base = url;
        }
    }

    pub fn apply_overrides(&mut self, o: Overrides) {
        if o.site.is_some() {
            self.site = o.site;
        }
        if o.public.is_some() {
            self.public = o.public;
        }
        if o.credentials.is_some() {
            self.credentials = o.credentials;
            self.token = None;
        }
        if o.token.is_some() {
            self.token = o.token;
        }
        if let Some(url) = o.api_base {
            self.api_base = url;
        }
        if let Some(level) = o.log_level {
            self.logging.level = level;
        }
        if let Some(format) = o.log_format {
            self.logging.format = format;
        }
    }

    /// Fall back to `<config_dir>/firebase-deploy/service-account.json`
    /// when no credentials or token were configured.
    pub fn apply_default_credentials(&mut self) {
        if self.credentials.is_some() || self.token.is_some() {
            return;
        }
        if let Some(path) = default_credentials_path().filter(|p| p.is_file()) {
            self.credentials = Some(path);
        }
    }

    /// Settings required before any network call is made.
    pub fn validate(&self) -> Result<()> {
        match self.site.as_deref().map(str::trim) {
            None | Some("") => return Err(DeployError::Config("site name is required".into())),
            Some(_) => {}
        }
        if self.credentials.is_none() && self.token.is_none() {
            return Err(DeployError::Config(format!(
                "no credentials: pass --credentials, set {} or {}",
                ENV_CREDENTIALS, ENV_TOKEN
            )));
        }
        if self.api_base.trim().is_empty() {
            return Err(DeployError::Config("API base URL is empty".into()));
        }
        self.logging.validate()
    }
}

pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("firebase-deploy").join("service-account.json"))
}
