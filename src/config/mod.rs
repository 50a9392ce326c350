//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::client::{ClientOptions, DEFAULT_TIMEOUT};
use crate::api::invoker::{RefreshPolicy, RetryPolicy};
use crate::auth::Credentials;

const ENV_CLIENT_ID: &str = "LHAPI_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "LHAPI_CLIENT_SECRET";
const ENV_BASE_URL: &str = "LHAPI_BASE_URL";

/// Application configuration
#[derive(Default, Serialize, Deserialize)]
pub struct Config {
    /// OAuth2 client id registered with the API
    pub client_id: Option<String>,
    /// OAuth2 client secret
    pub client_secret: Option<String>,
    /// API base URL (defaults to the public Lufthansa endpoint)
    pub base_url: Option<String>,
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    /// HTTP request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "lhapi-cli", "lhapi-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load only what is stored on disk, ignoring the environment
    pub fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir).context("Failed to create config directory")?;

        let path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the client secret)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Store new credentials, keeping the base URL unless one is given.
    pub fn set_credentials(
        &mut self,
        client_id: String,
        client_secret: String,
        base_url: Option<String>,
    ) -> Result<()> {
        self.client_id = Some(client_id);
        self.client_secret = Some(client_secret);
        if base_url.is_some() {
            self.base_url = base_url;
        }
        // Fail early on empty values rather than at the first API call.
        self.credentials()?;
        Ok(())
    }

    /// Non-empty environment values win over the file.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(id) = lookup(ENV_CLIENT_ID) {
            self.client_id = Some(id);
        }
        if let Some(secret) = lookup(ENV_CLIENT_SECRET) {
            self.client_secret = Some(secret);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
    }

    pub fn credentials(&self) -> Result<Credentials> {
        let client_id = self.client_id.as_deref().with_context(|| {
            format!(
                "No client id configured. Run 'lhapi configure' or set {}.",
                ENV_CLIENT_ID
            )
        })?;
        let client_secret = self.client_secret.as_deref().with_context(|| {
            format!(
                "No client secret configured. Run 'lhapi configure' or set {}.",
                ENV_CLIENT_SECRET
            )
        })?;
        Ok(Credentials::new(client_id, client_secret)?)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            refresh_policy: self.refresh_policy,
            retry_policy: self.retry_policy,
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_TIMEOUT),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("base_url", &self.base_url)
            .field("refresh_policy", &self.refresh_policy)
            .field("retry_policy", &self.retry_policy)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
