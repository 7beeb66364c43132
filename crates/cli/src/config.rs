//! Server configuration.
//!
//! Loaded from a TOML file (default `.hookci/config.toml`); command-line flags
//! override individual values before [`ServerConfig::validate`] runs. The
//! server never starts with a configuration that fails validation.
//!
//! ```toml
//! repos = ["monperrus/test", "INRIA/spoon"]
//! port = 5000
//! public_url = "https://ci.example.org"
//! hooks_dir = "/srv/hookci/hooks"
//! script_timeout_secs = 900
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use pipeline::{PipelineError, RepositorySlug, DEFAULT_API_BASE};
use runner::{ExecutorConfig, DEFAULT_CLONE_BASE, DEFAULT_SCRIPT_TIMEOUT, DEFAULT_SHELL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where `serve` and `check-config` look for the file by default.
pub const DEFAULT_CONFIG_PATH: &str = ".hookci/config.toml";

/// Why a configuration could not be loaded or was rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration file {path}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("cannot parse configuration file {path}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Parser diagnostics.
        #[source]
        source: toml::de::Error,
    },

    /// `repos` is empty.
    #[error("no repositories configured; set `repos`")]
    NoRepositories,

    /// An entry in `repos` is not an `owner/repo` slug.
    #[error("invalid repository entry")]
    InvalidRepository(#[source] PipelineError),

    /// `script_timeout_secs` is zero.
    #[error("script_timeout_secs must be greater than zero")]
    ZeroTimeout,

    /// `public_url` is not an http(s) URL.
    #[error("public_url '{0}' must start with http:// or https://")]
    InvalidPublicUrl(String),
}

/// Everything `serve` needs besides the GitHub token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// `owner/repo` slugs whose deliveries may run hooks.
    pub repos: Vec<String>,

    /// Interface the listener binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL GitHub reaches this server at; defaults to `http://<host>:<port>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Directory searched for hook scripts.
    #[serde(default = "default_hooks_dir")]
    pub hooks_dir: PathBuf,

    /// Parent of per-run workspaces and stored payloads.
    #[serde(default = "std::env::temp_dir")]
    pub workspace_root: PathBuf,

    /// Watchdog deadline for each hook run.
    #[serde(default = "default_script_timeout_secs")]
    pub script_timeout_secs: u64,

    /// Interpreter for `.sh` hooks.
    #[serde(default = "default_shell")]
    pub shell: PathBuf,

    /// GitHub REST API root, used for webhook management.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Where `.sh` hooks fetch `<owner>/<repo>.git` from.
    #[serde(default = "default_clone_base")]
    pub clone_base: String,

    /// Create repository webhooks on startup and remove them on shutdown.
    #[serde(default)]
    pub register_webhooks: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_hooks_dir() -> PathBuf {
    PathBuf::from("./hooks")
}

fn default_script_timeout_secs() -> u64 {
    DEFAULT_SCRIPT_TIMEOUT.as_secs()
}

fn default_shell() -> PathBuf {
    PathBuf::from(DEFAULT_SHELL)
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_clone_base() -> String {
    DEFAULT_CLONE_BASE.to_string()
}

impl ServerConfig {
    /// Reads and parses `path`. Does not validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses TOML text. Does not validate.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Checks the configuration and returns the parsed allow-list.
    pub fn validate(&self) -> Result<Vec<RepositorySlug>, ConfigError> {
        if self.repos.is_empty() {
            return Err(ConfigError::NoRepositories);
        }
        let repos = self
            .repos
            .iter()
            .map(|r| r.parse::<RepositorySlug>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::InvalidRepository)?;

        if self.script_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if let Some(url) = &self.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidPublicUrl(url.clone()));
            }
        }
        Ok(repos)
    }

    /// `host:port` to bind.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// URL GitHub delivers webhooks to.
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.socket_addr()))
    }

    /// Base of the `target_url` links attached to commit statuses.
    pub fn trace_base_url(&self) -> String {
        format!("{}/traces", self.public_url().trim_end_matches('/'))
    }

    /// Settings for the hook executor.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            timeout: Duration::from_secs(self.script_timeout_secs),
            shell: self.shell.clone(),
            workspace_root: self.workspace_root.clone(),
            clone_base: self.clone_base.clone(),
        }
    }
}
