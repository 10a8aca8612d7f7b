use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `[gateway].url`.
pub const GATEWAY_URL_ENV: &str = "gateway_url";

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "gitship.toml";

/// gitship.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitshipConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL, without trailing slash
    #[serde(default = "default_gateway_url")]
    pub url: String,
    /// Timeout for inventory list/delete and collector calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Function that receives packaged archives
    #[serde(default = "default_deploy_endpoint")]
    pub deploy_endpoint: String,
    /// Function that performs reconciliation
    #[serde(default = "default_collect_endpoint")]
    pub collect_endpoint: String,
    /// Function that posts commit statuses
    #[serde(default = "default_status_endpoint")]
    pub status_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Registry host prefixed to every image reference
    #[serde(default = "default_registry")]
    pub registry: String,
    /// Manifest file name, relative to the checkout root
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// External builder program
    #[serde(default = "default_builder")]
    pub builder: String,
    /// Arguments passed to the builder. Must produce `build/<fn>/` contexts
    /// without building final images. When unset, see
    /// [`BuildConfig::builder_args`].
    #[serde(default)]
    pub builder_args: Option<Vec<String>>,
    /// Build-step output file that must never be packaged
    #[serde(default = "default_transient_file")]
    pub transient_file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory holding per-run checkouts (defaults to the system temp dir)
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub policy: DispatchPolicy,
}

/// What the dispatcher does after a deployment fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchPolicy {
    /// Stop at the first failure; remaining archives are skipped.
    #[default]
    FailFast,
    /// Attempt every archive and report each outcome.
    ContinueOnError,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Post commit statuses to the status endpoint during a run
    #[serde(default)]
    pub enabled: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
            deploy_endpoint: default_deploy_endpoint(),
            collect_endpoint: default_collect_endpoint(),
            status_endpoint: default_status_endpoint(),
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `{url}/function/{name}`
    pub fn function_url(&self, name: &str) -> String {
        format!("{}/function/{name}", self.url)
    }

    /// `{url}/system/functions`
    pub fn system_functions_url(&self) -> String {
        format!("{}/system/functions", self.url)
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            manifest: default_manifest(),
            builder: default_builder(),
            builder_args: None,
            transient_file: default_transient_file(),
        }
    }
}

impl BuildConfig {
    /// Configured builder arguments, or
    /// `build -f <manifest> --shrinkwrap` for the configured manifest.
    pub fn builder_args(&self) -> Vec<String> {
        match &self.builder_args {
            Some(args) => args.clone(),
            None => vec![
                "build".to_owned(),
                "-f".to_owned(),
                self.manifest.clone(),
                "--shrinkwrap".to_owned(),
            ],
        }
    }
}

impl GitshipConfig {
    /// Load from gitship.toml in the given directory, or return defaults if not found.
    pub fn load(dir: &Path) -> crate::Result<Self> {
        Self::load_file(&dir.join(CONFIG_FILE))
    }

    /// Load from an explicit path, or return defaults if the file does not exist.
    pub fn load_file(config_path: &Path) -> crate::Result<Self> {
        let config: Self = if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path.to_path_buf(),
                source: e,
            })?
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Self::default()
        };
        config.normalized()
    }

    /// Apply the `gateway_url` environment override. Empty values are ignored.
    pub fn with_gateway_override(mut self, url: Option<String>) -> crate::Result<Self> {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!(gateway = %url, "gateway url overridden from environment");
            self.gateway.url = url;
        }
        self.normalized()
    }

    fn normalized(mut self) -> crate::Result<Self> {
        let url = self.gateway.url.trim().trim_end_matches('/').to_owned();
        if url.is_empty() {
            return Err(crate::Error::InvalidGatewayUrl {
                url,
                reason: "must not be empty",
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(crate::Error::InvalidGatewayUrl {
                url,
                reason: "must start with http:// or https://",
            });
        }
        self.gateway.url = url;
        Ok(self)
    }
}

fn default_gateway_url() -> String {
    "http://gateway:8080".to_owned()
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_deploy_endpoint() -> String {
    "buildshiprun".to_owned()
}

fn default_collect_endpoint() -> String {
    "garbage-collect".to_owned()
}

fn default_status_endpoint() -> String {
    "github-status".to_owned()
}

fn default_registry() -> String {
    "registry:5000".to_owned()
}

fn default_manifest() -> String {
    "stack.yml".to_owned()
}

fn default_builder() -> String {
    "faas-cli".to_owned()
}


fn default_transient_file() -> String {
    "context.tar".to_owned()
}
