//! Remote load configuration.
//!
//! Read from the benchmark settings file (`appsettings.json` by default),
//! where it lives under a named section:
//!
//! ```json
//! {
//!   "Redis": {
//!     "defaultLoad": ["memtier_benchmark -s {0} --out-file={1} -d 500"],
//!     "customLoad": "memtier_benchmark -s {0} -c {1} -t {2} -d {3} --out-file={4} --test-time={5} --ratio={6}",
//!     "gating": { "user": "bench", "host": "10.0.0.5", "server": "gating-cache" },
//!     "lab": { "user": "bench", "host": "10.0.0.6", "server": "lab-cache" },
//!     "privateKeyPath": "~/.ssh/id_rsa"
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use cachebench_core::{Environment, Error, Result, ServerEndpoint};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

const DEFAULT_INSTALL_SCRIPT: &str = "./memtier.sh";
const DEFAULT_TOOL_DIRECTORY: &str = "memtier_benchmark";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 3600;

/// Fixed endpoint of a configured environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetail {
    /// Remote shell user.
    #[serde(alias = "User")]
    pub user: String,
    /// Remote shell host.
    #[serde(alias = "Host")]
    pub host: String,
    /// Cache endpoint the benchmark targets.
    #[serde(alias = "Server")]
    pub server: String,
}

impl From<&ServerDetail> for ServerEndpoint {
    fn from(detail: &ServerDetail) -> Self {
        ServerEndpoint::new(&detail.host, &detail.user, &detail.server)
    }
}

/// Operator-supplied endpoint for [`Environment::Custom`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEndpoint {
    /// Remote shell host.
    pub host: Option<String>,
    /// Remote shell user.
    pub user: Option<String>,
    /// Cache endpoint the benchmark targets.
    pub server: Option<String>,
    /// Identity file overriding the configured one.
    pub private_key: Option<PathBuf>,
}

/// Load matrix, custom template and environment endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Ordered standard-mode templates with slots `{0}` (server) and
    /// `{1}` (test id).
    #[serde(default, alias = "DefaultLoad")]
    pub default_load: Vec<String>,

    /// Custom-mode template with slots `{0}`..`{6}`: server, clients,
    /// threads, payload size, test id, duration, ratio.
    #[serde(default, alias = "CustomLoad")]
    pub custom_load: String,

    /// Names of the environments offered to the operator.
    #[serde(default, alias = "Environment")]
    pub environment: Vec<String>,

    /// Gating environment endpoint.
    #[serde(default, alias = "Gating")]
    pub gating: Option<ServerDetail>,

    /// Lab environment endpoint.
    #[serde(default, alias = "Lab")]
    pub lab: Option<ServerDetail>,

    /// Identity file used to authenticate the remote shell.
    #[serde(default, alias = "PrivateKeyPath")]
    pub private_key_path: Option<PathBuf>,

    /// Local file holding the idempotent installer command.
    #[serde(default = "default_install_script", alias = "InstallScript")]
    pub install_script: PathBuf,

    /// Remote subdirectory the tool falls back to writing results in.
    #[serde(default = "default_tool_directory", alias = "ToolDirectory")]
    pub tool_directory: String,

    /// Upper bound for a single remote command or transfer; 0 disables it.
    #[serde(
        default = "default_command_timeout_secs",
        alias = "CommandTimeoutSecs"
    )]
    pub command_timeout_secs: u64,
}

fn default_install_script() -> PathBuf {
    PathBuf::from(DEFAULT_INSTALL_SCRIPT)
}

fn default_tool_directory() -> String {
    DEFAULT_TOOL_DIRECTORY.to_owned()
}

const fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl RemoteConfig {
    /// Reads the named section of a settings file.
    ///
    /// The section name is matched case-insensitively.
    pub fn load(path: impl AsRef<Path>, section: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read '{}': {e}", path.display()))
        })?;

        let config = Self::from_json_str(&content, section)
            .map_err(|e| Error::configuration(format!("'{}': {e}", path.display())))?;

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            path = %path.display(),
            section,
            standard_runs = config.default_load.len(),
            "Loaded remote configuration"
        );

        Ok(config)
    }

    /// Parses the named section out of a settings document.
    pub fn from_json_str(content: &str, section: &str) -> Result<Self> {
        let document: serde_json::Value = serde_json::from_str(content)?;
        let object = document
            .as_object()
            .ok_or_else(|| Error::configuration("settings document is not an object"))?;

        let value = object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(section))
            .map(|(_, value)| value.clone())
            .ok_or_else(|| Error::configuration(format!("section '{section}' is missing")))?;

        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates values that do not depend on the selected environment.
    pub fn validate(&self) -> Result<()> {
        if self.tool_directory.trim().is_empty() {
            return Err(Error::configuration("toolDirectory must not be empty"));
        }

        if let Some(blank) = self.default_load.iter().position(|t| t.trim().is_empty()) {
            return Err(Error::configuration(format!(
                "defaultLoad entry {blank} is empty"
            )));
        }

        Ok(())
    }

    /// Resolves the endpoint of an environment.
    pub fn endpoint(&self, environment: Environment, custom: &CustomEndpoint) -> Result<ServerEndpoint> {
        let configured = |detail: &Option<ServerDetail>| {
            detail.as_ref().map(ServerEndpoint::from).ok_or_else(|| {
                Error::configuration(format!("no endpoint configured for {environment}"))
            })
        };

        match environment {
            Environment::Gating => configured(&self.gating),
            Environment::Lab => configured(&self.lab),
            Environment::Custom => {
                let required = |value: &Option<String>, name: &str| {
                    value
                        .as_deref()
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_owned)
                        .ok_or_else(|| {
                            Error::configuration(format!("custom environment requires a {name}"))
                        })
                };

                Ok(ServerEndpoint::new(
                    required(&custom.host, "host")?,
                    required(&custom.user, "user")?,
                    required(&custom.server, "server")?,
                ))
            }
        }
    }

    /// Returns the identity file for an environment.
    pub fn private_key(&self, environment: Environment, custom: &CustomEndpoint) -> Option<PathBuf> {
        match environment {
            Environment::Custom => custom
                .private_key
                .clone()
                .or_else(|| self.private_key_path.clone()),
            Environment::Gating | Environment::Lab => self.private_key_path.clone(),
        }
    }

    /// Reads the installer command from [`Self::install_script`].
    pub fn install_command(&self) -> Result<String> {
        let command = std::fs::read_to_string(&self.install_script).map_err(|e| {
            Error::configuration(format!(
                "cannot read install script '{}': {e}",
                self.install_script.display()
            ))
        })?;

        Ok(command)
    }

    /// Returns the command timeout, `None` when disabled.
    #[inline]
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_secs > 0).then(|| Duration::from_secs(self.command_timeout_secs))
    }
}
