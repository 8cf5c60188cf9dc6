//! Benchmark environments and their remote endpoints.

#[cfg(feature = "config")]
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A performance environment the benchmark can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[cfg_attr(feature = "config", derive(ValueEnum))]
#[strum(ascii_case_insensitive)]
pub enum Environment {
    /// Gating environment, endpoint taken from configuration.
    Gating,
    /// Lab environment, endpoint taken from configuration.
    Lab,
    /// Operator-supplied endpoint.
    Custom,
}

/// Where a benchmark runs and which cache it targets.
///
/// Resolved once per environment selection and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    /// Host the remote shell connects to.
    pub host: String,
    /// Remote shell user; also determines the remote home directory.
    pub user: String,
    /// Cache endpoint the benchmark tool is pointed at.
    pub server_alias: String,
}

impl ServerEndpoint {
    /// Creates a new endpoint.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        server_alias: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            server_alias: server_alias.into(),
        }
    }

    /// Returns the remote home directory of the shell user.
    #[must_use]
    pub fn home_dir(&self) -> String {
        format!("/home/{}", self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("lab".parse::<Environment>().unwrap(), Environment::Lab);
        assert_eq!("Gating".parse::<Environment>().unwrap(), Environment::Gating);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn home_dir_uses_user() {
        let endpoint = ServerEndpoint::new("10.0.0.1", "clouduser", "cache.local");
        assert_eq!(endpoint.home_dir(), "/home/clouduser");
    }
}
