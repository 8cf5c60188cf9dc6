//! Custom endpoint and SSH transport options.

use std::path::PathBuf;

use cachebench_remote::{CustomEndpoint, KnownHostsPolicy, SshConfig};
use clap::Args;

/// Remote endpoint for the custom environment and SSH settings.
#[derive(Debug, Clone, Args)]
pub struct EndpointConfig {
    /// Custom environment: remote host
    #[arg(long, env = "CACHEBENCH_HOST")]
    pub host: Option<String>,

    /// Custom environment: remote user
    #[arg(long, env = "CACHEBENCH_USER")]
    pub user: Option<String>,

    /// Custom environment: cache server to benchmark
    #[arg(long, env = "CACHEBENCH_SERVER")]
    pub server: Option<String>,

    /// Custom environment: identity file, defaults to privateKeyPath
    #[arg(long, env = "CACHEBENCH_PRIVATE_KEY")]
    pub private_key: Option<PathBuf>,

    /// Host key policy for SSH connections
    #[arg(long, value_enum, env = "CACHEBENCH_KNOWN_HOSTS", default_value_t = KnownHostsPolicy::Add)]
    pub known_hosts: KnownHostsPolicy,

    /// SSH connection timeout in seconds
    #[arg(long, env = "CACHEBENCH_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,

    /// SSH port
    #[arg(long, env = "CACHEBENCH_SSH_PORT")]
    pub port: Option<u16>,
}

impl EndpointConfig {
    pub fn custom_endpoint(&self) -> CustomEndpoint {
        CustomEndpoint {
            host: self.host.clone(),
            user: self.user.clone(),
            server: self.server.clone(),
            private_key: self.private_key.clone(),
        }
    }

    /// SSH settings shared by every cycle; the identity file is chosen per
    /// cycle from the selected environment.
    pub fn ssh_config(&self) -> SshConfig {
        SshConfig {
            private_key: None,
            port: self.port,
            connect_timeout_secs: self.connect_timeout,
            known_hosts: self.known_hosts,
        }
    }
}
