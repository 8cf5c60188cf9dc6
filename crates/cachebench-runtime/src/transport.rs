//! Construction of remote connectors per cycle.

use std::path::Path;

use cachebench_core::RemoteConnector;

/// Builds the connector for one cycle.
///
/// The identity file depends on the selected environment, so the connector
/// is created after the endpoint is resolved. Closures with the matching
/// signature implement this trait.
pub trait TransportFactory: Send + Sync {
    fn connector(&self, private_key: Option<&Path>) -> Box<dyn RemoteConnector>;
}

impl<F> TransportFactory for F
where
    F: Fn(Option<&Path>) -> Box<dyn RemoteConnector> + Send + Sync,
{
    fn connector(&self, private_key: Option<&Path>) -> Box<dyn RemoteConnector> {
        self(private_key)
    }
}

#[cfg(feature = "ssh")]
mod ssh {
    use std::path::Path;

    use cachebench_core::RemoteConnector;
    use cachebench_remote::{SshConfig, SshConnector};

    use super::TransportFactory;

    /// Opens OpenSSH sessions, authenticating with the cycle's identity file.
    #[derive(Debug, Clone, Default)]
    pub struct SshTransport {
        config: SshConfig,
    }

    impl SshTransport {
        pub fn new(config: SshConfig) -> Self {
            Self { config }
        }
    }

    impl TransportFactory for SshTransport {
        fn connector(&self, private_key: Option<&Path>) -> Box<dyn RemoteConnector> {
            let config = match private_key {
                Some(path) => self.config.clone().with_private_key(path),
                None => self.config.clone(),
            };
            Box::new(SshConnector::new(config))
        }
    }
}

#[cfg(feature = "ssh")]
pub use ssh::SshTransport;
