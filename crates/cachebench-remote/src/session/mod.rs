//! Remote session transports.

mod bounded;
#[cfg(feature = "ssh")]
#[cfg_attr(docsrs, doc(cfg(feature = "ssh")))]
mod ssh;

pub use bounded::{BoundedConnector, BoundedSession};
#[cfg(feature = "ssh")]
pub use ssh::{KnownHostsPolicy, SshConfig, SshConnector, SshSession};
