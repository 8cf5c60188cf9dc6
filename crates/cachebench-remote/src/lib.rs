#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for configuration loading.
pub const TRACING_TARGET_CONFIG: &str = "cachebench_remote::config";

/// Tracing target for run planning.
pub const TRACING_TARGET_PLANNER: &str = "cachebench_remote::planner";

/// Tracing target for result collection.
pub const TRACING_TARGET_COLLECTOR: &str = "cachebench_remote::collector";

/// Tracing target for remote session operations.
pub const TRACING_TARGET_SESSION: &str = "cachebench_remote::session";

mod collector;
mod config;
mod planner;
mod session;
mod template;

pub use collector::ResultCollector;
pub use config::{CustomEndpoint, RemoteConfig, ServerDetail};
pub use planner::{RejectedRun, RunMode, RunPlan, RunPlanner};
pub use session::{BoundedConnector, BoundedSession};
#[cfg(feature = "ssh")]
pub use session::{KnownHostsPolicy, SshConfig, SshConnector, SshSession};
pub use template::CommandTemplate;
