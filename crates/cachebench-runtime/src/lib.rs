#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for cycle orchestration.
pub const TRACING_TARGET_CYCLE: &str = "cachebench_runtime::cycle";

/// Tracing target for staging directory housekeeping.
pub const TRACING_TARGET_STAGING: &str = "cachebench_runtime::staging";

mod pipeline;
mod report;
mod staging;
mod transport;

pub use pipeline::{CycleOptions, Pipeline, PipelineSettings};
pub use report::{CycleReport, PhaseOutcome};
pub use staging::StagingDirectory;
#[cfg(feature = "ssh")]
pub use transport::SshTransport;
pub use transport::TransportFactory;
