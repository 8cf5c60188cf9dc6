#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for cycle-level narration and state transitions.
pub const TRACING_TARGET_PIPELINE: &str = "cachebench_core::pipeline";

mod context;
mod error;
mod remote;
mod state;
mod types;
mod warehouse;

#[doc(hidden)]
pub mod prelude;

pub use context::{PipelineContext, Prompter, Unattended};
pub use error::{Error, ErrorKind, IngestionStage, Result};
pub use remote::{CommandOutput, RemoteConnector, RemoteSession};
pub use state::{PipelineStage, PipelineState};
pub use types::{
    ArtifactFile, ArtifactState, CustomLoad, DataFormat, Environment, LoadProfile, MappingKind,
    RunSpec, ServerEndpoint, SetGetRatio, SourceType, TestId,
};
pub use warehouse::{IngestionRequest, IngestionSource, SharedWarehouse, WarehouseClient};
