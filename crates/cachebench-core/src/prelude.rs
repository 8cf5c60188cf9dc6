//! Prelude module for convenient imports.

pub use crate::context::{PipelineContext, Prompter};
pub use crate::error::{Error, ErrorKind, IngestionStage, Result};
pub use crate::remote::{CommandOutput, RemoteConnector, RemoteSession};
pub use crate::state::{PipelineStage, PipelineState};
pub use crate::types::{ArtifactFile, ArtifactState, Environment, RunSpec, ServerEndpoint, TestId};
pub use crate::warehouse::{IngestionRequest, IngestionSource, WarehouseClient};
