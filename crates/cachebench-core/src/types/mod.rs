//! Data model shared across the remote and ingestion phases.

mod artifact;
mod endpoint;
mod format;
mod run;
mod test_id;

pub use artifact::{ArtifactFile, ArtifactState};
pub use endpoint::{Environment, ServerEndpoint};
pub use format::{DataFormat, MappingKind, SourceType};
pub use run::{CustomLoad, LoadProfile, RunSpec, SetGetRatio};
pub use test_id::TestId;
