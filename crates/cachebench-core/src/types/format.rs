//! Data formats, ingestion mapping kinds and source types.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Format of an artifact handed to the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DataFormat {
    #[default]
    Csv,
    Tsv,
    Tsve,
    Psv,
    Scsv,
    Sohsv,
    Txt,
    Raw,
    /// A single JSON document per file.
    Json,
    SingleJson,
    /// One JSON object per line.
    MultiJson,
    Avro,
    ApacheAvro,
    Parquet,
    Orc,
    W3cLogFile,
}

impl DataFormat {
    /// Returns the ingestion mapping kind for this format.
    #[must_use]
    pub const fn mapping_kind(self) -> MappingKind {
        match self {
            Self::Csv
            | Self::Tsv
            | Self::Tsve
            | Self::Psv
            | Self::Scsv
            | Self::Sohsv
            | Self::Txt
            | Self::Raw => MappingKind::Csv,
            Self::Json | Self::SingleJson | Self::MultiJson => MappingKind::Json,
            Self::Avro => MappingKind::Avro,
            Self::ApacheAvro => MappingKind::ApacheAvro,
            Self::Parquet => MappingKind::Parquet,
            Self::Orc => MappingKind::Orc,
            Self::W3cLogFile => MappingKind::W3cLogFile,
        }
    }

    /// Returns the format actually sent to the ingestion backend.
    ///
    /// The backend requires line-delimited JSON for multi-row files, so a
    /// `json` request is queued as `multijson` even when the file logically
    /// holds one document.
    #[must_use]
    pub const fn normalized_for_ingestion(self) -> Self {
        match self {
            Self::Json => Self::MultiJson,
            other => other,
        }
    }
}

/// Kind of ingestion mapping, as used in mapping control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum MappingKind {
    Csv,
    Json,
    Avro,
    ApacheAvro,
    Parquet,
    Orc,
    W3cLogFile,
}

/// Where ingested data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SourceType {
    /// Upload a local file.
    #[default]
    #[serde(rename = "localfilesource", alias = "localFile", alias = "LocalFile")]
    #[strum(serialize = "localfilesource")]
    LocalFile,
    /// Let the warehouse pull from a blob URI.
    #[serde(rename = "blobsource", alias = "blob", alias = "Blob")]
    #[strum(serialize = "blobsource")]
    Blob,
    /// Nothing to ingest.
    #[serde(rename = "nosource", alias = "noSource", alias = "NoSource")]
    #[strum(serialize = "nosource")]
    NoSource,
}
