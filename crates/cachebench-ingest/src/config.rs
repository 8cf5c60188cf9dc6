//! Ingestion configuration.
//!
//! Read from `kustoSettings.json`. Required fields are checked as a group so
//! an operator sees every missing name at once, and nothing here touches
//! the network.

use std::path::Path;
use std::time::Duration;

use cachebench_core::{DataFormat, Error, Result, SourceType};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::TRACING_TARGET_CONFIG;

/// Batching window used when `maximumBatchingTimeSpan` cannot be parsed.
pub const DEFAULT_BATCHING_TIME_SPAN: Duration = Duration::from_secs(10);

/// How the operator authenticates against the warehouse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum AuthenticationMode {
    /// Interactive sign-in; the operator may be prompted for credentials.
    #[default]
    UserPrompt,
    ManagedIdentity,
    AppKey,
    AppCertificate,
}

impl AuthenticationMode {
    /// Returns whether this mode can interrupt the run with a prompt.
    #[inline]
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::UserPrompt)
    }
}

/// Where the ingested data comes from and how it is shaped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSpec {
    #[serde(default)]
    pub source_type: SourceType,
    /// Source URI; rebound to each staged artifact during ingestion.
    #[serde(default)]
    pub data_source_uri: Option<String>,
    #[serde(default)]
    pub format: DataFormat,
    /// Reuse a mapping that already exists on the table.
    #[serde(default)]
    pub use_existing_mapping: bool,
    #[serde(default)]
    pub mapping_name: Option<String>,
    /// Mapping definition; without it no mapping is created.
    #[serde(default)]
    pub mapping_value: Option<String>,
}

/// Thresholds controlling when queued data is flushed into the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchingPolicy {
    /// Batching window as `[d.]HH:MM:SS`.
    #[serde(default)]
    pub maximum_batching_time_span: Option<String>,
    #[serde(default)]
    pub maximum_number_of_items: u32,
    #[serde(default, rename = "maximumRawDataSizeMB")]
    pub maximum_raw_data_size_mb: u32,
}

impl BatchingPolicy {
    /// Returns the batching window, or 10 seconds when it is absent or
    /// malformed.
    pub fn batching_time_span(&self) -> Duration {
        self.maximum_batching_time_span
            .as_deref()
            .and_then(parse_time_span)
            .unwrap_or(DEFAULT_BATCHING_TIME_SPAN)
    }
}

/// Parses `[d.]HH:MM:SS[.fff]`.
fn parse_time_span(value: &str) -> Option<Duration> {
    let mut parts = value.trim().split(':');
    let (head, minutes, seconds) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let (days, hours) = match head.split_once('.') {
        Some((days, hours)) => (days.parse::<u64>().ok()?, hours.parse::<u64>().ok()?),
        None => (0, head.parse::<u64>().ok()?),
    };
    let minutes = minutes.parse::<u64>().ok()?;
    let seconds = seconds.parse::<f64>().ok()?;
    if hours > 23 || minutes > 59 || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let whole = ((days * 24 + hours) * 60 + minutes) * 60;
    Some(Duration::from_secs(whole) + Duration::from_secs_f64(seconds))
}

/// Formats a duration as `HH:MM:SS`, with a day prefix when needed.
pub(crate) fn format_time_span(span: Duration) -> String {
    let total = span.as_secs();
    let (days, rest) = (total / 86_400, total % 86_400);
    let (hours, minutes, seconds) = (rest / 3600, rest % 3600 / 60, rest % 60);
    if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Warehouse connection, table layout and ingestion behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionConfig {
    /// Work against an existing table instead of creating one.
    #[serde(default)]
    pub use_existing_table: bool,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub table_name: String,
    /// Column list, e.g. `(Id:string, Rps:real)`.
    #[serde(default)]
    pub table_schema: String,
    /// Query and management endpoint.
    #[serde(default, alias = "kustoUri")]
    pub warehouse_uri: String,
    /// Queued ingestion endpoint.
    #[serde(default)]
    pub ingest_uri: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub data: Option<DataSourceSpec>,
    /// Alter-merge the configured schema into an existing table.
    #[serde(default)]
    pub alter_table: bool,
    /// Report row counts before and after ingestion.
    #[serde(default)]
    pub query_data: bool,
    /// Ingest the staged artifacts.
    #[serde(default)]
    pub ingest_data: bool,
    #[serde(default)]
    pub authentication_mode: AuthenticationMode,
    /// Pause before every announced step.
    #[serde(default)]
    pub wait_for_user: bool,
    #[serde(default)]
    pub wait_for_ingest_seconds: i64,
    #[serde(default)]
    pub batching_policy: Option<BatchingPolicy>,
    /// Apply `batching_policy` to the table. Off unless set explicitly.
    #[serde(default)]
    pub enable_batching_policy: bool,
}

impl IngestionConfig {
    /// Reads and validates the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "couldn't read config file '{}': {e}",
                path.display()
            ))
        })?;

        let config = Self::from_json_str(&content).map_err(|e| match e {
            Error::Configuration { reason } => {
                Error::configuration(format!("'{}': {reason}", path.display()))
            }
            other => Error::configuration(format!(
                "couldn't parse config file '{}': {other}",
                path.display()
            )),
        })?;

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            path = %path.display(),
            database = %config.database_name,
            table = %config.table_name,
            "Loaded ingestion configuration"
        );

        Ok(config)
    }

    /// Parses and validates a configuration document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks required fields and value ranges.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<_> = [
            ("databaseName", &self.database_name),
            ("tableName", &self.table_name),
            ("tableSchema", &self.table_schema),
            ("warehouseUri", &self.warehouse_uri),
            ("ingestUri", &self.ingest_uri),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::configuration(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        if self.data.is_none() {
            return Err(Error::configuration(
                "required field data is either missing, empty or misfilled",
            ));
        }

        if self.wait_for_ingest_seconds < 0 {
            return Err(Error::configuration(
                "waitForIngestSeconds must not be negative",
            ));
        }

        Ok(())
    }

    /// Returns the data source.
    ///
    /// Always present on a validated configuration.
    pub fn data(&self) -> Result<&DataSourceSpec> {
        self.data
            .as_ref()
            .ok_or_else(|| Error::configuration("data source is not configured"))
    }

    /// Returns the delay after each queued ingestion.
    #[inline]
    pub fn wait_for_ingest(&self) -> Duration {
        Duration::from_secs(self.wait_for_ingest_seconds.max(0).unsigned_abs())
    }

    /// Returns the batching policy to apply, if both present and enabled.
    pub fn effective_batching_policy(&self) -> Option<&BatchingPolicy> {
        self.batching_policy
            .as_ref()
            .filter(|_| self.enable_batching_policy)
    }
}
