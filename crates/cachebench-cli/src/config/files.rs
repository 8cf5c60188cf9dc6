//! Settings file locations.

use std::path::PathBuf;

use cachebench_runtime::PipelineSettings;
use clap::Args;

use crate::TRACING_TARGET_CONFIG;

/// Where settings are read from and results are staged.
#[derive(Debug, Clone, Args)]
pub struct FilesConfig {
    /// Benchmark settings file holding the load configuration
    #[arg(long, env = "CACHEBENCH_SETTINGS", default_value = "appsettings.json")]
    pub settings: PathBuf,

    /// Section of the settings file to read
    #[arg(long, env = "CACHEBENCH_SECTION", default_value = "redis")]
    pub section: String,

    /// Warehouse ingestion settings file
    #[arg(long, env = "CACHEBENCH_INGEST_SETTINGS", default_value = "kustoSettings.json")]
    pub ingest_settings: PathBuf,

    /// Local directory result files are downloaded into
    #[arg(long, env = "CACHEBENCH_STAGING_DIR", default_value = "./Results")]
    pub staging_dir: PathBuf,
}

impl FilesConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            settings_path: self.settings.clone(),
            section: self.section.clone(),
            ingest_settings_path: self.ingest_settings.clone(),
            staging_dir: self.staging_dir.clone(),
        }
    }

    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            settings = %self.settings.display(),
            section = %self.section,
            ingest_settings = %self.ingest_settings.display(),
            staging_dir = %self.staging_dir.display(),
            "Settings files"
        );
    }
}
