//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── files: FilesConfig        # settings files and staging directory
//! ├── run: RunConfig            # environment, standard or custom load
//! ├── endpoint: EndpointConfig  # custom endpoint and SSH options
//! ├── warehouse: KustoConfig    # warehouse HTTP transport and token
//! └── log_format, once
//! ```
//!
//! Every option can also be provided through its `CACHEBENCH_*` environment
//! variable. Use `--help` to see all available options.

mod endpoint;
mod files;
mod run;

use std::process;

use cachebench_ingest::kusto::KustoConfig;
use clap::Parser;
pub use endpoint::EndpointConfig;
pub use files::FilesConfig;
pub use run::RunConfig;

use crate::telemetry::LogFormat;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "cachebench")]
#[command(about = "Runs cache benchmarks remotely and ingests the results")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub files: FilesConfig,

    #[clap(flatten)]
    pub run: RunConfig,

    #[clap(flatten)]
    pub endpoint: EndpointConfig,

    #[clap(flatten)]
    pub warehouse: KustoConfig,

    /// Log output format
    #[arg(long, value_enum, env = "CACHEBENCH_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Run a single cycle without asking whether to continue
    #[arg(long, env = "CACHEBENCH_ONCE")]
    pub once: bool,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates option combinations clap cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.run.validate()
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        self.files.log();
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            environment = ?self.run.environment,
            standard = ?self.run.is_standard(),
            once = self.once,
            warehouse_timeout_secs = self.warehouse.http_timeout,
            warehouse_token = self.warehouse.access_token.is_some(),
            "Run configuration"
        );
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
