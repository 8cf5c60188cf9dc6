//! Which load a cycle runs and where.

use cachebench_core::{CustomLoad, Environment, SetGetRatio};
use cachebench_remote::RunMode;
use clap::Args;

/// Environment and load selection.
///
/// Options left unset are asked for at the start of every cycle.
#[derive(Debug, Clone, Args)]
pub struct RunConfig {
    /// Performance environment to benchmark
    #[arg(long, value_enum, env = "CACHEBENCH_ENVIRONMENT")]
    pub environment: Option<Environment>,

    /// Run every entry of the standard load matrix
    #[arg(long, conflicts_with = "custom")]
    pub standard: bool,

    /// Run a single load built from the custom options below
    #[arg(long)]
    pub custom: bool,

    /// Custom load: payload size in bytes
    #[arg(long, default_value_t = 2000)]
    pub payload_size: u32,

    /// Custom load: number of threads
    #[arg(long, default_value_t = 2)]
    pub threads: u32,

    /// Custom load: connections per thread
    #[arg(long, default_value_t = 2)]
    pub clients: u32,

    /// Custom load: test duration in seconds
    #[arg(long = "test-time", default_value_t = 300)]
    pub duration_secs: u32,

    /// Custom load: set:get ratio
    #[arg(long, default_value = "1:10")]
    pub ratio: SetGetRatio,
}

impl RunConfig {
    /// Returns the load selected on the command line, if any.
    pub fn is_standard(&self) -> Option<bool> {
        match (self.standard, self.custom) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }

    pub fn custom_load(&self) -> CustomLoad {
        CustomLoad {
            payload_size: self.payload_size,
            threads: self.threads,
            clients: self.clients,
            duration_secs: self.duration_secs,
            ratio: self.ratio,
        }
    }

    pub fn mode(&self, standard: bool) -> RunMode {
        if standard {
            RunMode::Standard
        } else {
            RunMode::Custom(self.custom_load())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let load = self.custom_load();
        if load.threads == 0 || load.clients == 0 || load.duration_secs == 0 {
            anyhow::bail!("custom load needs at least one thread, one client and one second");
        }
        Ok(())
    }
}
