//! Run specifications produced by the planner.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Environment, ServerEndpoint, TestId};
use crate::Error;

/// A `set:get` operation ratio such as `1:10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetGetRatio {
    /// Relative weight of set operations.
    pub sets: u32,
    /// Relative weight of get operations.
    pub gets: u32,
}

impl Default for SetGetRatio {
    fn default() -> Self {
        Self { sets: 1, gets: 10 }
    }
}

impl fmt::Display for SetGetRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sets, self.gets)
    }
}

impl FromStr for SetGetRatio {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::format(value, format!("ratio {reason}, expected N:M"));

        let (sets, gets) = value
            .trim()
            .split_once(':')
            .ok_or_else(|| invalid("has no separator"))?;
        let sets = sets.trim().parse().map_err(|_| invalid("has a non-numeric set part"))?;
        let gets = gets.trim().parse().map_err(|_| invalid("has a non-numeric get part"))?;

        Ok(Self { sets, gets })
    }
}

/// Parameters of a single operator-defined run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLoad {
    /// Payload size in bytes.
    pub payload_size: u32,
    /// Number of client threads.
    pub threads: u32,
    /// Connections per thread.
    pub clients: u32,
    /// Test duration in seconds.
    pub duration_secs: u32,
    /// Set:get ratio.
    pub ratio: SetGetRatio,
}

impl Default for CustomLoad {
    fn default() -> Self {
        Self {
            payload_size: 2000,
            threads: 2,
            clients: 2,
            duration_secs: 300,
            ratio: SetGetRatio::default(),
        }
    }
}

/// The load configuration a run was planned from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadProfile {
    /// One entry of the ordered standard matrix.
    Standard { template: String },
    /// An operator-defined run.
    Custom { template: String, load: CustomLoad },
}

impl LoadProfile {
    /// Returns the template this profile was materialized from.
    pub fn template(&self) -> &str {
        match self {
            Self::Standard { template } | Self::Custom { template, .. } => template,
        }
    }
}

/// One planned benchmark execution.
///
/// Created by the planner, consumed by the remote session and the result
/// collector, and discarded once its artifact is staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Unique within one pipeline cycle.
    pub test_id: TestId,
    /// Environment the run targets.
    pub environment: Environment,
    /// Resolved remote endpoint.
    pub endpoint: ServerEndpoint,
    /// Load parameters the command was built from.
    pub load_profile: LoadProfile,
    /// Whether the run belongs to the standard matrix.
    pub is_standard: bool,
    /// Fully materialized remote command.
    pub command: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_round_trips_through_display() {
        let ratio: SetGetRatio = "3:7".parse().unwrap();
        assert_eq!(ratio, SetGetRatio { sets: 3, gets: 7 });
        assert_eq!(ratio.to_string(), "3:7");
    }

    #[test]
    fn malformed_ratio_is_a_format_error() {
        for value in ["10", "a:b", "1:", ":2"] {
            let error = value.parse::<SetGetRatio>().unwrap_err();
            assert_eq!(error.kind(), crate::ErrorKind::Format, "{value}");
        }
    }

    #[test]
    fn custom_load_defaults() {
        let load = CustomLoad::default();
        assert_eq!(load.payload_size, 2000);
        assert_eq!(load.threads, 2);
        assert_eq!(load.clients, 2);
        assert_eq!(load.duration_secs, 300);
        assert_eq!(load.ratio.to_string(), "1:10");
    }
}
