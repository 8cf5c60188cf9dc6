//! Run planning.
//!
//! Turns the load configuration into an ordered list of [`RunSpec`]s. Every
//! run gets a freshly generated [`TestId`] and a fully materialized command,
//! so template problems surface before any remote work begins.

use cachebench_core::{
    CustomLoad, Environment, Error, LoadProfile, Result, RunSpec, ServerEndpoint, TestId,
};

use crate::TRACING_TARGET_PLANNER;
use crate::config::RemoteConfig;
use crate::template::CommandTemplate;

/// Which load configuration a cycle runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Every entry of the standard matrix, in order.
    Standard,
    /// A single operator-defined run.
    Custom(CustomLoad),
}

impl RunMode {
    /// Returns whether this is the standard matrix.
    #[inline]
    pub fn is_standard(&self) -> bool {
        matches!(self, Self::Standard)
    }
}

/// A standard-matrix entry that could not be materialized.
#[derive(Debug)]
pub struct RejectedRun {
    /// Position of the entry in the matrix.
    pub index: usize,
    /// Why it was rejected.
    pub error: Error,
}

/// Planned runs of one cycle.
#[derive(Debug, Default)]
pub struct RunPlan {
    /// Runs to execute, in order.
    pub runs: Vec<RunSpec>,
    /// Matrix entries skipped because their template was invalid.
    pub rejected: Vec<RejectedRun>,
}

impl RunPlan {
    /// Returns the number of runs to execute.
    #[inline]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns whether there is nothing to execute.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// Builds [`RunPlan`]s from a [`RemoteConfig`].
#[derive(Debug, Clone, Copy)]
pub struct RunPlanner<'a> {
    config: &'a RemoteConfig,
}

impl<'a> RunPlanner<'a> {
    /// Creates a planner over the given configuration.
    pub fn new(config: &'a RemoteConfig) -> Self {
        Self { config }
    }

    /// Plans the runs for a mode.
    pub fn plan(
        &self,
        mode: &RunMode,
        environment: Environment,
        endpoint: &ServerEndpoint,
    ) -> Result<RunPlan> {
        match mode {
            RunMode::Standard => self.plan_standard(environment, endpoint),
            RunMode::Custom(load) => self
                .plan_custom(environment, endpoint, load)
                .map(|run| RunPlan {
                    runs: vec![run],
                    rejected: Vec::new(),
                }),
        }
    }

    /// Plans one run per standard-matrix entry.
    ///
    /// An entry whose template is invalid is rejected on its own; the other
    /// entries are still planned.
    pub fn plan_standard(
        &self,
        environment: Environment,
        endpoint: &ServerEndpoint,
    ) -> Result<RunPlan> {
        if self.config.default_load.is_empty() {
            return Err(Error::configuration("defaultLoad has no entries"));
        }

        let mut plan = RunPlan::default();
        for (index, template) in self.config.default_load.iter().enumerate() {
            let test_id = TestId::generate();
            let command = CommandTemplate::parse(template)
                .and_then(|t| t.render(&[&endpoint.server_alias, &test_id]));

            match command {
                Ok(command) => plan.runs.push(RunSpec {
                    test_id,
                    environment,
                    endpoint: endpoint.clone(),
                    load_profile: LoadProfile::Standard {
                        template: template.clone(),
                    },
                    is_standard: true,
                    command,
                }),
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET_PLANNER,
                        index,
                        error = %error,
                        "Skipping standard run with invalid template"
                    );
                    plan.rejected.push(RejectedRun { index, error });
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_PLANNER,
            environment = %environment,
            planned = plan.runs.len(),
            rejected = plan.rejected.len(),
            "Planned standard runs"
        );

        Ok(plan)
    }

    /// Plans a single custom run.
    ///
    /// The custom template must take exactly seven arguments: server,
    /// clients, threads, payload size, test id, duration and ratio.
    pub fn plan_custom(
        &self,
        environment: Environment,
        endpoint: &ServerEndpoint,
        load: &CustomLoad,
    ) -> Result<RunSpec> {
        let template = CommandTemplate::parse(&self.config.custom_load)?;
        let test_id = TestId::generate();
        let command = template.render(&[
            &endpoint.server_alias,
            &load.clients,
            &load.threads,
            &load.payload_size,
            &test_id,
            &load.duration_secs,
            &load.ratio,
        ])?;

        tracing::debug!(
            target: TRACING_TARGET_PLANNER,
            environment = %environment,
            test_id = %test_id,
            "Planned custom run"
        );

        Ok(RunSpec {
            test_id,
            environment,
            endpoint: endpoint.clone(),
            load_profile: LoadProfile::Custom {
                template: self.config.custom_load.clone(),
                load: load.clone(),
            },
            is_standard: false,
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use cachebench_core::{ErrorKind, SetGetRatio};

    use super::*;

    fn config(default_load: &[&str], custom_load: &str) -> RemoteConfig {
        let document = serde_json::json!({
            "redis": {
                "defaultLoad": default_load,
                "customLoad": custom_load,
            }
        });
        RemoteConfig::from_json_str(&document.to_string(), "redis").unwrap()
    }

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::new("10.0.0.2", "lab", "lab-cache")
    }

    #[test]
    fn standard_mode_yields_one_run_per_entry_with_distinct_ids() {
        let templates = ["cmd_a {0} {1}", "cmd_b {0} {1}", "cmd_c {1} {0}", "cmd_d {0} {1}"];
        let config = config(&templates, "");
        let plan = RunPlanner::new(&config)
            .plan(&RunMode::Standard, Environment::Lab, &endpoint())
            .unwrap();

        assert_eq!(plan.len(), templates.len());
        let ids: HashSet<_> = plan.runs.iter().map(|r| r.test_id.clone()).collect();
        assert_eq!(ids.len(), templates.len());

        let first = &plan.runs[0];
        assert!(first.is_standard);
        assert_eq!(first.command, format!("cmd_a lab-cache {}", first.test_id));
        assert_eq!(first.load_profile.template(), "cmd_a {0} {1}");
    }

    #[test]
    fn invalid_standard_entry_is_rejected_alone() {
        let config = config(&["cmd_a {0} {1}", "cmd_b {0} {1} {2}", "cmd_c {0} {1}"], "");
        let plan = RunPlanner::new(&config)
            .plan_standard(Environment::Gating, &endpoint())
            .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.rejected.len(), 1);
        assert_eq!(plan.rejected[0].index, 1);
        assert_eq!(plan.rejected[0].error.kind(), ErrorKind::Format);
    }

    #[test]
    fn empty_matrix_is_configuration_error() {
        let config = config(&[], "");
        let error = RunPlanner::new(&config)
            .plan_standard(Environment::Lab, &endpoint())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn custom_mode_substitutes_all_seven_slots() {
        let config = config(&[], "bench -s {0} -c {1} -t {2} -d {3} -o {4} --time {5} --ratio {6}");
        let load = CustomLoad {
            payload_size: 512,
            threads: 4,
            clients: 8,
            duration_secs: 60,
            ratio: SetGetRatio { sets: 1, gets: 4 },
        };

        let run = RunPlanner::new(&config)
            .plan_custom(Environment::Custom, &endpoint(), &load)
            .unwrap();

        assert!(!run.is_standard);
        assert_eq!(
            run.command,
            format!("bench -s lab-cache -c 8 -t 4 -d 512 -o {} --time 60 --ratio 1:4", run.test_id)
        );
    }

    #[test]
    fn custom_template_with_wrong_arity_fails_before_remote_work() {
        let config = config(&[], "bench -s {0} -c {1} -t {2} -d {3} -o {4} --time {5}");
        let error = RunPlanner::new(&config)
            .plan(&RunMode::Custom(CustomLoad::default()), Environment::Lab, &endpoint())
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Format);
    }
}
