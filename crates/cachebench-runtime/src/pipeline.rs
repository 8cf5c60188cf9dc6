//! One benchmark cycle: configure, run remotely, collect, ingest.

use std::path::PathBuf;
use std::sync::Arc;

use cachebench_core::{
    ArtifactFile, Environment, Error, PipelineContext, PipelineStage, PipelineState, Prompter,
    RemoteConnector, RemoteSession, Result, ServerEndpoint, Unattended,
};
use cachebench_ingest::{IngestionConfig, IngestionPhase, WarehouseConnector};
use cachebench_remote::{
    BoundedConnector, CustomEndpoint, RemoteConfig, ResultCollector, RunMode, RunPlan, RunPlanner,
};

use crate::TRACING_TARGET_CYCLE;
use crate::report::{CycleReport, PhaseOutcome};
use crate::staging::StagingDirectory;
use crate::transport::TransportFactory;

const DEFAULT_SETTINGS_PATH: &str = "appsettings.json";
const DEFAULT_SECTION: &str = "redis";
const DEFAULT_INGEST_SETTINGS_PATH: &str = "kustoSettings.json";
const DEFAULT_STAGING_DIR: &str = "./Results";

/// Where a pipeline reads its settings and stages its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Benchmark settings file holding the remote configuration.
    pub settings_path: PathBuf,
    /// Section of the settings file to read, matched case-insensitively.
    pub section: String,
    /// Ingestion settings file.
    pub ingest_settings_path: PathBuf,
    /// Local directory result files are downloaded into.
    pub staging_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
            section: DEFAULT_SECTION.to_owned(),
            ingest_settings_path: PathBuf::from(DEFAULT_INGEST_SETTINGS_PATH),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
        }
    }
}

/// Operator choices for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOptions {
    pub environment: Environment,
    pub mode: RunMode,
    /// Endpoint used when `environment` is [`Environment::Custom`].
    pub custom: CustomEndpoint,
}

impl CycleOptions {
    /// Runs the standard matrix against a configured environment.
    pub fn standard(environment: Environment) -> Self {
        Self {
            environment,
            mode: RunMode::Standard,
            custom: CustomEndpoint::default(),
        }
    }
}

/// Everything resolved before the first remote operation.
struct CyclePlan {
    remote: RemoteConfig,
    ingest: IngestionConfig,
    endpoint: ServerEndpoint,
    private_key: Option<PathBuf>,
    plan: RunPlan,
    install_command: String,
}

/// Runs benchmark cycles.
///
/// A pipeline is reusable: every call to [`Pipeline::run_cycle`] reloads the
/// settings, clears the staging directory and starts from a fresh
/// [`PipelineContext`].
pub struct Pipeline {
    settings: PipelineSettings,
    staging: StagingDirectory,
    transport: Box<dyn TransportFactory>,
    warehouse: Box<dyn WarehouseConnector>,
    prompter: Arc<dyn Prompter>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline that never waits for the operator.
    pub fn new(
        settings: PipelineSettings,
        transport: impl TransportFactory + 'static,
        warehouse: impl WarehouseConnector + 'static,
    ) -> Self {
        Self {
            staging: StagingDirectory::new(&settings.staging_dir),
            settings,
            transport: Box::new(transport),
            warehouse: Box::new(warehouse),
            prompter: Arc::new(Unattended),
        }
    }

    /// Sets the prompter used when the ingestion settings ask to wait.
    #[must_use]
    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    #[inline]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    #[inline]
    pub fn staging(&self) -> &StagingDirectory {
        &self.staging
    }

    /// Runs one cycle.
    ///
    /// Failures are not returned as errors: they end the cycle in
    /// [`PipelineState::Failed`] and are described by the report.
    pub async fn run_cycle(&self, options: &CycleOptions) -> CycleReport {
        let mut report = CycleReport::new(options.environment);
        tracing::info!(
            target: TRACING_TARGET_CYCLE,
            environment = %options.environment,
            standard = options.mode.is_standard(),
            "Benchmark cycle started"
        );

        let cycle = match self.prepare(options).await {
            Ok(cycle) => cycle,
            Err(error) => {
                let mut context = PipelineContext::new(self.prompter.clone());
                fail(&mut context, &mut report, PipelineStage::Idle, &error);
                return finish(report, &context);
            }
        };

        report.planned = cycle.plan.len() + cycle.plan.rejected.len();
        report.rejected = cycle.plan.rejected.len();

        let mut context = PipelineContext::new(self.prompter.clone())
            .with_wait_for_user(cycle.ingest.wait_for_user);

        let mut collected = Vec::with_capacity(cycle.plan.len());
        let remote = self
            .remote_phase(&cycle, &mut context, &mut report, &mut collected)
            .await;
        let proceed = remote.can_continue();
        report.remote = Some(remote);

        if proceed {
            let ingestion = self
                .ingestion_phase(&cycle, collected, &mut context, &mut report)
                .await;
            report.ingestion = Some(ingestion);
        }

        finish(report, &context)
    }

    /// Loads settings, plans the runs and clears the staging directory.
    async fn prepare(&self, options: &CycleOptions) -> Result<CyclePlan> {
        let remote = RemoteConfig::load(&self.settings.settings_path, &self.settings.section)?;
        let ingest = IngestionConfig::load(&self.settings.ingest_settings_path)?;

        let endpoint = remote.endpoint(options.environment, &options.custom)?;
        let private_key = remote.private_key(options.environment, &options.custom);
        let plan = RunPlanner::new(&remote).plan(&options.mode, options.environment, &endpoint)?;
        let install_command = remote.install_command()?;

        for rejected in &plan.rejected {
            tracing::warn!(
                target: TRACING_TARGET_CYCLE,
                index = rejected.index,
                error = %rejected.error,
                "Skipping invalid load entry"
            );
        }

        self.staging.prepare().await?;

        Ok(CyclePlan {
            remote,
            ingest,
            endpoint,
            private_key,
            plan,
            install_command,
        })
    }

    async fn remote_phase(
        &self,
        cycle: &CyclePlan,
        context: &mut PipelineContext,
        report: &mut CycleReport,
        collected: &mut Vec<ArtifactFile>,
    ) -> PhaseOutcome {
        context.transition(PipelineState::Connecting);

        let connector = BoundedConnector::new(
            self.transport.connector(cycle.private_key.as_deref()),
            cycle.remote.command_timeout(),
        );
        let mut session = match connector.open(&cycle.endpoint).await {
            Ok(session) => session,
            Err(error) => return fail(context, report, PipelineStage::Connecting, &error),
        };

        tracing::info!(
            target: TRACING_TARGET_CYCLE,
            host = %cycle.endpoint.host,
            user = %cycle.endpoint.user,
            "Connected to benchmark host"
        );

        let outcome = self
            .run_benchmarks(session.as_ref(), cycle, context, report, collected)
            .await;

        if let Err(error) = session.close().await {
            tracing::warn!(
                target: TRACING_TARGET_CYCLE,
                error = %error,
                "Failed to close remote session"
            );
        }

        outcome
    }

    /// Installs the tool, then runs every planned command and downloads
    /// its result, whether or not the command succeeded.
    ///
    /// Downloaded artifacts are appended to `collected` in run order.
    async fn run_benchmarks(
        &self,
        session: &dyn RemoteSession,
        cycle: &CyclePlan,
        context: &mut PipelineContext,
        report: &mut CycleReport,
        collected: &mut Vec<ArtifactFile>,
    ) -> PhaseOutcome {
        context.transition(PipelineState::Installing);
        let installed = session
            .run(&cycle.install_command)
            .await
            .and_then(|output| output.into_result("install script"));
        match installed {
            Ok(_) => tracing::info!(target: TRACING_TARGET_CYCLE, "Benchmark tool installed"),
            Err(error) if !error.is_fatal_for_cycle() => tracing::warn!(
                target: TRACING_TARGET_CYCLE,
                error = %error,
                "Install script failed, continuing with the installed tool"
            ),
            Err(error) => return fail(context, report, PipelineStage::Installing, &error),
        }

        let collector = ResultCollector::new(&cycle.remote.tool_directory);
        let total = cycle.plan.len();
        let mut missing = cycle.plan.rejected.len();

        for (index, run) in cycle.plan.runs.iter().enumerate() {
            let position = index + 1;

            context.transition(PipelineState::Running {
                run: position,
                total,
            });
            let executed = session
                .run(&run.command)
                .await
                .and_then(|output| output.into_result(&run.command));
            match executed {
                Ok(output) => tracing::info!(
                    target: TRACING_TARGET_CYCLE,
                    test_id = %run.test_id,
                    output = %output.stdout.trim_end(),
                    "Benchmark run finished"
                ),
                Err(error) if !error.is_fatal_for_cycle() => {
                    tracing::warn!(
                        target: TRACING_TARGET_CYCLE,
                        test_id = %run.test_id,
                        error = %error,
                        "Benchmark run failed"
                    );
                    report.failed_commands.push(run.test_id.clone());
                }
                Err(error) => return fail(context, report, PipelineStage::Running, &error),
            }

            context.transition(PipelineState::Collecting {
                run: position,
                total,
            });
            let fetched = collector
                .collect(session, &run.endpoint, &run.test_id, self.staging.path())
                .await;
            match fetched {
                Ok(artifact) => {
                    report.staged += 1;
                    collected.push(artifact);
                }
                Err(error) if !error.is_fatal_for_cycle() => {
                    tracing::warn!(
                        target: TRACING_TARGET_CYCLE,
                        test_id = %run.test_id,
                        error = %error,
                        "Result file is missing, skipping it"
                    );
                    missing += 1;
                }
                Err(error) => return fail(context, report, PipelineStage::Collecting, &error),
            }
        }

        if missing == 0 {
            PhaseOutcome::Completed
        } else {
            PhaseOutcome::Degraded { missing }
        }
    }

    async fn ingestion_phase(
        &self,
        cycle: &CyclePlan,
        collected: Vec<ArtifactFile>,
        context: &mut PipelineContext,
        report: &mut CycleReport,
    ) -> PhaseOutcome {
        let warehouse = match self.warehouse.connect(&cycle.ingest).await {
            Ok(warehouse) => warehouse,
            Err(error) => return fail(context, report, PipelineStage::SchemaCheck, &error),
        };

        let summary = IngestionPhase::new(&cycle.ingest)
            .run(warehouse.as_ref(), context, collected)
            .await;

        match summary {
            Ok(summary) => {
                report.ingested = summary.ingested.len();
                report.row_count = summary.rows_after;
                context.transition(PipelineState::Done);
                PhaseOutcome::Completed
            }
            Err(failure) => {
                report.ingested = failure.ingested.len();
                let stage = context.state().stage();
                fail(context, report, stage, &failure.error)
            }
        }
    }
}

fn fail(
    context: &mut PipelineContext,
    report: &mut CycleReport,
    stage: PipelineStage,
    error: &Error,
) -> PhaseOutcome {
    tracing::error!(
        target: TRACING_TARGET_CYCLE,
        stage = %stage,
        kind = %error.kind(),
        error = %error,
        "Benchmark cycle failed"
    );

    let reason = error.to_string();
    report.error_kind = Some(error.kind());
    context.transition(PipelineState::Failed {
        stage,
        reason: reason.clone(),
    });

    PhaseOutcome::Failed { stage, reason }
}

fn finish(mut report: CycleReport, context: &PipelineContext) -> CycleReport {
    report.finish(context.state().clone());
    tracing::info!(
        target: TRACING_TARGET_CYCLE,
        state = %report.state,
        planned = report.planned,
        staged = report.staged,
        ingested = report.ingested,
        failed_commands = report.failed_commands.len(),
        "Benchmark cycle finished"
    );
    report
}
