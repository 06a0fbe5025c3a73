//! Command execution: scenario loading, store reset and harness runs

use crate::commands::{ListArgs, ResetArgs, RunArgs, ScenarioSourceArgs, ShowArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use shopflow::{
    builtin_scenarios, AdminCredentials, Fixtures, HarnessConfig, RunReport, Scenario,
    ScenarioSet, SqliteStore, StateStore,
};
use std::time::Duration;
use tracing::debug;

/// Built-in scenarios, or the ones in `--scenarios-file`
pub fn load_scenarios(
    source: &ScenarioSourceArgs,
    admin: AdminCredentials,
    confirmation_timeout: Duration,
) -> CliResult<ScenarioSet> {
    match source.scenarios_file {
        Some(ref path) => {
            debug!(path = %path.display(), "loading scenario file");
            ScenarioSet::load(path).map_err(|e| {
                CliError::config(format!("{}: {e}", path.display()))
            })
        }
        None => {
            let fixtures = Fixtures {
                admin,
                ..Fixtures::default()
            };
            Ok(ScenarioSet::new(builtin_scenarios(
                &fixtures,
                confirmation_timeout,
            )))
        }
    }
}

/// One `list` row: `id  plan  steps  description`
#[must_use]
pub fn list_line(scenario: &Scenario) -> String {
    format!(
        "{:<34} {:<26} {:>3} steps  {}",
        scenario.id,
        scenario.plan.as_deref().unwrap_or("-"),
        scenario.steps.len(),
        scenario.description
    )
}

/// Runs CLI commands against the shopflow library
#[derive(Debug)]
pub struct FlowRunner {
    config: CliConfig,
    reporter: ProgressReporter,
}

impl FlowRunner {
    /// Create a new runner
    #[must_use]
    pub fn new(config: CliConfig) -> Self {
        let reporter =
            ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
        Self { config, reporter }
    }

    /// Get the configuration
    #[must_use]
    pub const fn config(&self) -> &CliConfig {
        &self.config
    }

    /// Print every available scenario
    pub fn list(&self, args: &ListArgs) -> CliResult<()> {
        let set = load_scenarios(
            &args.source,
            AdminCredentials::default(),
            shopflow::DEFAULT_CONFIRMATION_TIMEOUT,
        )?;
        for scenario in &set.scenarios {
            println!("{}", list_line(scenario));
        }
        Ok(())
    }

    /// Print one scenario as a loadable YAML scenario file
    pub fn show(&self, args: &ShowArgs) -> CliResult<()> {
        let set = load_scenarios(
            &args.source,
            AdminCredentials::default(),
            shopflow::DEFAULT_CONFIRMATION_TIMEOUT,
        )?;
        let scenario = set
            .find(&args.id)
            .cloned()
            .ok_or_else(|| CliError::invalid_argument(format!("unknown scenario '{}'", args.id)))?;
        print!("{}", ScenarioSet::new(vec![scenario]).to_yaml()?);
        Ok(())
    }

    /// Clear the shop database once
    pub fn reset(&self, args: &ResetArgs) -> CliResult<()> {
        let store = SqliteStore::new(&args.store.db_path);
        let report = store.reset()?;
        for (table, rows) in &report.deleted {
            self.reporter
                .info(&format!("{table}: deleted {rows} row(s)"));
        }
        self.reporter.success(&format!(
            "Reset {} ({} rows removed)",
            store.path().display(),
            report.total()
        ));
        Ok(())
    }

    /// Run the selected scenarios on every requested engine
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ScenariosFailed`] when any run fails, after the
    /// report has been printed and written.
    pub fn run(&mut self, args: &RunArgs) -> CliResult<RunReport> {
        let config = args.harness_config()?;
        let scenarios = load_scenarios(&args.source, args.admin(), config.confirmation_timeout)?
            .select(&args.scenarios)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let planned = scenarios.len() * config.engines.len();
        let report = runtime.block_on(self.execute(config, &scenarios))?;

        self.reporter.finish();
        let failures = report.failures();
        if !failures.is_empty() {
            self.reporter.header("Failures");
            for outcome in failures {
                self.reporter.outcome(outcome);
            }
        }
        let duration = Duration::from_millis(report.duration_ms);
        self.reporter.summary(
            report.passed_count(),
            report.failed_count(),
            planned.saturating_sub(report.total()),
            duration,
        );

        if let Some(ref path) = args.report {
            report.write_json(path)?;
            self.reporter
                .info(&format!("Report written to {}", path.display()));
        }

        if report.all_passed() {
            Ok(report)
        } else {
            Err(CliError::ScenariosFailed {
                failed: report.failed_count(),
                total: report.total(),
            })
        }
    }

    #[cfg(feature = "browser")]
    async fn execute(
        &mut self,
        config: HarnessConfig,
        scenarios: &[Scenario],
    ) -> CliResult<RunReport> {
        use shopflow::{BrowserConfig, CdpLauncher, Harness};

        let launcher = CdpLauncher::new(BrowserConfig::from(&config));
        let store = SqliteStore::new(&config.db_path);

        self.reporter.header(&format!(
            "Running {} scenario(s) against {}",
            scenarios.len(),
            config.base_url
        ));
        let planned = scenarios.len() * config.engines.len();
        self.reporter
            .start_progress(planned as u64, "starting");

        let harness = Harness::new(config, launcher, store);
        let reporter = &self.reporter;
        let report = harness
            .run_with(scenarios, |outcome| {
                reporter.outcome(outcome);
                reporter.increment(1);
                reporter.set_message(&outcome.label());
            })
            .await;
        Ok(report)
    }

    #[cfg(not(feature = "browser"))]
    #[allow(clippy::unused_async)]
    async fn execute(
        &mut self,
        _config: HarnessConfig,
        _scenarios: &[Scenario],
    ) -> CliResult<RunReport> {
        Err(CliError::BrowserUnavailable)
    }
}
