//! Scenario execution.
//!
//! [`ScenarioRunner`] walks one scenario's steps against an acquired
//! [`Session`]. [`Harness`] wraps it with the per-scenario lifecycle:
//! reset the store, acquire a session, run, release, record the outcome.

use crate::assertion::{Assertion, TextMatch};
use crate::config::HarnessConfig;
use crate::driver::{BrowserEngine, Launcher, PageDriver};
use crate::locator::{ElementState, Locator};
use crate::report::{FailureDetail, RunReport, ScenarioOutcome, Stage};
use crate::reset::{ResetReport, StateStore};
use crate::result::{AssertionFailure, FlowError, FlowResult};
use crate::scenario::Scenario;
use crate::session::Session;
use crate::snapshot::SnapshotWriter;
use crate::step::Step;
use crate::wait::{wait_for_element_until, POLL_INTERVAL};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// A step that completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub index: usize,
    pub description: String,
    pub duration: Duration,
}

/// What a scenario run did, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepLog {
    pub records: Vec<StepRecord>,
    /// Snapshot files written, including any failure capture
    pub snapshots: Vec<PathBuf>,
}

impl StepLog {
    /// Number of completed steps
    #[must_use]
    pub fn completed(&self) -> usize {
        self.records.len()
    }
}

/// The first step that failed, and everything that ran before it
#[derive(Debug)]
pub struct StepFailure {
    /// Zero-based index of the failing step
    pub index: usize,
    pub step: Step,
    pub error: FlowError,
    pub log: StepLog,
}

impl StepFailure {
    fn detail(&self) -> FailureDetail {
        FailureDetail {
            stage: Stage::Step,
            step_index: Some(self.index),
            step: Some(self.step.describe()),
            locator: self.step.locator().map(ToString::to_string),
            kind: self.error.kind().to_string(),
            message: self.error.to_string(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Executes a scenario's steps in order, stopping at the first failure
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    config: HarnessConfig,
    snapshots: SnapshotWriter,
}

impl ScenarioRunner {
    /// Runner resolving paths and writing snapshots as `config` says
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        let snapshots = SnapshotWriter::new(config.snapshot_dir.clone());
        Self { config, snapshots }
    }

    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every step of `scenario` in `session`
    ///
    /// On failure a `failed-step-<n>` snapshot is attempted before returning.
    pub async fn run<D: PageDriver>(
        &self,
        scenario: &Scenario,
        session: &mut Session<D>,
    ) -> Result<StepLog, StepFailure> {
        let mut log = StepLog::default();

        for (index, step) in scenario.steps.iter().enumerate() {
            let started = Instant::now();
            let timeout = session.timeout_for(step.timeout_override());
            debug!(index, step = %step.describe(), timeout_ms = millis(timeout), "step");

            match self
                .execute(scenario, index, step, session, timeout, &mut log)
                .await
            {
                Ok(()) => log.records.push(StepRecord {
                    index,
                    description: step.describe(),
                    duration: started.elapsed(),
                }),
                Err(error) => {
                    warn!(index, step = %step.describe(), kind = error.kind(), "{error}");
                    let label = format!("failed-step-{index}");
                    let deadline = StepDeadline::new(session.timeout_for(None));
                    if let Some(path) = self
                        .snapshot(session.driver(), &scenario.id, &label, deadline)
                        .await
                    {
                        log.snapshots.push(path);
                    }
                    return Err(StepFailure {
                        index,
                        step: step.clone(),
                        error,
                        log,
                    });
                }
            }
        }
        Ok(log)
    }

    async fn execute<D: PageDriver>(
        &self,
        scenario: &Scenario,
        index: usize,
        step: &Step,
        session: &mut Session<D>,
        timeout: Duration,
        log: &mut StepLog,
    ) -> FlowResult<()> {
        let deadline = StepDeadline::new(timeout);
        match step {
            Step::Navigate { path, .. } => {
                let url = self.config.resolve_url(path);
                deadline
                    .navigation(&url, session.driver_mut().goto(&url))
                    .await
            }
            Step::Fill {
                selector, value, ..
            } => {
                deadline
                    .wait_for(session.driver(), selector, ElementState::Actionable)
                    .await?;
                deadline
                    .action(selector, "filled", session.driver_mut().fill(selector, value))
                    .await
            }
            Step::Click {
                selector,
                navigates,
                ..
            } => {
                deadline
                    .wait_for(session.driver(), selector, ElementState::Actionable)
                    .await?;
                if !*navigates {
                    return deadline
                        .action(selector, "clicked", session.driver_mut().click(selector))
                        .await;
                }
                let url = deadline
                    .navigation("current page", session.driver().current_url())
                    .await?;
                deadline
                    .navigation(&url, session.driver_mut().mark_document())
                    .await?;
                deadline
                    .action(selector, "clicked", session.driver_mut().click(selector))
                    .await?;
                deadline.new_document(session.driver(), &url).await?;
                deadline
                    .navigation(&url, session.driver_mut().wait_for_navigation())
                    .await
            }
            Step::AssertText {
                selector,
                expected,
                matching,
                ..
            } => {
                deadline
                    .wait_for(session.driver(), selector, ElementState::Attached)
                    .await?;
                let actual = deadline
                    .action(selector, "read", session.driver().text_content(selector))
                    .await?;
                let check = match matching {
                    TextMatch::Exact => "text",
                    TextMatch::Normalized => "normalized text",
                };
                let passed = actual
                    .as_deref()
                    .is_some_and(|text| Assertion::text_matches(text, expected, *matching).passed);
                if passed {
                    Ok(())
                } else {
                    Err(assertion(index, selector, expected, actual, check))
                }
            }
            Step::AssertNotText {
                selector,
                unexpected,
            } => {
                let actual = deadline
                    .action(selector, "read", session.driver().text_content(selector))
                    .await?;
                if Assertion::text_differs(actual.as_deref(), unexpected).passed {
                    Ok(())
                } else {
                    Err(assertion(index, selector, unexpected, actual, "text other than"))
                }
            }
            Step::AssertAbsent { selector } => {
                let state = deadline
                    .action(selector, "checked", session.driver().element_state(selector))
                    .await?;
                if state == ElementState::Missing {
                    Ok(())
                } else {
                    let actual = deadline
                        .action(selector, "read", session.driver().text_content(selector))
                        .await?;
                    Err(assertion(index, selector, "<absent>", actual, "absence of"))
                }
            }
            Step::Snapshot { label } => {
                if let Some(path) = self
                    .snapshot(session.driver(), &scenario.id, label, deadline)
                    .await
                {
                    log.snapshots.push(path);
                }
                Ok(())
            }
        }
    }

    async fn snapshot<D: PageDriver>(
        &self,
        driver: &D,
        scenario_id: &str,
        label: &str,
        deadline: StepDeadline,
    ) -> Option<PathBuf> {
        let capture = self.snapshots.capture(driver, scenario_id, label);
        match tokio::time::timeout_at(deadline.at, capture).await {
            Ok(path) => path,
            Err(_) => {
                warn!(label, timeout_ms = millis(deadline.budget), "snapshot timed out");
                None
            }
        }
    }
}

/// Deadline shared by every browser call one step makes
#[derive(Debug, Clone, Copy)]
struct StepDeadline {
    at: tokio::time::Instant,
    budget: Duration,
}

impl StepDeadline {
    fn new(budget: Duration) -> Self {
        Self {
            at: tokio::time::Instant::now() + budget,
            budget,
        }
    }

    async fn wait_for<D: PageDriver>(
        &self,
        driver: &D,
        locator: &Locator,
        required: ElementState,
    ) -> FlowResult<ElementState> {
        wait_for_element_until(driver, locator, required, self.at, self.budget).await
    }

    /// Run an element action, failing with `ElementTimeout` at the deadline
    async fn action<T, F>(&self, locator: &Locator, state: &str, call: F) -> FlowResult<T>
    where
        F: Future<Output = FlowResult<T>>,
    {
        tokio::time::timeout_at(self.at, call)
            .await
            .unwrap_or_else(|_| {
                Err(FlowError::ElementTimeout {
                    selector: locator.to_string(),
                    state: state.to_string(),
                    ms: millis(self.budget),
                })
            })
    }

    /// Run a navigation call, failing with `NavigationTimeout` at the deadline
    async fn navigation<T, F>(&self, url: &str, call: F) -> FlowResult<T>
    where
        F: Future<Output = FlowResult<T>>,
    {
        tokio::time::timeout_at(self.at, call)
            .await
            .unwrap_or_else(|_| {
                Err(FlowError::NavigationTimeout {
                    url: url.to_string(),
                    ms: millis(self.budget),
                })
            })
    }

    /// Poll until the document marked before a click has been replaced
    ///
    /// Read errors mean the old context is gone mid-navigation and are retried.
    async fn new_document<D: PageDriver>(&self, driver: &D, url: &str) -> FlowResult<()> {
        loop {
            match self.navigation(url, driver.document_marked()).await {
                Ok(false) => return Ok(()),
                Ok(true) => {}
                Err(e) if e.is_timeout() => return Err(e),
                Err(e) => trace!(error = %e, "document check failed"),
            }
            let now = tokio::time::Instant::now();
            if now >= self.at {
                return Err(FlowError::NavigationTimeout {
                    url: url.to_string(),
                    ms: millis(self.budget),
                });
            }
            tokio::time::sleep_until(self.at.min(now + POLL_INTERVAL)).await;
        }
    }
}

fn assertion(
    step_index: usize,
    locator: &Locator,
    expected: &str,
    actual: Option<String>,
    check: &'static str,
) -> FlowError {
    FlowError::Assertion(AssertionFailure {
        step_index,
        locator: locator.to_string(),
        expected: expected.to_string(),
        actual,
        check,
    })
}

/// Runs scenarios end to end: reset, launch, steps, release
#[derive(Debug)]
pub struct Harness<L, S> {
    runner: ScenarioRunner,
    launcher: L,
    store: Arc<S>,
}

impl<L, S> Harness<L, S>
where
    L: Launcher,
    S: StateStore + 'static,
{
    /// Harness over a launcher and a store
    #[must_use]
    pub fn new(config: HarnessConfig, launcher: L, store: S) -> Self {
        Self {
            runner: ScenarioRunner::new(config),
            launcher,
            store: Arc::new(store),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        self.runner.config()
    }

    #[must_use]
    pub const fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Clear the store on the blocking pool
    pub async fn reset(&self) -> FlowResult<ResetReport> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.reset())
            .await
            .map_err(|e| FlowError::StoreReset {
                message: e.to_string(),
            })?
    }

    /// Run every scenario on every configured engine
    pub async fn run(&self, scenarios: &[Scenario]) -> RunReport {
        self.run_with(scenarios, |_| {}).await
    }

    /// Like [`Harness::run`], calling `on_outcome` after each execution
    pub async fn run_with<F>(&self, scenarios: &[Scenario], mut on_outcome: F) -> RunReport
    where
        F: FnMut(&ScenarioOutcome),
    {
        let started = Instant::now();
        let mut report = RunReport::new();
        info!(run_id = %report.run_id, scenarios = scenarios.len(), "run started");

        'scenarios: for scenario in scenarios {
            for &engine in &self.config().engines {
                let outcome = self.run_scenario(scenario, engine).await;
                on_outcome(&outcome);
                let failed = !outcome.passed;
                report.push(outcome);
                if failed && self.config().fail_fast {
                    warn!(scenario = %scenario.id, "stopping after first failure");
                    break 'scenarios;
                }
            }
        }

        report.duration_ms = millis(started.elapsed());
        info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            duration_ms = report.duration_ms,
            "run finished"
        );
        report
    }

    /// Run one scenario on one engine from a clean store
    pub async fn run_scenario(&self, scenario: &Scenario, engine: BrowserEngine) -> ScenarioOutcome {
        let span = info_span!("scenario", id = %scenario.id, %engine);
        self.run_scenario_inner(scenario, engine).instrument(span).await
    }

    async fn run_scenario_inner(&self, scenario: &Scenario, engine: BrowserEngine) -> ScenarioOutcome {
        let started = Instant::now();
        let mut outcome = ScenarioOutcome::new(&scenario.id, scenario.plan.clone(), engine);
        outcome.steps_total = scenario.steps.len();
        info!("scenario started");

        if let Err(e) = self.reset().await {
            outcome.failure = Some(stage_failure(Stage::Reset, &e));
            return finish(outcome, started);
        }

        let mut session = match Session::acquire(
            &self.launcher,
            engine,
            self.config().session_options(),
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                outcome.failure = Some(stage_failure(Stage::Launch, &e));
                return finish(outcome, started);
            }
        };

        let result = self.runner.run(scenario, &mut session).await;
        let released = session.release().await;

        match result {
            Ok(log) => {
                outcome.steps_completed = log.completed();
                outcome.snapshots = log.snapshots;
                outcome.passed = true;
            }
            Err(failure) => {
                outcome.steps_completed = failure.log.completed();
                outcome.failure = Some(failure.detail());
                outcome.snapshots = failure.log.snapshots;
            }
        }

        if let Err(e) = released {
            if outcome.passed {
                outcome.passed = false;
                outcome.failure = Some(stage_failure(Stage::Release, &e));
            } else {
                warn!(error = %e, "session release failed");
            }
        }

        finish(outcome, started)
    }
}

fn stage_failure(stage: Stage, error: &FlowError) -> FailureDetail {
    FailureDetail {
        stage,
        step_index: None,
        step: None,
        locator: None,
        kind: error.kind().to_string(),
        message: error.to_string(),
    }
}

fn finish(mut outcome: ScenarioOutcome, started: Instant) -> ScenarioOutcome {
    outcome.duration_ms = millis(started.elapsed());
    match &outcome.failure {
        None => info!(steps = outcome.steps_completed, "scenario passed"),
        Some(failure) => warn!(%failure, "scenario failed"),
    }
    outcome
}
