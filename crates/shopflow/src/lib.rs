//! Shopflow: scenario-driven browser tests for a subscription shop checkout
//!
//! A scenario is data: a plan id and an ordered list of [`Step`]s. One
//! [`Harness`] runs every scenario the same way, against a clean store and a
//! fresh browser each time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      SHOPFLOW Run Lifecycle                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌───────────┐   ┌───────────┐   ┌───────────┐   ┌───────────┐  │
//! │   │ Reset     │   │ Acquire   │   │ Run steps │   │ Release   │  │
//! │   │ store     │──►│ session   │──►│ (fail     │──►│ session   │  │
//! │   │ (SQLite)  │   │ (CDP)     │   │  fast)    │   │           │  │
//! │   └───────────┘   └───────────┘   └───────────┘   └───────────┘  │
//! │          per scenario, per engine; outcomes into a RunReport      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use shopflow::{builtin_scenarios, Fixtures, Harness, HarnessConfig, MockLauncher, SqliteStore};
//!
//! # async fn run() {
//! let config = HarnessConfig::default().with_db_path("/srv/shop/data.db");
//! let scenarios = builtin_scenarios(&Fixtures::default(), config.confirmation_timeout);
//! let store = SqliteStore::new(&config.db_path);
//! let harness = Harness::new(config, MockLauncher::default(), store);
//! let report = harness.run(&scenarios).await;
//! assert!(report.all_passed());
//! # }
//! ```

#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod assertion;
mod browser;
mod config;
mod device;
mod driver;
mod fixtures;
mod locator;
mod report;
mod reset;
mod result;
mod runner;
mod scenario;
mod session;
mod snapshot;
mod step;
mod wait;

pub use assertion::{normalize_whitespace, Assertion, AssertionResult, TextMatch};
pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{CdpDriver, CdpLauncher};
pub use config::{HarnessConfig, DEFAULT_BASE_URL, DEFAULT_CONFIRMATION_TIMEOUT};
pub use device::DeviceProfile;
pub use driver::{
    BrowserEngine, Launcher, MockDriver, MockElement, MockLauncher, MockPage, PageDriver,
};
pub use fixtures::{AdminCredentials, Customer, Fixtures, TestCard};
pub use locator::{ElementState, Locator};
pub use report::{FailureDetail, RunReport, ScenarioOutcome, Stage};
pub use reset::{ResetReport, ResetTables, SqliteStore, StateStore};
pub use result::{AssertionFailure, FlowError, FlowResult};
pub use runner::{Harness, ScenarioRunner, StepFailure, StepLog, StepRecord};
pub use scenario::{
    admin_login, admin_login_rejects_bad_password, admin_logout, builtin_scenarios, AdminPage,
    CheckoutPlan, Scenario, ScenarioSet,
};
pub use session::{Session, SessionOptions, DEFAULT_ACTION_TIMEOUT};
pub use snapshot::SnapshotWriter;
pub use step::Step;
pub use wait::{wait_for_element, wait_for_element_until, POLL_INTERVAL};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        builtin_scenarios, BrowserEngine, Fixtures, FlowError, FlowResult, Harness,
        HarnessConfig, Launcher, PageDriver, RunReport, Scenario, ScenarioSet, SqliteStore,
        StateStore, Step,
    };
    #[cfg(feature = "browser")]
    pub use super::{BrowserConfig, CdpLauncher};
}
