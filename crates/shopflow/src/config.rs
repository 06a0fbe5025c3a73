//! Harness configuration.

use crate::device::DeviceProfile;
use crate::driver::BrowserEngine;
use crate::fixtures::AdminCredentials;
use crate::reset::ResetTables;
use crate::result::{FlowError, FlowResult};
use crate::session::{SessionOptions, DEFAULT_ACTION_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

/// Default address of the shop under test
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default wait for the order confirmation page
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a harness run needs to know about its environment
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Shop base URL, without trailing slash
    pub base_url: String,
    /// Shop SQLite database
    pub db_path: PathBuf,
    /// Tables cleared before each scenario
    pub reset_tables: ResetTables,
    /// Admin login
    pub admin: AdminCredentials,
    /// Engines each scenario runs against
    pub engines: Vec<BrowserEngine>,
    /// Default per-action wait
    pub default_timeout: Duration,
    /// Wait for the order confirmation title
    pub confirmation_timeout: Duration,
    /// Run without a visible window
    pub headless: bool,
    /// Device to emulate
    pub device: Option<DeviceProfile>,
    /// Snapshot root
    pub snapshot_dir: PathBuf,
    /// Chromium executable; auto-detected when `None`
    pub chromium_path: Option<PathBuf>,
    /// Keep Chromium's sandbox enabled
    pub sandbox: bool,
    /// Stop after the first failed scenario
    pub fail_fast: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            db_path: PathBuf::from("shop.db"),
            reset_tables: ResetTables::default(),
            admin: AdminCredentials::default(),
            engines: vec![BrowserEngine::Chromium],
            default_timeout: DEFAULT_ACTION_TIMEOUT,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            headless: true,
            device: None,
            snapshot_dir: PathBuf::from("snapshots"),
            chromium_path: None,
            sandbox: true,
            fail_fast: false,
        }
    }
}

impl HarnessConfig {
    /// Set the shop base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the database path
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Set the admin login
    #[must_use]
    pub fn with_admin(mut self, admin: AdminCredentials) -> Self {
        self.admin = admin;
        self
    }

    /// Set the engines
    #[must_use]
    pub fn with_engines(mut self, engines: Vec<BrowserEngine>) -> Self {
        self.engines = engines;
        self
    }

    /// Set the default per-action wait
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the order confirmation wait
    #[must_use]
    pub const fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Emulate a device
    #[must_use]
    pub fn with_device(mut self, device: Option<DeviceProfile>) -> Self {
        self.device = device;
        self
    }

    /// Set the snapshot root
    #[must_use]
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = dir.into();
        self
    }

    /// Use a specific Chromium binary
    #[must_use]
    pub fn with_chromium_path(mut self, path: Option<PathBuf>) -> Self {
        self.chromium_path = path;
        self
    }

    /// Enable or disable Chromium's sandbox
    #[must_use]
    pub const fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Stop at the first failed scenario
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Options for sessions created under this config
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            default_timeout: self.default_timeout,
            device: self.device.clone(),
        }
    }

    /// Resolve a step path against the base URL; absolute URLs pass through
    #[must_use]
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> FlowResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(FlowError::config(format!(
                "base URL must be http(s): '{}'",
                self.base_url
            )));
        }
        if self.engines.is_empty() {
            return Err(FlowError::config("no browser engines selected"));
        }
        if self.default_timeout.is_zero() {
            return Err(FlowError::config("default timeout must be positive"));
        }
        Ok(())
    }
}
