//! Browser sessions scoped to one scenario execution.

use crate::device::DeviceProfile;
use crate::driver::{BrowserEngine, Launcher, PageDriver};
use crate::result::FlowResult;
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-action wait ceiling
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Options applied when a session is acquired
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Wait ceiling for steps without their own override
    pub default_timeout: Duration,
    /// Device to emulate, if any
    pub device: Option<DeviceProfile>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_ACTION_TIMEOUT,
            device: None,
        }
    }
}

impl SessionOptions {
    /// Set the default action timeout
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Emulate `device`
    #[must_use]
    pub fn with_device(mut self, device: DeviceProfile) -> Self {
        self.device = Some(device);
        self
    }
}

/// One browser page owned by one scenario execution
///
/// Sessions are created with [`Session::acquire`] and must be handed back
/// through [`Session::release`]; dropping an unreleased session only logs.
#[derive(Debug)]
pub struct Session<D: PageDriver> {
    engine: BrowserEngine,
    options: SessionOptions,
    driver: D,
    released: bool,
}

impl<D: PageDriver> Session<D> {
    /// Launch a fresh browser page for `engine`
    pub async fn acquire<L>(launcher: &L, engine: BrowserEngine, options: SessionOptions) -> FlowResult<Self>
    where
        L: Launcher<Driver = D>,
    {
        let driver = launcher.launch(engine, &options).await?;
        debug!(%engine, timeout_ms = options.default_timeout.as_millis() as u64, "session acquired");
        Ok(Self {
            engine,
            options,
            driver,
            released: false,
        })
    }

    /// Engine backing this session
    #[must_use]
    pub const fn engine(&self) -> BrowserEngine {
        self.engine
    }

    /// Options the session was acquired with
    #[must_use]
    pub const fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Wait ceiling for a step, preferring its own override
    #[must_use]
    pub fn timeout_for(&self, step_override: Option<Duration>) -> Duration {
        step_override.unwrap_or(self.options.default_timeout)
    }

    /// The page driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// The page driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Close the page and browser
    pub async fn release(mut self) -> FlowResult<()> {
        self.released = true;
        let result = self.driver.close().await;
        debug!(engine = %self.engine, ok = result.is_ok(), "session released");
        result
    }
}

impl<D: PageDriver> Drop for Session<D> {
    fn drop(&mut self) {
        if !self.released {
            warn!(engine = %self.engine, "session dropped without release");
        }
    }
}
