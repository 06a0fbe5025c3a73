//! Chromium control over the Chrome `DevTools` Protocol.
//!
//! With the `browser` feature, [`CdpLauncher`] starts one Chromium process per
//! session through chromiumoxide and hands out a [`CdpDriver`] for its page.
//! Only the Chromium engine can be driven this way; other engines fail at
//! launch.

use crate::config::HarnessConfig;
use std::path::PathBuf;

/// Browser process configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width when no device is emulated
    pub viewport_width: u32,
    /// Viewport height when no device is emulated
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

impl From<&HarnessConfig> for BrowserConfig {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            headless: config.headless,
            chromium_path: config.chromium_path.clone(),
            sandbox: config.sandbox,
            ..Self::default()
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{CdpDriver, CdpLauncher};

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::device::DeviceProfile;
    use crate::driver::{BrowserEngine, Launcher, PageDriver};
    use crate::locator::{ElementState, Locator};
    use crate::result::{FlowError, FlowResult};
    use crate::session::SessionOptions;
    use async_trait::async_trait;
    use base64::Engine;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::{
        SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
        SetUserAgentOverrideParams,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use tokio::sync::Mutex;
    use tracing::{debug, warn};

    const CLEAR_INPUT: &str = "function() { this.focus(); this.value = ''; \
        this.dispatchEvent(new Event('input', { bubbles: true })); }";

    // window property set before a navigating click; a new document drops it
    const DOCUMENT_MARK: &str = "__shopflowMarked";

    fn launch_error(engine: BrowserEngine, e: impl ToString) -> FlowError {
        FlowError::SessionLaunch {
            engine: engine.to_string(),
            message: e.to_string(),
        }
    }

    /// Starts a dedicated Chromium process per session
    #[derive(Debug, Clone, Default)]
    pub struct CdpLauncher {
        config: BrowserConfig,
    }

    impl CdpLauncher {
        #[must_use]
        pub const fn new(config: BrowserConfig) -> Self {
            Self { config }
        }

        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        async fn emulate(&self, page: &CdpPage, device: Option<&DeviceProfile>) -> FlowResult<()> {
            let (width, height, scale, mobile) = device.map_or(
                (
                    self.config.viewport_width,
                    self.config.viewport_height,
                    1.0,
                    false,
                ),
                |d| {
                    (
                        d.viewport_width,
                        d.viewport_height,
                        d.device_scale_factor,
                        d.is_mobile,
                    )
                },
            );
            let metrics = SetDeviceMetricsOverrideParams::builder()
                .width(i64::from(width))
                .height(i64::from(height))
                .device_scale_factor(scale)
                .mobile(mobile)
                .build()
                .map_err(FlowError::page)?;
            page.execute(metrics).await.map_err(|e| FlowError::page(e.to_string()))?;

            if let Some(device) = device {
                page.execute(SetUserAgentOverrideParams::new(device.user_agent.clone()))
                    .await
                    .map_err(|e| FlowError::page(e.to_string()))?;
                page.execute(SetTouchEmulationEnabledParams::new(device.has_touch))
                    .await
                    .map_err(|e| FlowError::page(e.to_string()))?;
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Launcher for CdpLauncher {
        type Driver = CdpDriver;

        async fn launch(
            &self,
            engine: BrowserEngine,
            options: &SessionOptions,
        ) -> FlowResult<Self::Driver> {
            if engine != BrowserEngine::Chromium {
                return Err(launch_error(
                    engine,
                    "only chromium can be driven over CDP",
                ));
            }

            let mut builder = CdpConfig::builder();
            if !self.config.headless {
                builder = builder.with_head();
            }
            if !self.config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = self.config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            let cdp_config = builder.build().map_err(|e| launch_error(engine, e))?;

            let (mut browser, mut handler) = CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| launch_error(engine, e))?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            let page = match browser.new_page("about:blank").await {
                Ok(page) => page,
                Err(e) => {
                    let _ = browser.close().await;
                    handle.abort();
                    return Err(launch_error(engine, e));
                }
            };
            if let Err(e) = self.emulate(&page, options.device.as_ref()).await {
                let _ = browser.close().await;
                handle.abort();
                return Err(launch_error(engine, e));
            }

            debug!(headless = self.config.headless, "chromium launched");
            Ok(CdpDriver {
                engine,
                browser: Mutex::new(browser),
                page,
                handle,
            })
        }
    }

    /// One Chromium page and the process that owns it
    #[derive(Debug)]
    pub struct CdpDriver {
        engine: BrowserEngine,
        browser: Mutex<CdpBrowser>,
        page: CdpPage,
        handle: tokio::task::JoinHandle<()>,
    }

    impl CdpDriver {
        async fn eval_string(&self, expr: String) -> FlowResult<String> {
            self.page
                .evaluate(expr)
                .await
                .map_err(|e| FlowError::page(e.to_string()))?
                .into_value::<String>()
                .map_err(|e| FlowError::page(e.to_string()))
        }

        async fn element(&self, locator: &Locator) -> FlowResult<chromiumoxide::element::Element> {
            self.page
                .find_element(locator.as_str())
                .await
                .map_err(|e| FlowError::page(format!("'{locator}': {e}")))
        }
    }

    #[async_trait]
    impl PageDriver for CdpDriver {
        fn engine(&self) -> BrowserEngine {
            self.engine
        }

        async fn goto(&mut self, url: &str) -> FlowResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| FlowError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn element_state(&self, locator: &Locator) -> FlowResult<ElementState> {
            let answer = self.eval_string(locator.to_state_query()).await?;
            Ok(ElementState::from_query(&answer))
        }

        async fn fill(&mut self, locator: &Locator, value: &str) -> FlowResult<()> {
            let element = self.element(locator).await?;
            element
                .call_js_fn(CLEAR_INPUT, false)
                .await
                .map_err(|e| FlowError::page(e.to_string()))?;
            element
                .click()
                .await
                .map_err(|e| FlowError::page(e.to_string()))?;
            element
                .type_str(value)
                .await
                .map_err(|e| FlowError::page(e.to_string()))?;
            Ok(())
        }

        async fn click(&mut self, locator: &Locator) -> FlowResult<()> {
            self.element(locator)
                .await?
                .click()
                .await
                .map_err(|e| FlowError::page(e.to_string()))?;
            Ok(())
        }

        async fn mark_document(&mut self) -> FlowResult<()> {
            self.eval_string(format!("(() => {{ window.{DOCUMENT_MARK} = true; return 'marked'; }})()"))
                .await?;
            Ok(())
        }

        async fn document_marked(&self) -> FlowResult<bool> {
            let marked = self
                .eval_string(format!("String(window.{DOCUMENT_MARK} === true)"))
                .await?;
            Ok(marked == "true")
        }

        async fn wait_for_navigation(&mut self) -> FlowResult<()> {
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| FlowError::Navigation {
                    url: String::new(),
                    message: e.to_string(),
                })?;
            Ok(())
        }

        async fn text_content(&self, locator: &Locator) -> FlowResult<Option<String>> {
            let json = self.eval_string(locator.to_text_query()).await?;
            Ok(serde_json::from_str(&json)?)
        }

        async fn screenshot(&self) -> FlowResult<Vec<u8>> {
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();

            let screenshot =
                self.page
                    .execute(params)
                    .await
                    .map_err(|e| FlowError::Screenshot {
                        message: e.to_string(),
                    })?;

            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(|e| FlowError::Screenshot {
                    message: e.to_string(),
                })
        }

        async fn current_url(&self) -> FlowResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(|e| FlowError::page(e.to_string()))?
                .unwrap_or_default())
        }

        async fn close(&mut self) -> FlowResult<()> {
            let mut browser = self.browser.lock().await;
            let closed = browser.close().await;
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "chromium did not exit cleanly");
            }
            self.handle.abort();
            closed.map_err(|e| FlowError::page(format!("closing browser: {e}")))?;
            Ok(())
        }
    }
}
