//! Driver abstraction over a single browser page.
//!
//! The scenario runner only talks to [`PageDriver`]; sessions obtain one
//! from a [`Launcher`]. The CDP implementation lives in [`crate::browser`]
//! behind the `browser` feature, and [`MockDriver`] backs unit tests.

use crate::locator::{ElementState, Locator};
use crate::result::{FlowError, FlowResult};
use crate::session::SessionOptions;
use crate::step::Step;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Browser engine a scenario runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    /// Chromium / Chrome (driven over CDP)
    Chromium,
    /// Firefox
    Firefox,
    /// WebKit
    Webkit,
}

impl BrowserEngine {
    /// Lowercase engine name, used in snapshot file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chromium => "chromium",
            Self::Firefox => "firefox",
            Self::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserEngine {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Self::Chromium),
            "firefox" => Ok(Self::Firefox),
            "webkit" => Ok(Self::Webkit),
            other => Err(FlowError::config(format!("unknown browser engine '{other}'"))),
        }
    }
}

/// Operations the runner needs from one browser page
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Engine backing this page
    fn engine(&self) -> BrowserEngine;

    /// Navigate and wait for the load to finish
    async fn goto(&mut self, url: &str) -> FlowResult<()>;

    /// Report how usable the first matching element is, without waiting
    async fn element_state(&self, locator: &Locator) -> FlowResult<ElementState>;

    /// Clear an input and type `value` into it
    async fn fill(&mut self, locator: &Locator, value: &str) -> FlowResult<()>;

    /// Click an element
    async fn click(&mut self, locator: &Locator) -> FlowResult<()>;

    /// Tag the loaded document so its replacement can be detected
    async fn mark_document(&mut self) -> FlowResult<()>;

    /// Whether the document tagged by [`PageDriver::mark_document`] is still loaded
    async fn document_marked(&self) -> FlowResult<bool>;

    /// Wait for an in-flight navigation (e.g. a form submit) to finish loading
    async fn wait_for_navigation(&mut self) -> FlowResult<()>;

    /// `textContent` of the first matching element, `None` if absent
    async fn text_content(&self, locator: &Locator) -> FlowResult<Option<String>>;

    /// PNG capture of the viewport
    async fn screenshot(&self) -> FlowResult<Vec<u8>>;

    /// Current page URL
    async fn current_url(&self) -> FlowResult<String>;

    /// Close the page and its browser
    async fn close(&mut self) -> FlowResult<()>;
}

/// Creates isolated pages for sessions
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Driver produced by this launcher
    type Driver: PageDriver;

    /// Start a fresh browser for `engine` and open one page in it
    async fn launch(
        &self,
        engine: BrowserEngine,
        options: &SessionOptions,
    ) -> FlowResult<Self::Driver>;
}

// ============================================================================
// Mock implementation
// ============================================================================

/// Element rendered by a [`MockPage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// `textContent`
    pub text: String,
    /// Reported state
    pub state: ElementState,
    /// Number of state checks before the element shows up
    pub appears_after: u32,
}

impl MockElement {
    /// A visible, enabled element
    #[must_use]
    pub fn actionable(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: ElementState::Actionable,
            appears_after: 0,
        }
    }

    /// An element that is in the DOM but cannot be interacted with
    #[must_use]
    pub fn attached(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: ElementState::Attached,
            appears_after: 0,
        }
    }

    /// Delay rendering until `checks` state checks have happened
    #[must_use]
    pub const fn appearing_after(mut self, checks: u32) -> Self {
        self.appears_after = checks;
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    elements: HashMap<String, MockElement>,
    state_checks: HashMap<String, u32>,
    values: HashMap<String, String>,
    history: Vec<String>,
    url: String,
    marked: bool,
    clicks_keep_document: bool,
    fail_url_reads: bool,
    navigation_delay: Option<Duration>,
    stalls: HashMap<&'static str, Duration>,
    fail_screenshots: bool,
    fail_launch: Option<String>,
    launches: usize,
    closes: usize,
}

/// Scripted page content shared between a [`MockLauncher`] and its drivers
///
/// Selectors resolve against one flat element table regardless of URL,
/// which is enough to walk a scenario end to end.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    state: Arc<Mutex<MockState>>,
}

impl MockPage {
    /// Empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Page that renders everything `steps` interact with or expect
    #[must_use]
    pub fn satisfying(steps: &[Step]) -> Self {
        let page = Self::new();
        for step in steps {
            match step {
                Step::Fill { selector, .. } | Step::Click { selector, .. } => {
                    if !page.has(selector.as_str()) {
                        page.insert(selector.as_str(), MockElement::actionable(""));
                    }
                }
                Step::AssertText {
                    selector, expected, ..
                } => page.insert(selector.as_str(), MockElement::attached(expected.clone())),
                _ => {}
            }
        }
        page
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace an element
    pub fn insert(&self, selector: &str, element: MockElement) {
        let _ = self.lock().elements.insert(selector.to_string(), element);
    }

    /// Replace the text of an existing element
    pub fn set_text(&self, selector: &str, text: &str) {
        if let Some(element) = self.lock().elements.get_mut(selector) {
            element.text = text.to_string();
        }
    }

    /// Whether an element is registered for `selector`
    #[must_use]
    pub fn has(&self, selector: &str) -> bool {
        self.lock().elements.contains_key(selector)
    }

    /// Make every navigation take `delay`
    pub fn set_navigation_delay(&self, delay: Duration) {
        self.lock().navigation_delay = Some(delay);
    }

    /// Make every `call` (`element_state`, `fill`, `click`, `text_content`,
    /// `screenshot`) take `delay` before answering
    pub fn stall(&self, call: &'static str, delay: Duration) {
        let _ = self.lock().stalls.insert(call, delay);
    }

    /// Clicks leave the current document in place, as when a submit is ignored
    pub fn keep_document_on_click(&self) {
        self.lock().clicks_keep_document = true;
    }

    /// Make every `current_url` call fail
    pub fn fail_url_reads(&self) {
        self.lock().fail_url_reads = true;
    }

    /// Make every screenshot fail
    pub fn fail_screenshots(&self) {
        self.lock().fail_screenshots = true;
    }

    /// Make every launch fail with `message`
    pub fn fail_launch(&self, message: impl Into<String>) {
        self.lock().fail_launch = Some(message.into());
    }

    /// Calls recorded so far, e.g. `navigate:http://...`, `fill:#email=...`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Whether any recorded call starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Value last typed into `selector`
    #[must_use]
    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.lock().values.get(selector).cloned()
    }

    /// Number of browsers launched
    #[must_use]
    pub fn launches(&self) -> usize {
        self.lock().launches
    }

    /// Number of browsers closed
    #[must_use]
    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    fn record(&self, call: String) {
        self.lock().history.push(call);
    }

    async fn maybe_stall(&self, call: &str) {
        let delay = self.lock().stalls.get(call).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Mock driver for unit testing
#[derive(Debug)]
pub struct MockDriver {
    engine: BrowserEngine,
    page: MockPage,
}

impl MockDriver {
    /// Driver over `page`
    #[must_use]
    pub const fn new(engine: BrowserEngine, page: MockPage) -> Self {
        Self { engine, page }
    }

    /// Shared page content
    #[must_use]
    pub const fn page(&self) -> &MockPage {
        &self.page
    }

    fn require(&self, locator: &Locator) -> FlowResult<()> {
        if self.page.has(locator.as_str()) {
            Ok(())
        } else {
            Err(FlowError::page(format!("no element matches '{locator}'")))
        }
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    fn engine(&self) -> BrowserEngine {
        self.engine
    }

    async fn goto(&mut self, url: &str) -> FlowResult<()> {
        self.page.record(format!("navigate:{url}"));
        let delay = self.page.lock().navigation_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.page.lock();
        state.url = url.to_string();
        state.marked = false;
        Ok(())
    }

    async fn element_state(&self, locator: &Locator) -> FlowResult<ElementState> {
        self.page.maybe_stall("element_state").await;
        let mut state = self.page.lock();
        let checks = {
            let count = state.state_checks.entry(locator.as_str().to_string()).or_insert(0);
            *count += 1;
            *count
        };
        Ok(match state.elements.get(locator.as_str()) {
            Some(element) if checks > element.appears_after => element.state,
            _ => ElementState::Missing,
        })
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> FlowResult<()> {
        self.page.maybe_stall("fill").await;
        self.require(locator)?;
        self.page.record(format!("fill:{locator}={value}"));
        let _ = self
            .page
            .lock()
            .values
            .insert(locator.as_str().to_string(), value.to_string());
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> FlowResult<()> {
        self.page.maybe_stall("click").await;
        self.require(locator)?;
        self.page.record(format!("click:{locator}"));
        let mut state = self.page.lock();
        if !state.clicks_keep_document {
            state.marked = false;
        }
        Ok(())
    }

    async fn mark_document(&mut self) -> FlowResult<()> {
        self.page.lock().marked = true;
        Ok(())
    }

    async fn document_marked(&self) -> FlowResult<bool> {
        Ok(self.page.lock().marked)
    }

    async fn wait_for_navigation(&mut self) -> FlowResult<()> {
        self.page.record("wait_for_navigation".to_string());
        Ok(())
    }

    async fn text_content(&self, locator: &Locator) -> FlowResult<Option<String>> {
        self.page.maybe_stall("text_content").await;
        Ok(self
            .page
            .lock()
            .elements
            .get(locator.as_str())
            .map(|e| e.text.clone()))
    }

    async fn screenshot(&self) -> FlowResult<Vec<u8>> {
        self.page.maybe_stall("screenshot").await;
        if self.page.lock().fail_screenshots {
            return Err(FlowError::Screenshot {
                message: "mock screenshot failure".to_string(),
            });
        }
        // PNG magic bytes are enough for a file to land on disk
        Ok(vec![0x89, 0x50, 0x4E, 0x47])
    }

    async fn current_url(&self) -> FlowResult<String> {
        let state = self.page.lock();
        if state.fail_url_reads {
            return Err(FlowError::page("execution context was destroyed"));
        }
        Ok(state.url.clone())
    }

    async fn close(&mut self) -> FlowResult<()> {
        self.page.record("close".to_string());
        self.page.lock().closes += 1;
        Ok(())
    }
}

/// Launcher handing out [`MockDriver`]s over one shared [`MockPage`]
#[derive(Debug, Clone, Default)]
pub struct MockLauncher {
    page: MockPage,
}

impl MockLauncher {
    /// Launcher over `page`
    #[must_use]
    pub const fn new(page: MockPage) -> Self {
        Self { page }
    }

    /// Shared page content
    #[must_use]
    pub const fn page(&self) -> &MockPage {
        &self.page
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    type Driver = MockDriver;

    async fn launch(
        &self,
        engine: BrowserEngine,
        options: &SessionOptions,
    ) -> FlowResult<Self::Driver> {
        let failure = self.page.lock().fail_launch.clone();
        if let Some(message) = failure {
            return Err(FlowError::SessionLaunch {
                engine: engine.to_string(),
                message,
            });
        }
        let device = options
            .device
            .as_ref()
            .map_or_else(|| "none".to_string(), |d| d.name.clone());
        self.page.record(format!("launch:{engine}:{device}"));
        self.page.lock().launches += 1;
        Ok(MockDriver::new(engine, self.page.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod engine_tests {
        use super::*;

        #[test]
        fn test_parse_engine() {
            assert_eq!("chromium".parse::<BrowserEngine>().unwrap(), BrowserEngine::Chromium);
            assert_eq!("Chrome".parse::<BrowserEngine>().unwrap(), BrowserEngine::Chromium);
            assert_eq!("webkit".parse::<BrowserEngine>().unwrap(), BrowserEngine::Webkit);
            assert!("netscape".parse::<BrowserEngine>().is_err());
        }

        #[test]
        fn test_engine_display() {
            assert_eq!(BrowserEngine::Chromium.to_string(), "chromium");
            assert_eq!(BrowserEngine::Firefox.as_str(), "firefox");
        }
    }

    mod mock_page_tests {
        use super::*;
        use crate::assertion::TextMatch;

        #[test]
        fn test_satisfying_builds_elements() {
            let steps = vec![
                Step::fill("#email", "john@example.com"),
                Step::click("#login"),
                Step::assert_text(".card-title", "Checklist"),
                Step::AssertText {
                    selector: Locator::css(".x"),
                    expected: "y".to_string(),
                    matching: TextMatch::Normalized,
                    timeout_ms: None,
                },
            ];
            let page = MockPage::satisfying(&steps);
            assert!(page.has("#email"));
            assert!(page.has("#login"));
            assert!(page.has(".card-title"));
            assert!(page.has(".x"));
        }

        #[test]
        fn test_history_starts_empty() {
            let page = MockPage::new();
            assert!(page.history().is_empty());
            assert!(!page.was_called("navigate"));
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_navigate_records_url() {
            let mut driver = MockDriver::new(BrowserEngine::Chromium, MockPage::new());
            driver.goto("http://127.0.0.1:5000/").await.unwrap();
            assert_eq!(driver.current_url().await.unwrap(), "http://127.0.0.1:5000/");
            assert!(driver.page().was_called("navigate:http://127.0.0.1:5000/"));
        }

        #[tokio::test]
        async fn test_fill_requires_element() {
            let page = MockPage::new();
            let mut driver = MockDriver::new(BrowserEngine::Chromium, page.clone());
            assert!(driver.fill(&Locator::id("email"), "x").await.is_err());

            page.insert("#email", MockElement::actionable(""));
            driver
                .fill(&Locator::id("email"), "john@example.com")
                .await
                .unwrap();
            assert_eq!(page.value_of("#email").as_deref(), Some("john@example.com"));
        }

        #[tokio::test]
        async fn test_element_appears_after_checks() {
            let page = MockPage::new();
            page.insert(".title", MockElement::attached("Order Complete!").appearing_after(2));
            let driver = MockDriver::new(BrowserEngine::Chromium, page);
            let locator = Locator::css(".title");
            assert_eq!(driver.element_state(&locator).await.unwrap(), ElementState::Missing);
            assert_eq!(driver.element_state(&locator).await.unwrap(), ElementState::Missing);
            assert_eq!(driver.element_state(&locator).await.unwrap(), ElementState::Attached);
        }

        #[tokio::test]
        async fn test_text_content_absent() {
            let driver = MockDriver::new(BrowserEngine::Chromium, MockPage::new());
            assert!(driver
                .text_content(&Locator::css(".missing"))
                .await
                .unwrap()
                .is_none());
        }

        #[tokio::test]
        async fn test_click_replaces_marked_document() {
            let page = MockPage::new();
            page.insert("#login", MockElement::actionable("Login"));
            let mut driver = MockDriver::new(BrowserEngine::Chromium, page.clone());
            let login = Locator::id("login");

            driver.mark_document().await.unwrap();
            assert!(driver.document_marked().await.unwrap());
            driver.click(&login).await.unwrap();
            assert!(!driver.document_marked().await.unwrap());

            page.keep_document_on_click();
            driver.mark_document().await.unwrap();
            driver.click(&login).await.unwrap();
            assert!(driver.document_marked().await.unwrap());
        }

        #[tokio::test]
        async fn test_stalled_call_waits() {
            let page = MockPage::new();
            page.stall("text_content", Duration::from_millis(100));
            let driver = MockDriver::new(BrowserEngine::Chromium, page);
            let started = tokio::time::Instant::now();
            driver.text_content(&Locator::css(".title")).await.unwrap();
            assert!(started.elapsed() >= Duration::from_millis(100));
        }

        #[tokio::test]
        async fn test_screenshot_failure() {
            let page = MockPage::new();
            page.fail_screenshots();
            let driver = MockDriver::new(BrowserEngine::Chromium, page);
            let err = driver.screenshot().await.unwrap_err();
            assert_eq!(err.kind(), "screenshot");
        }
    }

    mod mock_launcher_tests {
        use super::*;

        #[tokio::test]
        async fn test_launch_and_close_are_counted() {
            let launcher = MockLauncher::default();
            let mut driver = launcher
                .launch(BrowserEngine::Chromium, &SessionOptions::default())
                .await
                .unwrap();
            driver.close().await.unwrap();
            assert_eq!(launcher.page().launches(), 1);
            assert_eq!(launcher.page().closes(), 1);
            assert!(launcher.page().was_called("launch:chromium:none"));
        }

        #[tokio::test]
        async fn test_launch_failure() {
            let launcher = MockLauncher::default();
            launcher.page().fail_launch("no chromium");
            let err = launcher
                .launch(BrowserEngine::Chromium, &SessionOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "session_launch");
            assert!(err.to_string().contains("no chromium"));
        }
    }
}
