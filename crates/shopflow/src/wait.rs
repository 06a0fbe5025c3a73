//! Bounded polling for element readiness.

use crate::driver::PageDriver;
use crate::locator::{ElementState, Locator};
use crate::result::{FlowError, FlowResult};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Interval between element state checks
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Poll until the element behind `locator` reaches `required`
///
/// Check errors (a page mid-navigation, a detached execution context) are
/// treated as "not there yet". The element is checked at least once even
/// with a zero timeout.
///
/// # Errors
///
/// Returns [`FlowError::ElementTimeout`] if `timeout` elapses first.
pub async fn wait_for_element<D: PageDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
    required: ElementState,
    timeout: Duration,
) -> FlowResult<ElementState> {
    wait_for_element_until(driver, locator, required, Instant::now() + timeout, timeout).await
}

/// Like [`wait_for_element`], against a deadline shared with other calls
///
/// A check still running at `deadline` is abandoned. `budget` is the timeout
/// reported in the error.
pub async fn wait_for_element_until<D: PageDriver + ?Sized>(
    driver: &D,
    locator: &Locator,
    required: ElementState,
    deadline: Instant,
    budget: Duration,
) -> FlowResult<ElementState> {
    let timed_out = || FlowError::ElementTimeout {
        selector: locator.to_string(),
        state: required.to_string(),
        ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
    };
    loop {
        let state = match tokio::time::timeout_at(deadline, driver.element_state(locator)).await {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                trace!(%locator, error = %e, "state check failed");
                ElementState::Missing
            }
            Err(_) => return Err(timed_out()),
        };
        if state.satisfies(required) {
            return Ok(state);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out());
        }
        tokio::time::sleep_until(deadline.min(now + POLL_INTERVAL)).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{BrowserEngine, MockDriver, MockElement, MockPage};

    fn driver_with(selector: &str, element: MockElement) -> MockDriver {
        let page = MockPage::new();
        page.insert(selector, element);
        MockDriver::new(BrowserEngine::Chromium, page)
    }

    #[tokio::test]
    async fn test_ready_element_returns_immediately() {
        let driver = driver_with("#email", MockElement::actionable(""));
        let state = wait_for_element(
            &driver,
            &Locator::id("email"),
            ElementState::Actionable,
            Duration::ZERO,
        )
        .await
        .unwrap();
        assert_eq!(state, ElementState::Actionable);
    }

    #[tokio::test]
    async fn test_late_element_is_awaited() {
        let driver = driver_with(".title", MockElement::attached("Order Complete!").appearing_after(3));
        let state = wait_for_element(
            &driver,
            &Locator::css(".title"),
            ElementState::Attached,
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(state, ElementState::Attached);
    }

    #[tokio::test]
    async fn test_attached_is_not_actionable() {
        let driver = driver_with(".SubmitButton", MockElement::attached("Pay"));
        let err = wait_for_element(
            &driver,
            &Locator::css(".SubmitButton"),
            ElementState::Actionable,
            Duration::from_millis(120),
        )
        .await
        .unwrap_err();
        match err {
            FlowError::ElementTimeout {
                selector, state, ms, ..
            } => {
                assert_eq!(selector, ".SubmitButton");
                assert_eq!(state, "actionable");
                assert_eq!(ms, 120);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_hung_state_check_is_cut_off_at_deadline() {
        let page = MockPage::new();
        page.insert("#email", MockElement::actionable(""));
        page.stall("element_state", Duration::from_secs(5));
        let driver = MockDriver::new(BrowserEngine::Chromium, page);

        let started = Instant::now();
        let err = wait_for_element(
            &driver,
            &Locator::id("email"),
            ElementState::Actionable,
            Duration::from_millis(150),
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missing_element_times_out() {
        let driver = MockDriver::new(BrowserEngine::Chromium, MockPage::new());
        let err = wait_for_element(
            &driver,
            &Locator::css(".card-title"),
            ElementState::Attached,
            Duration::from_millis(60),
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }
}
