//! Scenario steps.
//!
//! Steps are plain data, tagged the same way in code and in YAML scenario
//! files:
//!
//! ```yaml
//! - type: navigate
//!   path: /auth/login
//! - type: fill
//!   selector: "#email"
//!   value: admin@example.com
//! - type: assert_text
//!   selector: .title
//!   expected: Order Complete!
//!   timeout_ms: 30000
//! ```

use crate::assertion::TextMatch;
use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One action or check in a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Load a page; `path` is joined onto the base URL unless absolute
    Navigate {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Clear an input and type into it
    Fill {
        selector: Locator,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Click an element; with `navigates`, wait until a new document replaces
    /// the clicked one and finishes loading
    Click {
        selector: Locator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        navigates: bool,
    },
    /// Compare an element's `textContent` with a literal
    AssertText {
        selector: Locator,
        expected: String,
        #[serde(default, skip_serializing_if = "TextMatch::is_exact")]
        matching: TextMatch,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Require that an element is absent or shows other text
    AssertNotText { selector: Locator, unexpected: String },
    /// Require that no element matches
    AssertAbsent { selector: Locator },
    /// Capture a diagnostic screenshot
    Snapshot { label: String },
}

impl Step {
    /// Navigate to `path`
    #[must_use]
    pub fn navigate(path: impl Into<String>) -> Self {
        Self::Navigate {
            path: path.into(),
            timeout_ms: None,
        }
    }

    /// Fill `selector` with `value`
    #[must_use]
    pub fn fill(selector: &str, value: impl Into<String>) -> Self {
        Self::Fill {
            selector: Locator::css(selector),
            value: value.into(),
            timeout_ms: None,
        }
    }

    /// Click `selector`
    #[must_use]
    pub fn click(selector: &str) -> Self {
        Self::Click {
            selector: Locator::css(selector),
            timeout_ms: None,
            navigates: false,
        }
    }

    /// Click `selector` and wait for the resulting navigation
    #[must_use]
    pub fn submit(selector: &str) -> Self {
        Self::Click {
            selector: Locator::css(selector),
            timeout_ms: None,
            navigates: true,
        }
    }

    /// Assert exact text at `selector`
    #[must_use]
    pub fn assert_text(selector: &str, expected: impl Into<String>) -> Self {
        Self::AssertText {
            selector: Locator::css(selector),
            expected: expected.into(),
            matching: TextMatch::Exact,
            timeout_ms: None,
        }
    }

    /// Assert whitespace-normalized text at `selector`
    #[must_use]
    pub fn assert_text_normalized(selector: &str, expected: impl Into<String>) -> Self {
        Self::AssertText {
            selector: Locator::css(selector),
            expected: expected.into(),
            matching: TextMatch::Normalized,
            timeout_ms: None,
        }
    }

    /// Assert `selector` does not show `unexpected`
    #[must_use]
    pub fn assert_not_text(selector: &str, unexpected: impl Into<String>) -> Self {
        Self::AssertNotText {
            selector: Locator::css(selector),
            unexpected: unexpected.into(),
        }
    }

    /// Assert nothing matches `selector`
    #[must_use]
    pub fn assert_absent(selector: &str) -> Self {
        Self::AssertAbsent {
            selector: Locator::css(selector),
        }
    }

    /// Capture a snapshot labelled `label`
    #[must_use]
    pub fn snapshot(label: impl Into<String>) -> Self {
        Self::Snapshot {
            label: label.into(),
        }
    }

    /// Override the wait ceiling for this step only
    ///
    /// Steps without a bounded wait (snapshots, negative checks) are
    /// returned unchanged.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        match &mut self {
            Self::Navigate { timeout_ms, .. }
            | Self::Fill { timeout_ms, .. }
            | Self::Click { timeout_ms, .. }
            | Self::AssertText { timeout_ms, .. } => *timeout_ms = Some(ms),
            Self::AssertNotText { .. } | Self::AssertAbsent { .. } | Self::Snapshot { .. } => {}
        }
        self
    }

    /// Per-step timeout override, if any
    #[must_use]
    pub fn timeout_override(&self) -> Option<Duration> {
        match self {
            Self::Navigate { timeout_ms, .. }
            | Self::Fill { timeout_ms, .. }
            | Self::Click { timeout_ms, .. }
            | Self::AssertText { timeout_ms, .. } => timeout_ms.map(Duration::from_millis),
            Self::AssertNotText { .. } | Self::AssertAbsent { .. } | Self::Snapshot { .. } => None,
        }
    }

    /// Locator this step reads or acts on
    #[must_use]
    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Self::Fill { selector, .. }
            | Self::Click { selector, .. }
            | Self::AssertText { selector, .. }
            | Self::AssertNotText { selector, .. }
            | Self::AssertAbsent { selector } => Some(selector),
            Self::Navigate { .. } | Self::Snapshot { .. } => None,
        }
    }

    /// One-line description for logs and reports
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Navigate { path, .. } => format!("navigate {path}"),
            Self::Fill { selector, .. } => format!("fill {selector}"),
            Self::Click { selector, .. } => format!("click {selector}"),
            Self::AssertText {
                selector, expected, ..
            } => format!("assert {selector} == {expected:?}"),
            Self::AssertNotText {
                selector,
                unexpected,
            } => format!("assert {selector} != {unexpected:?}"),
            Self::AssertAbsent { selector } => format!("assert {selector} absent"),
            Self::Snapshot { label } => format!("snapshot {label}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod timeout_tests {
        use super::*;

        #[test]
        fn test_no_override_by_default() {
            assert!(Step::assert_text(".title", "Order Complete!")
                .timeout_override()
                .is_none());
        }

        #[test]
        fn test_override_is_step_local() {
            let step =
                Step::assert_text(".title", "Order Complete!").with_timeout(Duration::from_secs(30));
            assert_eq!(step.timeout_override(), Some(Duration::from_secs(30)));
        }

        #[test]
        fn test_snapshot_ignores_override() {
            let step = Step::snapshot("order-complete").with_timeout(Duration::from_secs(30));
            assert_eq!(step, Step::snapshot("order-complete"));
            assert!(step.timeout_override().is_none());
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_locator_extraction() {
            assert_eq!(
                Step::fill("#email", "a").locator().map(Locator::as_str),
                Some("#email")
            );
            assert!(Step::navigate("/").locator().is_none());
            assert!(Step::snapshot("x").locator().is_none());
        }

        #[test]
        fn test_describe() {
            assert_eq!(Step::click(".btn-primary").describe(), "click .btn-primary");
            assert_eq!(
                Step::assert_text(".invoice-status", "paid").describe(),
                r#"assert .invoice-status == "paid""#
            );
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_yaml_tagging() {
            let yaml = r##"
- type: navigate
  path: /auth/login
- type: fill
  selector: "#email"
  value: admin@example.com
- type: click
  selector: "#login"
  navigates: true
- type: assert_text
  selector: .subscribers-plan-sell-price
  expected: (No up-front fee)
  matching: normalized
- type: assert_text
  selector: .title
  expected: Order Complete!
  timeout_ms: 30000
- type: assert_absent
  selector: .upcoming-invoice-amount
- type: snapshot
  label: logged-in
"##;
            let steps: Vec<Step> = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(steps.len(), 7);
            assert_eq!(steps[0], Step::navigate("/auth/login"));
            assert_eq!(steps[1], Step::fill("#email", "admin@example.com"));
            assert_eq!(steps[2], Step::submit("#login"));
            assert_eq!(
                steps[3],
                Step::assert_text_normalized(".subscribers-plan-sell-price", "(No up-front fee)")
            );
            assert_eq!(steps[4].timeout_override(), Some(Duration::from_secs(30)));
            assert_eq!(steps[5], Step::assert_absent(".upcoming-invoice-amount"));
            assert_eq!(steps[6], Step::snapshot("logged-in"));
        }

        #[test]
        fn test_defaults_are_not_serialized() {
            let yaml = serde_yaml_ng::to_string(&Step::click(".btn-primary")).unwrap();
            assert!(!yaml.contains("navigates"));
            assert!(!yaml.contains("timeout_ms"));
        }
    }
}
