//! Locators for reading and acting on page elements.
//!
//! A locator is a CSS selector. Every action and text read goes through
//! `document.querySelector`, so the first match wins, the same way the
//! shop's own pages are written against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far along an element is towards being usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    /// No element matches
    Missing,
    /// Element is in the DOM
    Attached,
    /// Element is in the DOM, rendered and not disabled
    Actionable,
}

impl ElementState {
    /// Parse the state string returned by [`Locator::to_state_query`]
    #[must_use]
    pub fn from_query(answer: &str) -> Self {
        match answer {
            "actionable" => Self::Actionable,
            "attached" => Self::Attached,
            _ => Self::Missing,
        }
    }

    /// Whether this state satisfies `required`
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

impl fmt::Display for ElementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::Attached => "attached",
            Self::Actionable => "actionable",
        })
    }
}

/// CSS selector identifying one page element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    /// Create a locator from a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    /// Locator for an element id (`#id`)
    #[must_use]
    pub fn id(id: &str) -> Self {
        Self(format!("#{id}"))
    }

    /// The raw selector
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Selector as a JavaScript string literal
    fn js_literal(&self) -> String {
        // JSON string syntax is valid JavaScript string syntax
        serde_json::to_string(&self.0).unwrap_or_else(|_| String::from("\"\""))
    }

    /// Expression returning `document.querySelector(selector)`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("document.querySelector({})", self.js_literal())
    }

    /// Expression returning a JSON string: `textContent` or `null`
    #[must_use]
    pub fn to_text_query(&self) -> String {
        format!(
            "(() => {{ const el = {}; return JSON.stringify(el ? el.textContent : null); }})()",
            self.to_query()
        )
    }

    /// Expression returning `"missing"`, `"attached"` or `"actionable"`
    #[must_use]
    pub fn to_state_query(&self) -> String {
        format!(
            "(() => {{ \
                const el = {}; \
                if (!el) return 'missing'; \
                const style = window.getComputedStyle(el); \
                const shown = el.getClientRects().length > 0 && style.visibility !== 'hidden'; \
                return shown && !el.disabled ? 'actionable' : 'attached'; \
            }})()",
            self.to_query()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(selector: &str) -> Self {
        Self::css(selector)
    }
}
