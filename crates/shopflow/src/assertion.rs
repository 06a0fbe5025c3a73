//! Text assertions against rendered page content.

use serde::{Deserialize, Serialize};

/// How extracted text is compared with the expected literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    /// Byte-for-byte equality, whitespace included
    #[default]
    Exact,
    /// Equality after trimming and collapsing whitespace runs to one space
    Normalized,
}

impl TextMatch {
    /// Whether this is the default mode (used to keep serialized steps short)
    #[must_use]
    pub fn is_exact(&self) -> bool {
        matches!(self, Self::Exact)
    }
}

/// Result of an assertion
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Human-readable message
    pub message: String,
}

impl AssertionResult {
    /// Create a passing assertion result
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
        }
    }

    /// Create a failing assertion result
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// Trim and collapse every whitespace run (spaces, tabs, newlines) to one space
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assertion helpers for page text
#[derive(Debug, Clone, Copy, Default)]
pub struct Assertion;

impl Assertion {
    /// Compare rendered text with the expected literal
    #[must_use]
    pub fn text_matches(actual: &str, expected: &str, matching: TextMatch) -> AssertionResult {
        let equal = match matching {
            TextMatch::Exact => actual == expected,
            TextMatch::Normalized => normalize_whitespace(actual) == normalize_whitespace(expected),
        };
        if equal {
            AssertionResult::pass()
        } else {
            AssertionResult::fail(format!("expected {expected:?}, got {actual:?}"))
        }
    }

    /// Assert rendered text differs from a forbidden literal
    #[must_use]
    pub fn text_differs(actual: Option<&str>, unexpected: &str) -> AssertionResult {
        match actual {
            Some(text) if text == unexpected => {
                AssertionResult::fail(format!("did not expect {unexpected:?}"))
            }
            _ => AssertionResult::pass(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NO_UPFRONT_MARKUP: &str = "\n                      \n                        (No up-front fee)\n                      \n                      ";

    mod exact_tests {
        use super::*;

        #[test]
        fn test_exact_match_passes() {
            assert!(Assertion::text_matches("£6.99", "£6.99", TextMatch::Exact).passed);
        }

        #[test]
        fn test_helpers_are_debuggable() {
            assert_eq!(format!("{:?}", Assertion), "Assertion");
        }

        #[test]
        fn test_exact_does_not_trim() {
            let result = Assertion::text_matches(" £6.99", "£6.99", TextMatch::Exact);
            assert!(!result.passed);
            assert!(result.message.contains("£6.99"));
        }

        #[test]
        fn test_exact_keeps_markup_whitespace() {
            assert!(
                Assertion::text_matches(NO_UPFRONT_MARKUP, NO_UPFRONT_MARKUP, TextMatch::Exact)
                    .passed
            );
            assert!(
                !Assertion::text_matches(NO_UPFRONT_MARKUP, "(No up-front fee)", TextMatch::Exact)
                    .passed
            );
        }
    }

    mod normalized_tests {
        use super::*;

        #[test]
        fn test_normalized_ignores_markup_whitespace() {
            let result =
                Assertion::text_matches(NO_UPFRONT_MARKUP, "(No up-front fee)", TextMatch::Normalized);
            assert!(result.passed, "{}", result.message);
        }

        #[test]
        fn test_normalized_still_compares_words() {
            let result =
                Assertion::text_matches(NO_UPFRONT_MARKUP, "(No up-front cost)", TextMatch::Normalized);
            assert!(!result.passed);
        }

        #[test]
        fn test_normalize_whitespace() {
            assert_eq!(normalize_whitespace("  Then \n£5.99\tper  week "), "Then £5.99 per week");
            assert_eq!(normalize_whitespace(""), "");
        }
    }

    mod differs_tests {
        use super::*;

        #[test]
        fn test_absent_element_differs() {
            assert!(Assertion::text_differs(None, "Checklist").passed);
        }

        #[test]
        fn test_other_text_differs() {
            assert!(Assertion::text_differs(Some("Login"), "Checklist").passed);
        }

        #[test]
        fn test_same_text_fails() {
            assert!(!Assertion::text_differs(Some("Checklist"), "Checklist").passed);
        }
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(text in "[ \\t\\na-z£0-9.()-]{0,40}") {
            let once = normalize_whitespace(&text);
            prop_assert_eq!(normalize_whitespace(&once), once);
        }

        #[test]
        fn prop_exact_implies_normalized(text in "[ \\t\\na-zA-Z£0-9.!]{0,40}") {
            prop_assert!(Assertion::text_matches(&text, &text, TextMatch::Exact).passed);
            prop_assert!(Assertion::text_matches(&text, &text, TextMatch::Normalized).passed);
        }

        #[test]
        fn prop_padding_only_breaks_exact(word in "[a-zA-Z£0-9.]{1,12}", pad in "[ \\n]{1,6}") {
            let padded = format!("{pad}{word}{pad}");
            prop_assert!(!Assertion::text_matches(&padded, &word, TextMatch::Exact).passed);
            prop_assert!(Assertion::text_matches(&padded, &word, TextMatch::Normalized).passed);
        }
    }
}
