//! Assertion interface over eventually-resolved selectors.
//!
//! [`DomAssertions`] is registered once at setup with the remote query and
//! the uniform timeout. Each call to [`DomAssertions::expect`] opens one
//! assertion invocation: an [`Expectation`] carrying the subject and its
//! flags (dom, eventually, negate, contains), settled by exactly one
//! predicate method. Predicates resolve the subject through the polling
//! resolver, interrogate the handles, and settle with messages embedding
//! the observed values, with a distinct template for the negated form.
//!
//! ## Toyota Way Application:
//! - **Poka-Yoke**: predicates on an untagged subject fail fast as usage
//!   errors, before any remote traffic
//! - **Jidoka**: not-found, failed-predicate, and transport outcomes stay
//!   distinct; nothing is silently converted

use crate::bridge::Resolved;
use crate::driver::{ElementQuery, ElementRef};
use crate::resolver::{resolve_all, resolve_one, RetryPolicy};
use crate::result::{EsperarError, EsperarResult};
use crate::visibility::is_visible;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shared handle to the remote element query.
pub type QueryRef = Arc<dyn ElementQuery>;

/// The assertion interface, registered once at setup.
///
/// Holds the query handle and the single timeout applied uniformly to
/// eventually-flagged assertions. Cloning is cheap; concurrent invocations
/// share nothing mutable.
#[derive(Debug, Clone)]
pub struct DomAssertions {
    query: QueryRef,
    policy: RetryPolicy,
}

impl DomAssertions {
    /// Register the interface over `query` with the default timeout.
    #[must_use]
    pub fn new(query: QueryRef) -> Self {
        Self {
            query,
            policy: RetryPolicy::default(),
        }
    }

    /// Override the timeout applied to eventually-flagged assertions.
    ///
    /// The polling interval is not configurable here; it stays at the
    /// resolver's fixed default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = timeout;
        self
    }

    /// Timing policy currently applied to eventual assertions.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Open an assertion invocation about `subject`.
    ///
    /// The subject is an arbitrary value until [`Expectation::dom`] tags it
    /// as a selector; predicates on an untagged subject settle as usage
    /// errors without touching the remote document.
    #[must_use]
    pub fn expect(&self, subject: impl Into<String>) -> Expectation {
        Expectation {
            query: Arc::clone(&self.query),
            policy: self.policy,
            subject: subject.into(),
            dom: false,
            eventually: false,
            negate: false,
            contains: false,
        }
    }
}

/// One assertion invocation: a subject, its flags, one predicate.
///
/// Flags are set by the builder methods and read-only once a predicate
/// starts. Every predicate consumes the expectation and settles exactly
/// once; re-asserting means opening a new expectation.
#[derive(Debug, Clone)]
pub struct Expectation {
    query: QueryRef,
    policy: RetryPolicy,
    subject: String,
    dom: bool,
    eventually: bool,
    negate: bool,
    contains: bool,
}

impl Expectation {
    /// Tag the subject as a selector over the remote document.
    #[must_use]
    pub fn dom(mut self) -> Self {
        self.dom = true;
        self
    }

    /// Tolerate late rendering: poll until the timeout instead of querying
    /// once.
    #[must_use]
    pub fn eventually(mut self) -> Self {
        self.eventually = true;
        self
    }

    /// Invert the predicate; failures report the negated phrasing.
    #[must_use]
    pub fn not(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Make [`Expectation::text`] match by substring containment instead of
    /// equality.
    #[must_use]
    pub fn contains(mut self) -> Self {
        self.contains = true;
        self
    }

    /// Override the timeout for this invocation only.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = timeout;
        self
    }

    // =========================================================================
    // Predicates
    // =========================================================================

    /// At least one element matches the subject selector.
    ///
    /// # Errors
    ///
    /// `ElementNotFound` when nothing matches (the non-negated form);
    /// `AssertionFailed` when negated and matches exist.
    pub async fn exists(self) -> EsperarResult<()> {
        self.ensure_dom("existence")?;
        let found = self.all().await?.len();
        if self.negate {
            return self.report(
                found == 0,
                format!(
                    "Expected no element matching <{}>, but {found} found.",
                    self.subject
                ),
                "no matches".to_string(),
                found.to_string(),
            );
        }
        if found == 0 {
            return Err(EsperarError::ElementNotFound {
                selector: self.subject,
            });
        }
        Ok(())
    }

    /// Element text tests true against `pattern`.
    ///
    /// # Errors
    ///
    /// `ElementNotFound`, `AssertionFailed`, or transport failures from the
    /// reads.
    pub async fn matches(self, pattern: &Regex) -> EsperarResult<()> {
        self.ensure_dom("text")?;
        let resolved = self.one().await?;
        let text = resolved.el.text().await?;
        let positive = format!(
            "Expected element <{}> to match regular expression \"{pattern}\", but it contains \"{text}\".",
            self.subject
        );
        let negative = format!(
            "Expected element <{}> not to match regular expression \"{pattern}\"; it contains \"{text}\".",
            self.subject
        );
        self.settle(
            pattern.is_match(&text),
            positive,
            negative,
            pattern.to_string(),
            text,
        )
    }

    /// Element text equals `expected`, or contains it when the contains flag
    /// is set.
    ///
    /// # Errors
    ///
    /// `ElementNotFound`, `AssertionFailed`, or transport failures from the
    /// reads.
    pub async fn text(self, expected: &str) -> EsperarResult<()> {
        self.ensure_dom("text")?;
        let resolved = self.one().await?;
        let actual = resolved.el.text().await?;
        let (passed, positive, negative) = if self.contains {
            (
                actual.contains(expected),
                format!(
                    "Expected element <{}> to contain text \"{expected}\", but it contains \"{actual}\" instead.",
                    self.subject
                ),
                format!(
                    "Expected element <{}> not to contain text \"{expected}\", but it contains \"{actual}\".",
                    self.subject
                ),
            )
        } else {
            (
                actual == expected,
                format!(
                    "Expected text of element <{}> to be \"{expected}\", but it was \"{actual}\" instead.",
                    self.subject
                ),
                format!(
                    "Expected text of element <{}> not to be \"{expected}\", but it was.",
                    self.subject
                ),
            )
        };
        self.settle(passed, positive, negative, expected.to_string(), actual)
    }

    /// Element is visually visible: displayed and intersecting the viewport.
    ///
    /// The negated form passes trivially when nothing matches —
    /// nonexistence implies "not visible" rather than a not-found rejection.
    ///
    /// # Errors
    ///
    /// `ElementNotFound` (non-negated form only), `AssertionFailed`, or
    /// transport failures from the reads.
    pub async fn visible(self) -> EsperarResult<()> {
        self.ensure_dom("visibility")?;
        let el = if self.negate {
            match self.all().await?.into_iter().next() {
                Some(el) => el,
                None => return Ok(()),
            }
        } else {
            self.one().await?.el
        };
        let viewport = self.query.viewport_size().await?;
        let vis = is_visible(el.as_ref(), viewport).await?;
        let positive = format!("Expected {} to be visible but it is not", self.subject);
        let negative = format!("Expected {} to not be visible but it is", self.subject);
        let actual = if vis { "visible" } else { "not visible" };
        self.settle(vis, positive, negative, "visible".to_string(), actual.to_string())
    }

    /// The number of matches equals `expected`.
    ///
    /// Reports on the observed snapshot; an absent selector observes zero
    /// matches rather than failing with not-found, so `count(0)` can pass.
    ///
    /// # Errors
    ///
    /// `AssertionFailed` or transport failures.
    pub async fn count(self, expected: usize) -> EsperarResult<()> {
        self.ensure_dom("count")?;
        let actual = self.all().await?.len();
        let positive = format!(
            "Expected {} to appear in the DOM {expected} times, but it shows up {actual} times instead.",
            self.subject
        );
        let negative = format!(
            "Expected {} not to appear in the DOM {expected} times, but it does.",
            self.subject
        );
        self.settle(
            actual == expected,
            positive,
            negative,
            expected.to_string(),
            actual.to_string(),
        )
    }

    /// Computed CSS `property` equals `expected`.
    ///
    /// # Errors
    ///
    /// `ElementNotFound`, `AssertionFailed`, or transport failures from the
    /// reads.
    pub async fn style(self, property: &str, expected: &str) -> EsperarResult<()> {
        self.ensure_dom("style")?;
        let resolved = self.one().await?;
        let actual = resolved.el.css_value(property).await?;
        let positive = format!(
            "Expected {property} of element <{}> to be '{expected}', but it is '{actual}'.",
            self.subject
        );
        let negative = format!(
            "Expected {property} of element <{}> to not be '{expected}', but it is.",
            self.subject
        );
        self.settle(
            actual == expected,
            positive,
            negative,
            expected.to_string(),
            actual,
        )
    }

    /// The `value` attribute equals `expected`.
    ///
    /// # Errors
    ///
    /// `ElementNotFound`, `AssertionFailed`, or transport failures from the
    /// reads.
    pub async fn value(self, expected: &str) -> EsperarResult<()> {
        self.ensure_dom("value")?;
        let resolved = self.one().await?;
        let actual = resolved.el.attribute("value").await?;
        let passed = actual.as_deref() == Some(expected);
        let shown = actual.unwrap_or_else(|| "null".to_string());
        let positive = format!(
            "Expected value of element <{}> to be '{expected}', but it is '{shown}'.",
            self.subject
        );
        let negative = format!(
            "Expected value of element <{}> to not be '{expected}', but it is.",
            self.subject
        );
        self.settle(passed, positive, negative, expected.to_string(), shown)
    }

    /// The `disabled` attribute is present and truthy.
    ///
    /// # Errors
    ///
    /// `ElementNotFound`, `AssertionFailed`, or transport failures from the
    /// reads.
    pub async fn disabled(self) -> EsperarResult<()> {
        self.ensure_dom("disabled state")?;
        let resolved = self.one().await?;
        let disabled = resolved
            .el
            .attribute("disabled")
            .await?
            .is_some_and(|v| !v.is_empty());
        let positive = format!("Expected {} to be disabled but it is not", self.subject);
        let negative = format!("Expected {} to not be disabled but it is", self.subject);
        self.settle(
            disabled,
            positive,
            negative,
            "disabled".to_string(),
            disabled.to_string(),
        )
    }

    /// The `class` attribute contains `expected` as a substring.
    ///
    /// # Errors
    ///
    /// `ElementNotFound`, `AssertionFailed`, or transport failures from the
    /// reads.
    pub async fn html_class(self, expected: &str) -> EsperarResult<()> {
        self.ensure_dom("class")?;
        let resolved = self.one().await?;
        let class_list = resolved.el.attribute("class").await?.unwrap_or_default();
        let passed = class_list.contains(expected);
        let positive = format!("Expected {class_list} to contain {expected}, but it does not.");
        let negative = format!("Expected {class_list} to not contain {expected}, but it does.");
        self.settle(passed, positive, negative, expected.to_string(), class_list)
    }

    /// With `expected` set, attribute `name` equals it exactly; with `None`,
    /// the attribute merely has to be present.
    ///
    /// # Errors
    ///
    /// `ElementNotFound`, `AssertionFailed`, or transport failures from the
    /// reads.
    pub async fn attribute(self, name: &str, expected: Option<&str>) -> EsperarResult<()> {
        self.ensure_dom("attributes")?;
        let resolved = self.one().await?;
        let actual = resolved.el.attribute(name).await?;
        match expected {
            None => {
                let present = actual.is_some();
                let positive = format!(
                    "Expected attribute {name} of element <{}> to exist",
                    self.subject
                );
                let negative = format!(
                    "Expected attribute {name} of element <{}> to not exist",
                    self.subject
                );
                let shown = actual.unwrap_or_else(|| "null".to_string());
                self.settle(present, positive, negative, "present".to_string(), shown)
            }
            Some(value) => {
                let passed = actual.as_deref() == Some(value);
                let shown = actual.unwrap_or_else(|| "null".to_string());
                let positive = format!(
                    "Expected attribute {name} of element <{}> to be '{value}', but it is '{shown}'.",
                    self.subject
                );
                let negative = format!(
                    "Expected attribute {name} of element <{}> to not be '{value}', but it is.",
                    self.subject
                );
                self.settle(passed, positive, negative, value.to_string(), shown)
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Usage gate: every predicate requires a dom-tagged subject. Checked
    /// before any remote traffic, so the error is synchronous.
    fn ensure_dom(&self, what: &str) -> EsperarResult<()> {
        if self.dom {
            Ok(())
        } else {
            Err(EsperarError::Usage {
                message: format!("Can only test {what} of dom elements"),
            })
        }
    }

    async fn one(&self) -> EsperarResult<Resolved> {
        resolve_one(
            self.query.as_ref(),
            &self.subject,
            self.eventually,
            self.policy,
        )
        .await
    }

    async fn all(&self) -> EsperarResult<Vec<ElementRef>> {
        resolve_all(
            self.query.as_ref(),
            &self.subject,
            self.eventually,
            self.policy,
        )
        .await
    }

    /// Apply negation and settle: pass, or fail with the template for the
    /// active polarity. Observed values are already embedded in the message
    /// by the time this runs.
    fn settle(
        &self,
        passed: bool,
        positive: String,
        negative: String,
        expected: String,
        actual: String,
    ) -> EsperarResult<()> {
        let (verdict, message) = if self.negate {
            (!passed, negative)
        } else {
            (passed, positive)
        };
        self.report(verdict, message, expected, actual)
    }

    /// Log the settled verdict and turn a miss into `AssertionFailed`.
    fn report(
        &self,
        verdict: bool,
        message: String,
        expected: String,
        actual: String,
    ) -> EsperarResult<()> {
        debug!(
            subject = %self.subject,
            negate = self.negate,
            verdict,
            "predicate settled"
        );
        if verdict {
            Ok(())
        } else {
            Err(EsperarError::AssertionFailed {
                message,
                expected,
                actual,
            })
        }
    }
}
