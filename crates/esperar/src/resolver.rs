//! Bounded polling resolution of selectors.
//!
//! Selectors over a still-rendering document may match nothing *yet*. The
//! resolver tolerates that: it re-queries on a fixed interval until a match
//! arrives or an absolute deadline passes. The deadline is computed once per
//! call and only consulted between polls — a query already in flight is
//! always allowed to land.
//!
//! ## Toyota Way Application:
//! - **Heijunka**: one fixed polling interval, no bursts, no backoff
//! - **Jidoka**: transport failures stop the line on the first attempt

use crate::bridge::Resolved;
use crate::driver::{ElementQuery, ElementRef};
use crate::result::{EsperarError, EsperarResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default timeout for eventually-flagged resolutions, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 9000;

/// Fixed interval between consecutive polls, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Timing policy for eventual resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total budget for one resolution call
    pub timeout: Duration,
    /// Pause between consecutive queries
    pub poll_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with `timeout` and the default polling interval
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// A short budget with fast polling, for tests against local documents
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(50),
        }
    }

    /// A generous budget with relaxed polling, for slow-rendering pages
    #[must_use]
    pub const fn slow() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Per-call polling state: one selector, one absolute deadline.
///
/// The deadline is fixed at construction and never recomputed; expiry is a
/// cooperative check between polls, not preemption. Nothing is shared across
/// concurrent resolution calls.
#[derive(Debug, Clone)]
pub struct PollState {
    selector: String,
    deadline: Instant,
    interval: Duration,
    started: Instant,
    attempts: usize,
}

impl PollState {
    /// Open a polling window for `selector` under `policy`, anchored at now.
    #[must_use]
    pub fn begin(selector: &str, policy: RetryPolicy) -> Self {
        let started = Instant::now();
        Self {
            selector: selector.to_string(),
            deadline: started + policy.timeout,
            interval: policy.poll_interval,
            started,
            attempts: 0,
        }
    }

    /// True once the deadline has passed.
    #[must_use]
    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Queries issued within this window so far.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.attempts
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn note_attempt(&mut self) {
        self.attempts += 1;
        trace!(
            selector = %self.selector,
            attempt = self.attempts,
            "querying selector"
        );
    }

    /// Park until the next poll slot. Timer-based; never blocks a thread.
    async fn wait(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Resolve every element matching `selector`.
///
/// With `eventual` unset this is a single query, returning whatever matches
/// (possibly nothing). With it set, the query repeats on the policy's
/// interval until a non-empty result arrives or the deadline passes; at the
/// deadline the final snapshot is returned as-is, even when empty — timeout
/// alone is not a failure for "all".
///
/// # Errors
///
/// Transport failures propagate from the failing query immediately; only
/// "not yet matched" is retried.
pub async fn resolve_all<Q>(
    query: &Q,
    selector: &str,
    eventual: bool,
    policy: RetryPolicy,
) -> EsperarResult<Vec<ElementRef>>
where
    Q: ElementQuery + ?Sized,
{
    if !eventual {
        return query.find_all(selector).await;
    }

    let mut state = PollState::begin(selector, policy);
    loop {
        state.note_attempt();
        let els = query.find_all(selector).await?;
        if !els.is_empty() {
            debug!(
                selector,
                attempts = state.attempts(),
                elapsed_ms = state.elapsed_ms(),
                matched = els.len(),
                "selector matched"
            );
            return Ok(els);
        }
        if state.expired() {
            debug!(
                selector,
                attempts = state.attempts(),
                elapsed_ms = state.elapsed_ms(),
                "deadline passed with no match; returning final snapshot"
            );
            return Ok(els);
        }
        state.wait().await;
    }
}

/// Resolve exactly one element matching `selector`.
///
/// With `eventual` unset this is a single query; zero matches is
/// `ElementNotFound`. With it set, polling proceeds as for
/// [`resolve_all`], but a deadline with zero matches rejects with
/// `ElementNotFound` instead of settling on an empty snapshot. The first
/// match of the first non-empty snapshot wins.
///
/// The handle comes back boxed in [`Resolved`], never bare.
///
/// # Errors
///
/// `ElementNotFound` as above; transport failures propagate immediately and
/// are never retried.
pub async fn resolve_one<Q>(
    query: &Q,
    selector: &str,
    eventual: bool,
    policy: RetryPolicy,
) -> EsperarResult<Resolved>
where
    Q: ElementQuery + ?Sized,
{
    if !eventual {
        return query.find_one(selector).await.map(Resolved::new);
    }

    let mut state = PollState::begin(selector, policy);
    loop {
        state.note_attempt();
        let els = query.find_all(selector).await?;
        if let Some(el) = els.into_iter().next() {
            debug!(
                selector,
                attempts = state.attempts(),
                elapsed_ms = state.elapsed_ms(),
                "selector matched"
            );
            return Ok(Resolved::new(el));
        }
        if state.expired() {
            debug!(
                selector,
                attempts = state.attempts(),
                elapsed_ms = state.elapsed_ms(),
                "deadline passed with no match"
            );
            return Err(EsperarError::ElementNotFound {
                selector: selector.to_string(),
            });
        }
        state.wait().await;
    }
}
