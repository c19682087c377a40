//! Eventual-text assertions
//!
//! The translator output updates asynchronously after its input changes, so
//! assertions sample the surface repeatedly until the expected text shows up
//! (or, for absence checks, until the window closes without it showing up).
//!
//! ```text
//!   normalize(expected) ─┐
//!                        ▼
//!   ┌──► sample ──► normalize ──► contains? ──yes──► Matched
//!   │                                │
//!   │                                no
//!   │                                ▼
//!   └──── sleep(interval) ◄──── deadline passed? ──yes──► NotMatched / TimedOut
//! ```

use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::normalize::{CanonicalText, Normalizer};
use crate::surface::Sampler;

/// Default polling window, matching the translator suite's 20 second budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Bounds for the derived polling interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(25);
pub const MAX_INTERVAL: Duration = Duration::from_millis(500);

/// Options for a single eventual assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Maximum time to keep sampling
    pub timeout: Duration,

    /// Pause between samples. Derived from `timeout` when unset.
    pub interval: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: None,
        }
    }
}

impl PollOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: None,
        }
    }

    pub fn from_millis(timeout_ms: u64) -> Self {
        Self::with_timeout(Duration::from_millis(timeout_ms))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Interval actually slept between samples; never zero.
    pub fn effective_interval(&self) -> Duration {
        let interval = self
            .interval
            .unwrap_or_else(|| (self.timeout / 20).clamp(MIN_INTERVAL, MAX_INTERVAL));
        interval.max(Duration::from_millis(1))
    }
}

/// Terminal result of one polling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A sample contained the expected text.
    Matched {
        /// The normalized sample that matched
        snapshot: String,
        elapsed: Duration,
        samples: usize,
    },

    /// The window elapsed and no sample contained the text.
    NotMatched {
        /// Last successful sample, normalized
        final_snapshot: String,
        elapsed: Duration,
        samples: usize,
    },

    /// The window elapsed without a single successful sample.
    TimedOut {
        elapsed: Duration,
        samples: usize,
        last_error: Option<String>,
    },
}

impl PollOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, PollOutcome::Matched { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Matched { elapsed, .. }
            | PollOutcome::NotMatched { elapsed, .. }
            | PollOutcome::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    pub fn samples(&self) -> usize {
        match self {
            PollOutcome::Matched { samples, .. }
            | PollOutcome::NotMatched { samples, .. }
            | PollOutcome::TimedOut { samples, .. } => *samples,
        }
    }
}

/// Polls a [`Sampler`] for normalized text containment.
#[derive(Debug, Clone)]
pub struct TextVerifier<C = SystemClock> {
    clock: C,
    normalizer: Normalizer,
}

impl TextVerifier<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TextVerifier<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TextVerifier<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            normalizer: Normalizer::default(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Poll until the surface contains `expected` or the window closes.
    pub async fn watch<S>(
        &self,
        sampler: &mut S,
        expected: &str,
        options: &PollOptions,
    ) -> Result<PollOutcome>
    where
        S: Sampler + ?Sized,
    {
        let expected = self.expectation(expected)?;
        Ok(self.poll(sampler, &expected, options).await)
    }

    /// Succeed as soon as the surface contains `expected`.
    ///
    /// Fails with [`Error::Timeout`] carrying the last normalized sample if
    /// the window closes first.
    pub async fn assert_contains<S>(
        &self,
        sampler: &mut S,
        expected: &str,
        options: &PollOptions,
    ) -> Result<PollOutcome>
    where
        S: Sampler + ?Sized,
    {
        let expected = self.expectation(expected)?;

        match self.poll(sampler, &expected, options).await {
            outcome @ PollOutcome::Matched { .. } => {
                debug!(
                    expected = %expected,
                    elapsed_ms = outcome.elapsed().as_millis() as u64,
                    samples = outcome.samples(),
                    "Surface contains expected text"
                );
                Ok(outcome)
            }
            PollOutcome::NotMatched {
                final_snapshot,
                samples,
                ..
            } => Err(Error::Timeout {
                expected: expected.into_string(),
                timeout: options.timeout,
                last_snapshot: Some(final_snapshot),
                last_error: None,
                samples,
            }),
            PollOutcome::TimedOut {
                samples,
                last_error,
                ..
            } => Err(Error::Timeout {
                expected: expected.into_string(),
                timeout: options.timeout,
                last_snapshot: None,
                last_error,
                samples,
            }),
        }
    }

    /// Succeed only if `text` is never observed during the whole window.
    ///
    /// Fails with [`Error::StillPresent`] on the first sample containing it,
    /// without waiting for the window to close. A surface that could not be
    /// read at all fails with [`Error::Timeout`].
    pub async fn assert_absent<S>(
        &self,
        sampler: &mut S,
        text: &str,
        options: &PollOptions,
    ) -> Result<PollOutcome>
    where
        S: Sampler + ?Sized,
    {
        let text = self.expectation(text)?;

        match self.poll(sampler, &text, options).await {
            PollOutcome::Matched {
                snapshot, elapsed, ..
            } => Err(Error::StillPresent {
                text: text.into_string(),
                snapshot,
                elapsed,
            }),
            outcome @ PollOutcome::NotMatched { .. } => {
                debug!(
                    text = %text,
                    samples = outcome.samples(),
                    "Text stayed absent for the whole window"
                );
                Ok(outcome)
            }
            PollOutcome::TimedOut {
                samples,
                last_error,
                ..
            } => Err(Error::Timeout {
                expected: text.into_string(),
                timeout: options.timeout,
                last_snapshot: None,
                last_error,
                samples,
            }),
        }
    }

    fn expectation(&self, raw: &str) -> Result<CanonicalText> {
        let expected = self.normalizer.normalize(raw);
        if expected.is_empty() {
            return Err(Error::InvalidExpectation {
                raw: raw.to_string(),
            });
        }
        Ok(expected)
    }

    async fn poll<S>(
        &self,
        sampler: &mut S,
        expected: &CanonicalText,
        options: &PollOptions,
    ) -> PollOutcome
    where
        S: Sampler + ?Sized,
    {
        let start = self.clock.now();
        let deadline = start + options.timeout;
        let interval = options.effective_interval();
        let mut samples = 0usize;
        let mut last_snapshot: Option<CanonicalText> = None;
        let mut last_error: Option<String> = None;

        loop {
            samples += 1;
            match sampler.sample().await {
                Ok(raw) => {
                    let snapshot = self.normalizer.normalize(&raw);
                    trace!(samples, chars = snapshot.as_str().chars().count(), "Sampled surface");
                    if snapshot.contains(expected) {
                        return PollOutcome::Matched {
                            snapshot: snapshot.into_string(),
                            elapsed: self.clock.now().saturating_duration_since(start),
                            samples,
                        };
                    }
                    last_snapshot = Some(snapshot);
                }
                Err(e) => {
                    // A failed read is retried like any other miss.
                    warn!(samples, error = %e, "Sampler failed");
                    last_error = Some(e.to_string());
                }
            }

            let now = self.clock.now();
            if now >= deadline {
                let elapsed = now.saturating_duration_since(start);
                return match last_snapshot {
                    Some(snapshot) => PollOutcome::NotMatched {
                        final_snapshot: snapshot.into_string(),
                        elapsed,
                        samples,
                    },
                    None => PollOutcome::TimedOut {
                        elapsed,
                        samples,
                        last_error,
                    },
                };
            }

            let remaining = deadline.saturating_duration_since(now);
            self.clock.sleep(interval.min(remaining)).await;
        }
    }
}

/// [`TextVerifier::assert_contains`] on the system clock.
pub async fn assert_contains<S>(
    sampler: &mut S,
    expected: &str,
    options: &PollOptions,
) -> Result<PollOutcome>
where
    S: Sampler + ?Sized,
{
    TextVerifier::new()
        .assert_contains(sampler, expected, options)
        .await
}

/// [`TextVerifier::assert_absent`] on the system clock.
pub async fn assert_absent<S>(
    sampler: &mut S,
    text: &str,
    options: &PollOptions,
) -> Result<PollOutcome>
where
    S: Sampler + ?Sized,
{
    TextVerifier::new().assert_absent(sampler, text, options).await
}
