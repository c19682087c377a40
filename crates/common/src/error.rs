//! Error types for swiftcheck assertions

use std::time::Duration;
use thiserror::Error;

/// Result type alias using the swiftcheck Error
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal assertion failures and surface errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `assert_contains` never observed the expected text within the window.
    #[error(
        "Timeout after {}ms waiting for \"{expected}\" ({samples} samples, last seen: {})",
        timeout.as_millis(),
        describe_last(last_snapshot.as_deref(), last_error.as_deref())
    )]
    Timeout {
        /// Normalized expected text
        expected: String,
        /// Configured polling window
        timeout: Duration,
        /// Last successfully sampled text, normalized
        last_snapshot: Option<String>,
        /// Last sampler error, if any sample failed
        last_error: Option<String>,
        /// Number of sampler invocations
        samples: usize,
    },

    /// `assert_absent` observed the text while it should never appear.
    #[error(
        "Text \"{text}\" still present after {}ms in \"{snapshot}\"",
        elapsed.as_millis()
    )]
    StillPresent {
        /// Normalized text that should have been absent
        text: String,
        /// Normalized sample that contained it
        snapshot: String,
        /// Time from the start of the assertion to detection
        elapsed: Duration,
    },

    /// The expected text normalizes to nothing and would match any surface.
    #[error("Expected text \"{raw}\" is empty after normalization")]
    InvalidExpectation { raw: String },

    #[error("Surface error: {0}")]
    Surface(String),
}

fn describe_last(snapshot: Option<&str>, error: Option<&str>) -> String {
    match (snapshot, error) {
        (Some(snapshot), _) => format!("\"{}\"", snapshot),
        (None, Some(error)) => format!("<no sample, last error: {}>", error),
        (None, None) => "<no sample>".to_string(),
    }
}
