//! Swiftcheck Common Library
//!
//! Text-equivalence verification for an asynchronously updating translator UI:
//! - `normalize`: canonicalizes text so punctuation, whitespace, NBSP and
//!   zero-width differences do not matter
//! - `poll`: eventual containment / absence assertions over a [`Sampler`]
//! - `clock`: injectable time so polling can be tested without real delays
//! - `surface`: the capabilities a browser (or a fake) provides

pub mod clock;
pub mod error;
pub mod normalize;
pub mod poll;
pub mod surface;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use normalize::{normalize, normalize_opt, CanonicalText, Normalizer};
pub use poll::{assert_absent, assert_contains, PollOptions, PollOutcome, TextVerifier};
pub use surface::{sampler_fn, FnSampler, Sampler, Stimulus, Surface};

/// Swiftcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
