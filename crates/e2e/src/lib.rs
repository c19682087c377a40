//! Swiftcheck E2E Test Framework
//!
//! This crate drives the hosted Singlish to Sinhala translator from Rust:
//! - Probes the site before any browser is launched
//! - Controls a Playwright page through a JSON-line Node driver
//! - Parses declarative YAML test suites
//! - Checks translator output with the eventual-text assertions from
//!   `swiftcheck-common`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner<F: SurfaceFactory>                              │
//! │    ├── preflight() -> SiteProbe                             │
//! │    ├── factory.open() -> PlaywrightSession (Surface)        │
//! │    ├── run_case_on(surface, case) -> TestResult             │
//! │    └── write_results(suite) -> test-results.json            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CaseSuite (YAML)                                           │
//! │    ├── suite, tags, known_defect, timeout_ms                │
//! │    └── cases: [TestCase]                                    │
//! │          └── steps: [TestStep]                              │
//! │                ├── fill { value } / clear                   │
//! │                ├── expect_contains { text, timeout_ms? }    │
//! │                ├── expect_absent { text, timeout_ms? }      │
//! │                ├── expect_input_value { value }             │
//! │                └── sleep { ms } / log { message }           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod playwright;
pub mod runner;
pub mod site;
pub mod spec;

pub use error::{E2eError, E2eResult};
pub use playwright::{PlaywrightConfig, PlaywrightLauncher, PlaywrightSession};
pub use runner::{RunnerConfig, SurfaceFactory, TestRunner};
pub use spec::{CaseSuite, TestCase, TestStep};
