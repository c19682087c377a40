//! Test runner that drives translator surfaces through YAML test cases

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use swiftcheck_common::{Clock, PollOptions, Surface, SystemClock, TextVerifier};

use crate::error::{E2eError, E2eResult};
use crate::site::SiteProbe;
use crate::spec::{self, TestCase, TestStep};

/// Opens a fresh surface for every test case
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    type Surface: Surface + 'static;

    async fn open(&self) -> E2eResult<Self::Surface>;

    /// Release a surface once its case has finished
    async fn close(&self, surface: Self::Surface) -> E2eResult<()> {
        drop(surface);
        Ok(())
    }
}

/// Result of executing a test step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// How a case ended, taking known defects into account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    /// A known defect reproduced
    ExpectedFailure,
    /// A known defect no longer reproduces
    UnexpectedPass,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub suite: Option<String>,
    pub status: CaseStatus,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
}

impl TestResult {
    /// Whether this result should fail the run
    pub fn is_failure(&self) -> bool {
        self.status == CaseStatus::Failed
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub expected_failures: usize,
    pub unexpected_passes: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(started_at: DateTime<Utc>, duration_ms: u64, results: Vec<TestResult>) -> Self {
        let count = |status: CaseStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            started_at,
            total: results.len(),
            passed: count(CaseStatus::Passed),
            failed: count(CaseStatus::Failed),
            expected_failures: count(CaseStatus::ExpectedFailure),
            unexpected_passes: count(CaseStatus::UnexpectedPass),
            duration_ms,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Directory of YAML suite files
    pub specs_dir: PathBuf,

    /// Output directory for results
    pub output_dir: PathBuf,

    /// Polling options for steps without their own timeout
    pub poll: PollOptions,

    /// URL to probe once before the first case, if any
    pub preflight_url: Option<String>,

    pub preflight_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from("crates/e2e/specs"),
            output_dir: PathBuf::from("test-results"),
            poll: PollOptions::default(),
            preflight_url: None,
            preflight_timeout: Duration::from_secs(60),
        }
    }
}

/// Main E2E test runner
pub struct TestRunner<F, C = SystemClock> {
    factory: F,
    verifier: TextVerifier<C>,
    config: RunnerConfig,
    preflight_done: bool,
}

impl<F: SurfaceFactory> TestRunner<F> {
    pub fn new(factory: F, config: RunnerConfig) -> Self {
        Self::with_verifier(factory, config, TextVerifier::new())
    }
}

impl<F: SurfaceFactory, C: Clock> TestRunner<F, C> {
    pub fn with_verifier(factory: F, config: RunnerConfig, verifier: TextVerifier<C>) -> Self {
        Self {
            factory,
            verifier,
            config,
            preflight_done: false,
        }
    }

    /// Probe the site once, if a preflight URL is configured
    pub async fn preflight(&mut self) -> E2eResult<()> {
        if self.preflight_done {
            return Ok(());
        }
        if let Some(url) = &self.config.preflight_url {
            SiteProbe::new()?
                .wait_until_reachable(url, self.config.preflight_timeout)
                .await?;
        }
        self.preflight_done = true;
        Ok(())
    }

    /// Run all cases in the specs directory
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        let cases = spec::load_all(&self.config.specs_dir)?;
        self.run_cases(&cases).await
    }

    /// Run cases matching a tag
    pub async fn run_tagged(&mut self, tag: &str) -> E2eResult<TestSuiteResult> {
        let cases = spec::load_all(&self.config.specs_dir)?;
        let filtered: Vec<TestCase> = spec::filter_by_tag(&cases, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_cases(&filtered).await
    }

    /// Run a specific case by name
    pub async fn run_case(&mut self, name: &str) -> E2eResult<TestResult> {
        let cases = spec::load_all(&self.config.specs_dir)?;
        let case = cases
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| E2eError::SpecParse(format!("Test not found: {}", name)))?;

        self.preflight().await?;
        self.run_spec(&case).await
    }

    /// Run a list of cases, one fresh surface each
    pub async fn run_cases(&mut self, cases: &[TestCase]) -> E2eResult<TestSuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(cases.len());

        self.preflight().await?;

        info!("Running {} test(s)...", cases.len());

        for case in cases {
            let result = match self.run_spec(case).await {
                Ok(result) => result,
                Err(e) => TestResult {
                    name: case.name.clone(),
                    suite: case.suite.clone(),
                    status: CaseStatus::Failed,
                    duration_ms: 0,
                    steps: vec![],
                    error: Some(e.to_string()),
                },
            };

            match result.status {
                CaseStatus::Passed => info!("✓ {} ({} ms)", result.name, result.duration_ms),
                CaseStatus::ExpectedFailure => info!("✓ {} (known defect reproduced)", result.name),
                CaseStatus::UnexpectedPass => {
                    warn!("! {} passed but is marked as a known defect", result.name)
                }
                CaseStatus::Failed => error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let summary = TestSuiteResult::from_results(started_at, duration_ms, results);

        info!(
            "Test Results: {} passed, {} failed, {} known defects, {} unexpected passes ({} ms)",
            summary.passed,
            summary.failed,
            summary.expected_failures,
            summary.unexpected_passes,
            duration_ms
        );

        Ok(summary)
    }

    /// Run a single case on a newly opened surface
    pub async fn run_spec(&mut self, case: &TestCase) -> E2eResult<TestResult> {
        let mut surface = self.factory.open().await?;
        let result = self.run_case_on(&mut surface, case).await;
        if let Err(e) = self.factory.close(surface).await {
            warn!("Failed to close surface for {}: {}", case.name, e);
        }
        Ok(result)
    }

    /// Run a case against an already opened surface
    pub async fn run_case_on<S>(&self, surface: &mut S, case: &TestCase) -> TestResult
    where
        S: Surface + ?Sized,
    {
        let start = Instant::now();
        debug!("Running test: {}", case.name);

        let mut steps = Vec::with_capacity(case.steps.len());
        let mut test_error: Option<String> = None;

        for step in &case.steps {
            let step_start = Instant::now();
            let step_name = step.name();
            debug!("Executing step: {}", step_name);

            let outcome = self.execute_step(surface, case, step).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => steps.push(StepResult {
                    success: true,
                    step_name,
                    duration_ms,
                    error: None,
                }),
                Err(e) => {
                    let message = e.to_string();
                    steps.push(StepResult {
                        success: false,
                        step_name,
                        duration_ms,
                        error: Some(message.clone()),
                    });
                    test_error = Some(message);
                    break; // Stop on first failure
                }
            }
        }

        let status = match (test_error.is_some(), case.is_known_defect()) {
            (false, false) => CaseStatus::Passed,
            (true, false) => CaseStatus::Failed,
            (true, true) => CaseStatus::ExpectedFailure,
            (false, true) => CaseStatus::UnexpectedPass,
        };

        TestResult {
            name: case.name.clone(),
            suite: case.suite.clone(),
            status,
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            error: test_error,
        }
    }

    fn poll_options(&self, case: &TestCase, step_timeout_ms: Option<u64>) -> PollOptions {
        step_timeout_ms
            .or(case.timeout_ms)
            .map(PollOptions::from_millis)
            .unwrap_or(self.config.poll)
    }

    async fn execute_step<S>(&self, surface: &mut S, case: &TestCase, step: &TestStep) -> E2eResult<()>
    where
        S: Surface + ?Sized,
    {
        match step {
            TestStep::Fill { value } => surface.set_input(value).await?,
            TestStep::Clear => surface.set_input("").await?,
            TestStep::ExpectContains { text, timeout_ms } => {
                let options = self.poll_options(case, *timeout_ms);
                self.verifier.assert_contains(surface, text, &options).await?;
            }
            TestStep::ExpectAbsent { text, timeout_ms } => {
                let options = self.poll_options(case, *timeout_ms);
                self.verifier.assert_absent(surface, text, &options).await?;
            }
            TestStep::ExpectInputValue { value } => {
                self.wait_for_input_value(surface, case, step, value).await?;
            }
            TestStep::Sleep { ms } => {
                self.verifier.clock().sleep(Duration::from_millis(*ms)).await;
            }
            TestStep::Log { message } => {
                info!("[TEST LOG] {}", message);
            }
        }
        Ok(())
    }

    /// The input box may lag a fill by a frame, so re-read until the window closes.
    async fn wait_for_input_value<S>(
        &self,
        surface: &mut S,
        case: &TestCase,
        step: &TestStep,
        expected: &str,
    ) -> E2eResult<()>
    where
        S: Surface + ?Sized,
    {
        let options = self.poll_options(case, None);
        let clock = self.verifier.clock();
        let deadline = clock.now() + options.timeout;

        loop {
            let actual = surface.input_value().await?;
            if actual == expected {
                return Ok(());
            }
            let now = clock.now();
            if now >= deadline {
                return Err(E2eError::StepFailed {
                    step: step.name(),
                    reason: format!("input value is \"{}\", expected \"{}\"", actual, expected),
                });
            }
            clock
                .sleep(options.effective_interval().min(deadline - now))
                .await;
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
