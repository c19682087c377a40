//! Declarative YAML test cases
//!
//! A suite file groups cases that share tags, a default timeout and a
//! known-defect flag:
//!
//! ```yaml
//! suite: ui
//! tags: [ui]
//! cases:
//!   - name: Pos_UI_0001
//!     steps:
//!       - action: fill
//!         value: mama gedhara aavaa
//!       - action: expect_contains
//!         text: මම ගෙදර ආවා
//!       - action: clear
//!       - action: expect_absent
//!         text: මම ගෙදර ආවා
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use swiftcheck_common::normalize;

use crate::error::{E2eError, E2eResult};

/// A YAML file holding related test cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSuite {
    /// Suite name, recorded on every case it contains
    pub suite: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags applied to every case
    #[serde(default)]
    pub tags: Vec<String>,

    /// Cases in this suite document translator defects and are expected to fail
    #[serde(default)]
    pub known_defect: bool,

    /// Default polling timeout for assertions in this suite
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    pub cases: Vec<TestCase>,
}

/// A single test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique name, e.g. `Pos_Fun_0001`
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Owning suite, filled in when loaded from a suite file
    #[serde(default)]
    pub suite: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Overrides the suite's flag when set
    #[serde(default)]
    pub known_defect: Option<bool>,

    /// Overrides the suite's timeout when set
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

/// A single step in a test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Replace the translator input
    Fill { value: String },

    /// Empty the translator input
    Clear,

    /// Wait until the output contains the text
    ExpectContains {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Require the text to stay absent for the whole window
    ExpectAbsent {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Check the raw input box value
    ExpectInputValue { value: String },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Log a message (for debugging)
    Log { message: String },
}

impl TestStep {
    /// Short label used in logs and results
    pub fn name(&self) -> String {
        match self {
            TestStep::Fill { value } => format!("fill:{}", preview(value)),
            TestStep::Clear => "clear".to_string(),
            TestStep::ExpectContains { text, .. } => format!("expect_contains:{}", preview(text)),
            TestStep::ExpectAbsent { text, .. } => format!("expect_absent:{}", preview(text)),
            TestStep::ExpectInputValue { value } => format!("expect_input_value:{}", preview(value)),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Log { message } => format!("log:{}", preview(message)),
        }
    }
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    let mut chars = flat.chars();
    let head: String = chars.by_ref().take(30).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

impl TestCase {
    pub fn is_known_defect(&self) -> bool {
        self.known_defect.unwrap_or(false)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Reject cases that could never fail meaningfully.
    pub fn validate(&self) -> E2eResult<()> {
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("{}: no steps", self.name)));
        }
        for step in &self.steps {
            if let TestStep::ExpectContains { text, .. } | TestStep::ExpectAbsent { text, .. } = step {
                if normalize(text).is_empty() {
                    return Err(E2eError::SpecParse(format!(
                        "{}: {} has no text left after normalization",
                        self.name,
                        step.name()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl CaseSuite {
    /// Parse a suite from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a suite from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Flatten into cases, applying suite-level defaults.
    pub fn into_cases(self) -> Vec<TestCase> {
        let CaseSuite {
            suite,
            tags,
            known_defect,
            timeout_ms,
            cases,
            ..
        } = self;

        cases
            .into_iter()
            .map(|mut case| {
                let mut merged = tags.clone();
                for tag in case.tags.drain(..) {
                    if !merged.contains(&tag) {
                        merged.push(tag);
                    }
                }
                case.tags = merged;
                case.suite = Some(suite.clone());
                case.known_defect = Some(case.known_defect.unwrap_or(known_defect));
                case.timeout_ms = case.timeout_ms.or(timeout_ms);
                case
            })
            .collect()
    }
}

/// Load every case from the suite files under `dir`, sorted by path.
pub fn load_all(dir: &Path) -> E2eResult<Vec<TestCase>> {
    let mut cases: Vec<TestCase> = Vec::new();
    let mut seen = HashSet::new();

    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false)
        })
    {
        let suite = CaseSuite::from_file(entry.path())?;
        for case in suite.into_cases() {
            case.validate()?;
            if !seen.insert(case.name.clone()) {
                return Err(E2eError::SpecParse(format!(
                    "Duplicate test case name: {}",
                    case.name
                )));
            }
            cases.push(case);
        }
    }

    Ok(cases)
}

/// Filter cases by tag
pub fn filter_by_tag<'a>(cases: &'a [TestCase], tag: &str) -> Vec<&'a TestCase> {
    cases.iter().filter(|c| c.has_tag(tag)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_ui_suite() {
        let yaml = r#"
suite: ui
description: Behaviour of the translator page itself
tags:
  - ui
timeout_ms: 15000
cases:
  - name: Pos_UI_0001
    description: Verify input clear resets output field
    steps:
      - action: fill
        value: mama gedhara aavaa
      - action: expect_contains
        text: මම ගෙදර ආවා
      - action: clear
      - action: expect_input_value
        value: ""
      - action: expect_absent
        text: මම ගෙදර ආවා
        timeout_ms: 3000
"#;
        let suite = CaseSuite::from_yaml(yaml).unwrap();
        assert_eq!(suite.suite, "ui");
        let cases = suite.into_cases();
        assert_eq!(cases.len(), 1);

        let case = &cases[0];
        assert_eq!(case.suite.as_deref(), Some("ui"));
        assert_eq!(case.timeout_ms, Some(15000));
        assert!(!case.is_known_defect());
        assert_eq!(case.steps.len(), 5);
        assert_eq!(case.steps[2], TestStep::Clear);
        assert_eq!(
            case.steps[4],
            TestStep::ExpectAbsent {
                text: "මම ගෙදර ආවා".to_string(),
                timeout_ms: Some(3000),
            }
        );
    }

    #[test]
    fn test_case_overrides_suite_defaults() {
        let yaml = r#"
suite: negative
tags: [negative]
known_defect: true
cases:
  - name: Neg_A
    tags: [slang, negative]
    steps:
      - action: fill
        value: ado
  - name: Neg_B
    known_defect: false
    timeout_ms: 100
    steps:
      - action: clear
"#;
        let cases = CaseSuite::from_yaml(yaml).unwrap().into_cases();
        assert_eq!(cases[0].tags, vec!["negative".to_string(), "slang".to_string()]);
        assert!(cases[0].is_known_defect());
        assert!(!cases[1].is_known_defect());
        assert_eq!(cases[1].timeout_ms, Some(100));
    }

    #[test]
    fn test_validate_rejects_punctuation_only_expectation() {
        let yaml = r#"
suite: broken
cases:
  - name: Bad
    steps:
      - action: expect_contains
        text: "?!"
"#;
        let cases = CaseSuite::from_yaml(yaml).unwrap().into_cases();
        assert!(matches!(cases[0].validate(), Err(E2eError::SpecParse(_))));
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let yaml = r#"
suite: broken
cases:
  - name: Bad
    steps:
      - action: screenshot
        name: x
"#;
        assert!(CaseSuite::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_step_names_are_truncated() {
        let step = TestStep::Fill {
            value: "a".repeat(40),
        };
        assert_eq!(step.name(), format!("fill:{}…", "a".repeat(30)));
        assert_eq!(TestStep::Sleep { ms: 5 }.name(), "sleep:5ms");
    }

    #[test]
    fn test_load_bundled_specs() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("specs");
        let cases = load_all(&dir).unwrap();

        assert_eq!(cases.len(), 36);
        assert_eq!(filter_by_tag(&cases, "positive").len(), 25);
        let negative = filter_by_tag(&cases, "negative");
        assert_eq!(negative.len(), 10);
        assert!(negative.iter().all(|c| c.is_known_defect()));

        let ui = cases.iter().find(|c| c.name == "Pos_UI_0001").unwrap();
        assert!(ui.steps.contains(&TestStep::Clear));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let suite = "suite: s\ncases:\n  - name: Same\n    steps:\n      - action: clear\n";
        std::fs::write(dir.path().join("a.yaml"), suite).unwrap();
        std::fs::write(dir.path().join("b.yml"), suite).unwrap();

        let err = load_all(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate test case name: Same"));
    }
}
