//! Playwright browser automation
//!
//! A session runs a generated Node driver that keeps one page open on the
//! translator and answers JSON-line requests on stdin/stdout:
//!
//! ```text
//!   Rust ──{"id":1,"op":"fill","selector":"textarea","value":"..."}──► node
//!   Rust ◄─{"id":1,"ok":true}───────────────────────────────────────── node
//!   Rust ──{"id":2,"op":"inner_text","selector":"body"}──────────────► node
//!   Rust ◄─{"id":2,"ok":true,"text":"..."}──────────────────────────── node
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use swiftcheck_common::{Sampler, Stimulus};

use crate::error::{E2eError, E2eResult};
use crate::runner::SurfaceFactory;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::Playwright(format!("Unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    /// Translator page to open for every session
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    /// Budget for the initial page load
    pub navigation_timeout: Duration,
    /// Budget for a single driver request
    pub request_timeout: Duration,
    /// Selector of the Singlish input box
    pub input_selector: String,
    /// Selector whose inner text is sampled for the Sinhala output
    pub output_selector: String,
    /// Directory whose `node_modules` provides `playwright`
    pub node_project_dir: PathBuf,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.swifttranslator.com/".to_string(),
            browser: Browser::Chromium,
            headless: true,
            navigation_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            input_selector: "textarea".to_string(),
            output_selector: "body".to_string(),
            node_project_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverOp<'a> {
    Fill { selector: &'a str, value: &'a str },
    InnerText { selector: &'a str },
    InputValue { selector: &'a str },
    Close,
}

#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    id: u64,
    #[serde(flatten)]
    op: DriverOp<'a>,
}

#[derive(Debug, Deserialize)]
struct DriverResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Build the Node driver script for a session
pub fn build_driver_script(config: &PlaywrightConfig) -> E2eResult<String> {
    Ok(format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');

(async () => {{
  let browser;
  try {{
    browser = await {browser}.launch({{ headless: {headless} }});
    const page = await browser.newPage();
    await page.goto({base_url}, {{ timeout: {navigation_timeout} }});
    await page.waitForLoadState('domcontentloaded');
    reply({{ id: 0, ok: true }});

    const rl = readline.createInterface({{ input: process.stdin }});
    for await (const line of rl) {{
      if (!line.trim()) continue;
      const req = JSON.parse(line);
      try {{
        switch (req.op) {{
          case 'fill':
            await page.fill(req.selector, req.value);
            reply({{ id: req.id, ok: true }});
            break;
          case 'inner_text':
            reply({{ id: req.id, ok: true, text: await page.innerText(req.selector) }});
            break;
          case 'input_value':
            reply({{ id: req.id, ok: true, text: await page.inputValue(req.selector) }});
            break;
          case 'close':
            reply({{ id: req.id, ok: true }});
            return;
          default:
            reply({{ id: req.id, ok: false, error: 'unknown op ' + req.op }});
        }}
      }} catch (error) {{
        reply({{ id: req.id, ok: false, error: error.message }});
      }}
    }}
  }} catch (error) {{
    reply({{ id: 0, ok: false, error: error.message }});
    process.exitCode = 1;
  }} finally {{
    if (browser) await browser.close();
  }}
}})();
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        base_url = serde_json::to_string(&config.base_url)?,
        navigation_timeout = config.navigation_timeout.as_millis(),
    ))
}

/// One browser page on the translator, driven through the Node driver
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    config: PlaywrightConfig,
    // Keeps driver.js alive for the lifetime of the process.
    _script_dir: TempDir,
}

impl PlaywrightSession {
    /// Launch a browser and open the translator page
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed(&config)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, build_driver_script(&config)?)?;

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut child = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(&config.node_project_dir)
            .env("NODE_PATH", config.node_project_dir.join("node_modules"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| E2eError::DriverStartup(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::DriverStartup("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::DriverStartup("driver stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            config,
            _script_dir: script_dir,
        };

        let startup_budget = session.config.navigation_timeout + Duration::from_secs(30);
        let ready = tokio::time::timeout(startup_budget, session.read_response(0))
            .await
            .map_err(|_| E2eError::DriverStartup("timed out waiting for page load".to_string()))?
            .map_err(|e| E2eError::DriverStartup(e.to_string()))?;
        if !ready.ok {
            return Err(E2eError::DriverStartup(
                ready.error.unwrap_or_else(|| "page load failed".to_string()),
            ));
        }

        info!("Opened {} in {}", session.config.base_url, session.config.browser.as_str());
        Ok(session)
    }

    /// Fill the input box, replacing its content
    pub async fn fill(&mut self, value: &str) -> E2eResult<()> {
        let selector = self.config.input_selector.clone();
        self.request(DriverOp::Fill {
            selector: &selector,
            value,
        })
        .await?;
        Ok(())
    }

    /// Inner text of the output selector
    pub async fn inner_text(&mut self) -> E2eResult<String> {
        let selector = self.config.output_selector.clone();
        let text = self.request(DriverOp::InnerText { selector: &selector }).await?;
        Ok(text.unwrap_or_default())
    }

    /// Current value of the input box
    pub async fn read_input(&mut self) -> E2eResult<String> {
        let selector = self.config.input_selector.clone();
        let text = self.request(DriverOp::InputValue { selector: &selector }).await?;
        Ok(text.unwrap_or_default())
    }

    /// Close the browser and stop the driver
    pub async fn close(mut self) -> E2eResult<()> {
        if let Err(e) = self.request(DriverOp::Close).await {
            debug!("Close request failed: {}", e);
        }

        if tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await.is_ok() {
            return Ok(());
        }

        warn!("Playwright driver did not exit, terminating");
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(id) = self.child.id() {
                if kill(Pid::from_raw(id as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(Duration::from_millis(500), self.child.wait())
                        .await
                        .is_ok()
                {
                    return Ok(());
                }
            }
        }

        self.child.kill().await?;
        Ok(())
    }

    async fn request(&mut self, op: DriverOp<'_>) -> E2eResult<Option<String>> {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&DriverRequest { id, op })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let response = tokio::time::timeout(self.config.request_timeout, self.read_response(id))
            .await
            .map_err(|_| {
                E2eError::Playwright(format!(
                    "No reply to request {} within {}ms",
                    id,
                    self.config.request_timeout.as_millis()
                ))
            })??;

        if response.ok {
            Ok(response.text)
        } else {
            Err(E2eError::Playwright(
                response.error.unwrap_or_else(|| "unknown driver error".to_string()),
            ))
        }
    }

    async fn read_response(&mut self, id: u64) -> E2eResult<DriverResponse> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await?
                .ok_or_else(|| E2eError::Playwright("driver exited".to_string()))?;

            match serde_json::from_str::<DriverResponse>(&line) {
                Ok(response) if response.id == id => return Ok(response),
                Ok(response) => debug!("Ignoring stale driver reply {}", response.id),
                Err(_) => debug!("[driver] {}", line),
            }
        }
    }
}

#[async_trait]
impl Sampler for PlaywrightSession {
    async fn sample(&mut self) -> swiftcheck_common::Result<String> {
        Ok(self.inner_text().await?)
    }
}

#[async_trait]
impl Stimulus for PlaywrightSession {
    async fn set_input(&mut self, text: &str) -> swiftcheck_common::Result<()> {
        Ok(self.fill(text).await?)
    }

    async fn input_value(&mut self) -> swiftcheck_common::Result<String> {
        Ok(self.read_input().await?)
    }
}

/// Check if Playwright is installed
fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
    let status = Command::new("npx")
        .args(["playwright", "--version"])
        .current_dir(&config.node_project_dir)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

/// Opens a fresh [`PlaywrightSession`] per test case
#[derive(Debug, Clone, Default)]
pub struct PlaywrightLauncher {
    pub config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SurfaceFactory for PlaywrightLauncher {
    type Surface = PlaywrightSession;

    async fn open(&self) -> E2eResult<PlaywrightSession> {
        PlaywrightSession::launch(self.config.clone()).await
    }

    async fn close(&self, surface: PlaywrightSession) -> E2eResult<()> {
        surface.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_driver_script_embeds_config() {
        let config = PlaywrightConfig {
            base_url: "https://example.test/it's".to_string(),
            browser: Browser::Firefox,
            headless: false,
            navigation_timeout: Duration::from_secs(60),
            ..Default::default()
        };
        let script = build_driver_script(&config).unwrap();

        assert!(script.contains("await firefox.launch({ headless: false })"));
        assert!(script.contains(r#"page.goto("https://example.test/it's", { timeout: 60000 })"#));
        assert!(script.contains("case 'inner_text':"));
    }

    #[test]
    fn test_request_wire_format() {
        let line = serde_json::to_string(&DriverRequest {
            id: 7,
            op: DriverOp::Fill {
                selector: "textarea",
                value: "mama gedhara aavaa",
            },
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["op"], "fill");
        assert_eq!(value["value"], "mama gedhara aavaa");

        let close = serde_json::to_string(&DriverRequest { id: 8, op: DriverOp::Close }).unwrap();
        assert_eq!(close, r#"{"id":8,"op":"close"}"#);
    }

    #[test]
    fn test_response_parsing() {
        let ok: DriverResponse =
            serde_json::from_str(r#"{"id":2,"ok":true,"text":"මම ගෙදර ආවා"}"#).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.text.as_deref(), Some("මම ගෙදර ආවා"));

        let err: DriverResponse =
            serde_json::from_str(r#"{"id":3,"ok":false,"error":"Timeout 30000ms exceeded"}"#).unwrap();
        assert!(!err.ok);
        assert_eq!(err.id, 3);
        assert!(err.error.unwrap().contains("Timeout"));
    }

    #[test_case("chromium", Browser::Chromium ; "chromium")]
    #[test_case("Chrome", Browser::Chromium ; "chrome alias")]
    #[test_case("Firefox", Browser::Firefox ; "firefox mixed case")]
    #[test_case("webkit", Browser::Webkit ; "webkit")]
    #[test_case("safari", Browser::Webkit ; "safari alias")]
    fn test_browser_from_str(name: &str, expected: Browser) {
        assert_eq!(name.parse::<Browser>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_browser_rejected() {
        assert!("lynx".parse::<Browser>().is_err());
    }

    #[test]
    fn test_default_config_targets_translator() {
        let config = PlaywrightConfig::default();
        assert_eq!(config.base_url, "https://www.swifttranslator.com/");
        assert_eq!(config.input_selector, "textarea");
        assert_eq!(config.output_selector, "body");
        assert_eq!(config.navigation_timeout, Duration::from_secs(60));
    }
}
