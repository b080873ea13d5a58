//! Chrome session using the Chrome DevTools Protocol

use crate::error::Result;
use crate::query::{ElementHandle, ElementInfo, ElementQuery};
use crate::session::{stale, KeyChord, Modifier, Session};
use async_trait::async_trait;
use headless_chrome::browser::tab::ModifierKey;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use prosecheck_core::config::BrowserSettings;
use prosecheck_core::CheckError;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Idle period after which Chrome drops the DevTools connection; long enough
/// to survive manual-inspection holds
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// Active browser session with Chrome DevTools Protocol
pub struct ChromeSession {
    /// Underlying browser instance (kept alive for tab lifetime)
    #[allow(dead_code)]
    browser: Browser,
    /// Current active tab
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch a new browser, or attach to one when `debugger_url` is set
    pub async fn open(settings: &BrowserSettings) -> Result<Self> {
        match &settings.debugger_url {
            Some(url) => Self::connect(url, settings).await,
            None => Self::launch(settings).await,
        }
    }

    /// Launch a new browser instance
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        info!(
            "Launching browser (headless: {}, size: {}x{})",
            settings.headless, settings.window_width, settings.window_height
        );

        let launch_options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .window_size(Some((settings.window_width, settings.window_height)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(vec![OsStr::new("--disable-gpu")])
            .build()
            .map_err(|e| CheckError::Browser(format!("Invalid launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| CheckError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| CheckError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(settings.timeout_seconds));

        info!("Browser launched successfully");
        Ok(Self { browser, tab })
    }

    /// Connect to an existing browser through its DevTools websocket URL
    pub async fn connect(debugger_url: &str, settings: &BrowserSettings) -> Result<Self> {
        info!("Connecting to existing browser at {}", debugger_url);

        let browser = Browser::connect(debugger_url.to_string())
            .map_err(|e| CheckError::Browser(format!("Failed to connect to browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| CheckError::Browser(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(settings.timeout_seconds));

        info!("Connected to browser successfully");
        Ok(Self { browser, tab })
    }

    /// Get reference to the active tab
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Execute JavaScript in the page context and return its JSON value
    pub async fn evaluate_script(&self, script: &str) -> Result<serde_json::Value> {
        debug!("Evaluating JavaScript ({} bytes)", script.len());

        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| CheckError::Browser(format!("JavaScript evaluation failed: {}", e)))?;

        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Walk the handle's path through CDP element lookups
    fn locate(&self, handle: &ElementHandle) -> Result<Element<'_>> {
        let mut steps = handle.steps().iter();
        let first = steps.next().ok_or_else(|| stale(handle))?;

        let mut element = self
            .tab
            .find_elements(&first.query.to_css())
            .ok()
            .and_then(|found| found.into_iter().nth(first.index))
            .ok_or_else(|| stale(handle))?;

        for step in steps {
            element = element
                .find_elements(&step.query.to_css())
                .ok()
                .and_then(|found| found.into_iter().nth(step.index))
                .ok_or_else(|| stale(handle))?;
        }

        Ok(element)
    }
}

/// JavaScript expression evaluating to the handle's element, or `null`
fn locate_script(handle: &ElementHandle) -> String {
    let path: Vec<(String, usize)> = handle
        .steps()
        .iter()
        .map(|s| (s.query.to_css(), s.index))
        .collect();
    let path_json = serde_json::to_string(&path).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"(function() {{
            let el = document;
            for (const [selector, index] of {path}) {{
                el = el.querySelectorAll(selector)[index];
                if (!el) {{ return null; }}
            }}
            return el;
        }})()"#,
        path = path_json
    )
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn as_count(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn modifier_key(modifier: Modifier) -> ModifierKey {
    match modifier {
        Modifier::Control => ModifierKey::Ctrl,
        Modifier::Shift => ModifierKey::Shift,
        Modifier::Alt => ModifierKey::Alt,
        Modifier::Meta => ModifierKey::Meta,
    }
}

/// CDP key definitions name printable keys in lowercase (`Control+a`)
fn cdp_key(chord: &KeyChord) -> String {
    let mut chars = chord.key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_lowercase().to_string(),
        _ => chord.key.clone(),
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| CheckError::Navigation(format!("Failed to navigate to {}: {}", url, e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| CheckError::Navigation(format!("Navigation timeout for {}: {}", url, e)))?;

        info!("Successfully navigated to {}", url);
        Ok(())
    }

    async fn query_all(&self, query: &ElementQuery) -> Result<Vec<ElementHandle>> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(&query.to_css())
        );
        let count = as_count(&self.evaluate_script(&script).await?).unwrap_or(0).max(0) as usize;

        Ok((0..count)
            .map(|i| ElementHandle::root(query.clone(), i))
            .collect())
    }

    async fn query_within(
        &self,
        scope: &ElementHandle,
        query: &ElementQuery,
    ) -> Result<Vec<ElementHandle>> {
        let script = format!(
            r#"(function() {{
                const scope = {locate};
                if (!scope) {{ return -1; }}
                return scope.querySelectorAll({selector}).length;
            }})()"#,
            locate = locate_script(scope),
            selector = js_string(&query.to_css())
        );

        match as_count(&self.evaluate_script(&script).await?) {
            Some(n) if n >= 0 => Ok((0..n as usize)
                .map(|i| scope.child(query.clone(), i))
                .collect()),
            _ => Err(stale(scope)),
        }
    }

    async fn describe(&self, handle: &ElementHandle) -> Result<ElementInfo> {
        let script = format!(
            r#"(function() {{
                const el = {locate};
                if (!el) {{ return null; }}
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                const attributes = {{}};
                for (const attr of el.attributes) {{ attributes[attr.name] = attr.value; }}
                return JSON.stringify({{
                    tag: el.tagName.toLowerCase(),
                    attributes,
                    text: el.innerText || el.textContent || '',
                    visible: rect.width > 0 && rect.height > 0
                        && style.visibility !== 'hidden' && style.display !== 'none',
                    enabled: !el.disabled && el.getAttribute('aria-disabled') !== 'true',
                }});
            }})()"#,
            locate = locate_script(handle)
        );

        match self.evaluate_script(&script).await? {
            serde_json::Value::String(json) => Ok(serde_json::from_str(&json)?),
            _ => Err(stale(handle)),
        }
    }

    async fn click(&self, handle: &ElementHandle) -> Result<()> {
        debug!("Clicking {}", handle);

        let element = self.locate(handle)?;
        element
            .click()
            .map_err(|e| CheckError::Action(format!("Click on {} failed: {}", handle, e)))?;
        Ok(())
    }

    async fn select_option(&self, handle: &ElementHandle, value: &str) -> Result<()> {
        let script = format!(
            r#"(function() {{
                const el = {locate};
                if (!el) {{ return false; }}
                el.value = {value};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            locate = locate_script(handle),
            value = js_string(value)
        );

        match self.evaluate_script(&script).await? {
            serde_json::Value::Bool(true) => Ok(()),
            _ => Err(stale(handle)),
        }
    }

    async fn press(&self, chord: &KeyChord) -> Result<()> {
        debug!("Pressing {}", chord);

        let modifiers: Vec<ModifierKey> = chord.modifiers.iter().copied().map(modifier_key).collect();
        let modifiers = if modifiers.is_empty() {
            None
        } else {
            Some(modifiers.as_slice())
        };

        self.tab
            .press_key_with_modifiers(&cdp_key(chord), modifiers)
            .map_err(|e| CheckError::Browser(format!("Key press {} failed: {}", chord, e)))?;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        debug!("Typing {:?}", text);

        self.tab
            .type_str(text)
            .map_err(|e| CheckError::Browser(format!("Typing {:?} failed: {}", text, e)))?;
        Ok(())
    }

    async fn markup(&self, query: &ElementQuery) -> Result<Option<String>> {
        let script = format!(
            "(function() {{ const el = document.querySelector({}); return el ? el.innerHTML : null; }})()",
            js_string(&query.to_css())
        );

        Ok(self
            .evaluate_script(&script)
            .await?
            .as_str()
            .map(str::to_string))
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, full_page)
            .map_err(|e| CheckError::Capture(format!("CDP capture failed: {}", e)))
    }

    async fn close(&self) -> Result<()> {
        info!("Closing browser session");
        // The browser process itself goes away when the session is dropped
        self.tab
            .close(true)
            .map_err(|e| CheckError::Browser(format!("Failed to close tab: {}", e)))?;
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        debug!("ChromeSession dropped, browser will be cleaned up");
    }
}
