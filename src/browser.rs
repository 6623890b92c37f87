use async_trait::async_trait;
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::utils::error::{AppError, Result};

/// Produces the post-JavaScript HTML of a page once `wait_for` has rendered.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, wait_for: &str, timeout: Duration) -> Result<String>;
}

/// One live browser page. Calls are blocking.
pub trait PageSession {
    fn navigate(&mut self, url: &str) -> Result<()>;
    fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()>;
    fn content(&self) -> Result<String>;
    /// Shuts the page and its browser process down. Must be safe to call more than once.
    fn terminate(&mut self);
}

pub trait BrowserLauncher: Send + Sync + 'static {
    type Session: PageSession;

    fn launch(&self) -> Result<Self::Session>;
}

/// Owns a session for the length of a scope and terminates it on drop,
/// whichever way the scope is left.
pub struct SessionGuard<S: PageSession> {
    session: S,
}

impl<S: PageSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: PageSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.session.terminate();
    }
}

/// Launch, navigate, wait for `wait_for`, and return the rendered HTML.
pub fn capture_rendered_html<L: BrowserLauncher>(
    launcher: &L,
    url: &str,
    wait_for: &str,
    timeout: Duration,
) -> Result<String> {
    let mut guard = SessionGuard::new(launcher.launch()?);

    guard.session_mut().navigate(url)?;
    guard.session().wait_for_element(wait_for, timeout)?;
    let html = guard.session().content()?;

    debug!(url, bytes = html.len(), "Captured rendered page");
    Ok(html)
}

/// Runs a blocking launcher on tokio's blocking pool.
pub struct BlockingRenderer<L: BrowserLauncher> {
    launcher: Arc<L>,
}

impl<L: BrowserLauncher> BlockingRenderer<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher: Arc::new(launcher),
        }
    }
}

#[async_trait]
impl<L: BrowserLauncher> PageRenderer for BlockingRenderer<L> {
    async fn render(&self, url: &str, wait_for: &str, timeout: Duration) -> Result<String> {
        let launcher = Arc::clone(&self.launcher);
        let url = url.to_string();
        let wait_for = wait_for.to_string();

        tokio::task::spawn_blocking(move || capture_rendered_html(launcher.as_ref(), &url, &wait_for, timeout))
            .await
            .map_err(|e| AppError::Browser(format!("Render task failed: {}", e)))?
    }
}

/// Headless Chrome via the DevTools protocol.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    chrome_path: Option<String>,
    user_agent: String,
}

impl ChromeLauncher {
    pub fn new(chrome_path: Option<String>, user_agent: impl Into<String>) -> Self {
        Self {
            chrome_path,
            user_agent: user_agent.into(),
        }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &self.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        Ok(launch_options)
    }
}

impl BrowserLauncher for ChromeLauncher {
    type Session = ChromeSession;

    fn launch(&self) -> Result<ChromeSession> {
        let browser = Browser::new(self.launch_options()?)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&self.user_agent, None, None)
            .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;

        Ok(ChromeSession {
            browser: Some(browser),
            tab,
        })
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

impl PageSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| AppError::Browser(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AppError::Browser(format!("Page load failed: {}", e)))?;
        Ok(())
    }

    fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| wait_error(selector, timeout, e))?;
        Ok(())
    }

    fn content(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))
    }

    fn terminate(&mut self) {
        // Dropping the Browser kills the Chrome process.
        if let Some(browser) = self.browser.take() {
            if let Err(e) = self.tab.close(true) {
                warn!(error = %e, "Failed to close tab");
            }
            drop(browser);
            debug!("Browser session terminated");
        }
    }
}

/// Only a wait that ran out of time is an element timeout; a crashed tab or a
/// dropped DevTools connection is a browser failure.
fn wait_error(selector: &str, timeout: Duration, err: anyhow::Error) -> AppError {
    if err.downcast_ref::<Timeout>().is_some() {
        AppError::ElementTimeout {
            selector: selector.to_string(),
            timeout_secs: timeout.as_secs(),
            reason: err.to_string(),
        }
    } else {
        AppError::Browser(format!("Waiting for {} failed: {}", selector, err))
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.terminate();
    }
}
