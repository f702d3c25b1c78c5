//! Session manager: životní cyklus headless Chrome procesu a jednoho tabu.
//!
//! Session se vytváří na začátku pokusu a ruší na jeho konci, vždy.
//! `SessionScope` drží session a v `Drop` ji uvolní, takže release proběhne
//! i při chybě nebo panice uvnitř pokusu.

use crate::config::{ScraperConfig, NAVIGATION_TIMEOUT, USER_AGENT, VIEWPORT};
use crate::error::{NavigationError, SessionError};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Operace nad stránkou, které potřebuje Navigator
pub trait BrowserPage {
    /// Načte URL a počká, až se stránka usadí
    fn navigate(&self, url: &str) -> Result<(), NavigationError>;
    /// Klikne na list item (role=listitem) obsahující daný text
    fn click_list_item(&self, text: &str) -> Result<(), NavigationError>;
    /// Plně vyrenderovaný markup
    fn content(&self) -> Result<String, NavigationError>;
}

pub trait BrowsingSession: BrowserPage {
    /// Zavře tab a ukončí proces prohlížeče. Idempotentní.
    fn release(&mut self);
}

pub trait SessionManager {
    type Session: BrowsingSession;

    fn acquire(&self) -> Result<Self::Session, SessionError>;
}

/// Scoped acquisition: release v `Drop`
pub struct SessionScope<S: BrowsingSession> {
    session: S,
}

impl<S: BrowsingSession> SessionScope<S> {
    pub fn acquire<M>(manager: &M) -> Result<Self, SessionError>
    where
        M: SessionManager<Session = S>,
    {
        Ok(Self {
            session: manager.acquire()?,
        })
    }
}

impl<S: BrowsingSession> Deref for SessionScope<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: BrowsingSession> DerefMut for SessionScope<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: BrowsingSession> Drop for SessionScope<S> {
    fn drop(&mut self) {
        self.session.release();
    }
}

// ── Chrome ───────────────────────────────────────────────────────────────────

pub struct ChromeSessionManager {
    chrome_path:  Option<PathBuf>,
    headless:     bool,
    user_agent:   String,
    viewport:     (u32, u32),
    nav_timeout:  Duration,
}

impl ChromeSessionManager {
    pub fn new(cfg: &ScraperConfig) -> Self {
        Self {
            chrome_path: cfg.chrome_path.clone(),
            headless:    cfg.headless,
            user_agent:  USER_AGENT.to_string(),
            viewport:    VIEWPORT,
            nav_timeout: NAVIGATION_TIMEOUT,
        }
    }
}

impl SessionManager for ChromeSessionManager {
    type Session = ChromeSession;

    fn acquire(&self) -> Result<ChromeSession, SessionError> {
        info!("Launching Chrome (headless: {})...", self.headless);

        let options = LaunchOptions::default_builder()
            .headless(self.headless)
            .sandbox(false)
            .window_size(Some(self.viewport))
            .path(self.chrome_path.clone())
            .idle_browser_timeout(self.nav_timeout * 2)
            .build()
            .map_err(|e| SessionError::LaunchOptions(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| SessionError::Launch(format!("{e:#}")))?;
        let tab = browser.new_tab().map_err(|e| SessionError::Tab(format!("{e:#}")))?;

        tab.set_default_timeout(self.nav_timeout);
        tab.set_user_agent(&self.user_agent, Some("en-US,en;q=0.9"), None)
            .map_err(|e| SessionError::Tab(format!("set user agent: {e:#}")))?;

        info!("Browser and tab created successfully");
        Ok(ChromeSession {
            browser: Some(browser),
            tab: Some(tab),
        })
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    tab:     Option<Arc<Tab>>,
}

impl ChromeSession {
    fn tab(&self) -> Result<&Arc<Tab>, NavigationError> {
        self.tab
            .as_ref()
            .ok_or_else(|| NavigationError::Read("session already released".to_string()))
    }
}

impl BrowserPage for ChromeSession {
    fn navigate(&self, url: &str) -> Result<(), NavigationError> {
        let tab = self.tab()?;
        let failed = |e: anyhow::Error| NavigationError::Navigate {
            url: url.to_string(),
            reason: format!("{e:#}"),
        };

        tab.navigate_to(url).map_err(failed)?;
        tab.wait_until_navigated().map_err(failed)?;
        tab.wait_for_element("body").map_err(failed)?;
        Ok(())
    }

    fn click_list_item(&self, text: &str) -> Result<(), NavigationError> {
        let tab = self.tab()?;
        let items = tab
            .wait_for_elements(r#"li, [role="listitem"]"#)
            .map_err(|e| NavigationError::Interaction(format!("{e:#}")))?;

        for item in items {
            let matches = item
                .get_inner_text()
                .map(|t| t.contains(text))
                .unwrap_or(false);
            if matches {
                item.click()
                    .map_err(|e| NavigationError::Interaction(format!("click {text:?}: {e:#}")))?;
                return Ok(());
            }
        }

        Err(NavigationError::Interaction(format!("no list item containing {text:?}")))
    }

    fn content(&self) -> Result<String, NavigationError> {
        self.tab()?
            .get_content()
            .map_err(|e| NavigationError::Read(format!("{e:#}")))
    }
}

impl BrowsingSession for ChromeSession {
    fn release(&mut self) {
        if let Some(tab) = self.tab.take() {
            if let Err(e) = tab.close(true) {
                warn!("Failed to close tab: {e:#}");
            }
        }
        // Drop Browser ukončí Chrome proces
        if self.browser.take().is_some() {
            info!("Browser closed");
        } else {
            debug!("Session already released");
        }
    }
}
