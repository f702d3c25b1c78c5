//! Navigator: načtení value-bets stránky, výběr filtru "All sports"
//! a plausibility check markupu.

use crate::config::{FILTER_TEXT, MARKUP_ANCHOR, MIN_MARKUP_LEN};
use crate::error::NavigationError;
use crate::pacing::Pacing;
use crate::session::BrowserPage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Znaky interstitial anti-bot stránek. Samotné "captcha" ne: reCAPTCHA skript
/// se načítá i na běžné stránce (login modal).
const CHALLENGE_MARKERS: [&str; 2] = ["<title>just a moment", "cf-challenge"];

pub struct Navigator {
    url: String,
    pacing: Pacing,
    shutdown: Arc<AtomicBool>,
}

impl Navigator {
    pub fn new(url: impl Into<String>, pacing: Pacing) -> Self {
        Self {
            url: url.into(),
            pacing,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sdílený shutdown flag; po nastavení se další pokusy ani pauzy nespouští
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn cancelled(&self) -> Result<(), NavigationError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(NavigationError::Cancelled);
        }
        Ok(())
    }

    /// Bounded retry ve stejné session. Vrací `None` až po vyčerpání pokusů.
    pub fn fetch_markup<P>(&self, page: &P, attempt: u32, max_attempts: u32) -> Option<String>
    where
        P: BrowserPage + ?Sized,
    {
        let mut attempt = attempt.max(1);
        loop {
            info!("Attempt {}/{}: navigating to value bets...", attempt, max_attempts);

            let err = match self.try_fetch(page) {
                Ok(html) => {
                    info!("HTML content retrieved successfully ({} bytes)", html.len());
                    return Some(html);
                }
                Err(err) => err,
            };

            warn!("Navigation attempt {}/{} failed: {}", attempt, max_attempts, err);
            if matches!(err, NavigationError::Cancelled) {
                return None;
            }
            if attempt >= max_attempts {
                warn!("{}", NavigationError::Exhausted(max_attempts));
                return None;
            }

            attempt += 1;
            let delay = self.pacing.nav_retry.pause("navigation retry", &self.shutdown);
            info!(
                "Retrying (attempt {}/{}) after {:.2}s",
                attempt,
                max_attempts,
                delay.as_secs_f64()
            );
        }
    }

    fn try_fetch<P>(&self, page: &P) -> Result<String, NavigationError>
    where
        P: BrowserPage + ?Sized,
    {
        self.cancelled()?;
        page.navigate(&self.url)?;
        info!("Page loaded");
        self.pacing.after_navigation.pause("after navigation", &self.shutdown);
        self.cancelled()?;

        info!("Selecting {:?} filter...", FILTER_TEXT);
        page.click_list_item(FILTER_TEXT)?;
        self.pacing.after_interaction.pause("after filter click", &self.shutdown);
        self.cancelled()?;

        let html = page.content()?;
        check_plausible(&html)?;
        Ok(html)
    }
}

/// Markup musí obsahovat anchor, mít rozumnou délku a nesmí to být challenge
pub fn check_plausible(html: &str) -> Result<(), NavigationError> {
    let lower = html.to_lowercase();

    if CHALLENGE_MARKERS.iter().any(|m| lower.contains(m)) {
        return Err(NavigationError::Challenge);
    }

    let has_anchor = lower.contains(MARKUP_ANCHOR);
    if !has_anchor || html.len() <= MIN_MARKUP_LEN {
        return Err(NavigationError::Implausible {
            len: html.len(),
            has_anchor,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    fn padded(body: &str) -> String {
        let filler = " ".repeat(MIN_MARKUP_LEN);
        format!("<html><body><a href=\"/value-bets/\">x</a>{body}{filler}</body></html>")
    }

    /// Vrací markup ze skriptu, jeden prvek na pokus
    struct ScriptedPage {
        responses: RefCell<VecDeque<Result<String, NavigationError>>>,
        navigations: Cell<u32>,
    }

    impl ScriptedPage {
        fn new(responses: Vec<Result<String, NavigationError>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                navigations: Cell::new(0),
            }
        }
    }

    impl BrowserPage for ScriptedPage {
        fn navigate(&self, _url: &str) -> Result<(), NavigationError> {
            self.navigations.set(self.navigations.get() + 1);
            Ok(())
        }

        fn click_list_item(&self, text: &str) -> Result<(), NavigationError> {
            assert_eq!(text, "All sports");
            Ok(())
        }

        fn content(&self) -> Result<String, NavigationError> {
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(NavigationError::Read("script exhausted".into())))
        }
    }

    fn navigator() -> Navigator {
        Navigator::new("https://example.test/value-bets/", Pacing::none())
    }

    #[test]
    fn plausibility_requires_anchor_and_size() {
        assert!(check_plausible(&padded("")).is_ok());
        assert!(matches!(
            check_plausible("<html>value-bets</html>"),
            Err(NavigationError::Implausible { has_anchor: true, .. })
        ));
        assert!(matches!(
            check_plausible(&" ".repeat(MIN_MARKUP_LEN * 2)),
            Err(NavigationError::Implausible { has_anchor: false, .. })
        ));
    }

    #[test]
    fn challenge_page_is_rejected() {
        let html = padded("<title>Just a moment...</title>");
        assert!(matches!(check_plausible(&html), Err(NavigationError::Challenge)));
        let html = padded("<div id=\"cf-challenge-running\"></div>");
        assert!(matches!(check_plausible(&html), Err(NavigationError::Challenge)));
    }

    #[test]
    fn recaptcha_script_on_real_page_is_plausible() {
        let html = padded(
            "<script src=\"https://www.google.com/recaptcha/api.js\" async defer></script>\
             <div class=\"g-recaptcha\"></div>",
        );
        assert!(check_plausible(&html).is_ok());
    }

    #[test]
    fn retries_until_markup_is_plausible() {
        let page = ScriptedPage::new(vec![
            Ok("<html>too small</html>".to_string()),
            Err(NavigationError::Read("tab crashed".into())),
            Ok(padded("<div>ok</div>")),
        ]);

        let html = navigator().fetch_markup(&page, 1, 3);
        assert!(html.unwrap().contains("<div>ok</div>"));
        assert_eq!(page.navigations.get(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let page = ScriptedPage::new(vec![
            Ok("<html></html>".to_string()),
            Ok("<html></html>".to_string()),
            Ok(padded("")),
        ]);

        assert!(navigator().fetch_markup(&page, 1, 2).is_none());
        assert_eq!(page.navigations.get(), 2);
    }

    #[test]
    fn starting_attempt_counts_toward_the_bound() {
        let page = ScriptedPage::new((0..3).map(|_| Ok("<html></html>".to_string())).collect());

        assert!(navigator().fetch_markup(&page, 3, 3).is_none());
        assert_eq!(page.navigations.get(), 1);
    }

    #[test]
    fn shutdown_stops_without_navigating() {
        let page = ScriptedPage::new((0..3).map(|_| Ok("<html></html>".to_string())).collect());
        let shutdown = Arc::new(AtomicBool::new(true));
        let nav = navigator().with_shutdown(shutdown);

        assert!(nav.fetch_markup(&page, 1, 3).is_none());
        assert_eq!(page.navigations.get(), 0);
    }
}
