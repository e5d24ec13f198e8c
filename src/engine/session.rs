use crate::browser::{is_present, Browser, BrowserError};
use crate::config::Config;
use crate::engine::identifier::Identifier;
use crate::engine::pacing::Pacer;
use log::warn;

/// Borrowed view of everything a collector or executor drives: the browser,
/// the random source and the configuration.
pub struct Session<'a, B: Browser + ?Sized> {
    pub browser: &'a mut B,
    pub pacer: &'a mut Pacer,
    pub config: &'a Config,
}

impl<'a, B: Browser + ?Sized> Session<'a, B> {
    pub fn new(browser: &'a mut B, pacer: &'a mut Pacer, config: &'a Config) -> Self {
        Self { browser, pacer, config }
    }

    /// Loads `url` and checks the site's error page is not shown.
    pub async fn visit(&mut self, url: &str) -> Result<bool, BrowserError> {
        if !self.browser.navigate(url).await? {
            return Ok(false);
        }
        if is_present(&mut *self.browser, &self.config.selectors.error_page).await? {
            warn!("Error page shown for {}", url);
            return Ok(false);
        }
        Ok(true)
    }

    pub async fn humanize(&mut self) {
        self.pacer.humanize().await;
    }

    /// Scrolls to the bottom `passes` times, pausing after each to let lazy
    /// content load.
    pub async fn scroll_passes(&mut self, passes: u32) -> Result<(), BrowserError> {
        for _ in 0..passes {
            self.browser.scroll_to_bottom().await?;
            self.pacer.humanize().await;
        }
        Ok(())
    }

    /// Owner contact URL plus `suffix`, or `None` before authentication.
    pub fn owner_url(&self, owner: Option<&Identifier>, suffix: &str) -> Option<String> {
        owner.map(|o| format!("{}{}", o.as_str().trim_end_matches('/'), suffix))
    }
}
