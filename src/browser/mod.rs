//! The browser seam consumed by the engine, and its WebDriver implementation.

pub mod types;
pub mod webdriver;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub use webdriver::WebDriver;

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webdriver error '{error}': {message}")]
    Protocol { error: String, message: String },

    #[error("click intercepted on '{0}'")]
    ClickIntercepted(String),

    #[error("no element matches '{0}'")]
    NoSuchElement(String),

    #[error("no element #{index} for '{selector}'")]
    IndexOutOfRange { selector: String, index: usize },

    #[error("malformed webdriver response: {0}")]
    Malformed(String),
}

/// Opaque handle to an element found on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: String,
}

/// Element lookup options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locate {
    /// Drop elements that are not displayed.
    pub visible_only: bool,
    /// Skip the implicit wait, so a missing element is reported immediately.
    pub no_wait: bool,
}

impl Locate {
    /// Visible elements, waiting up to the implicit timeout.
    pub const WAIT: Locate = Locate { visible_only: true, no_wait: false };
    /// Visible elements, answered immediately.
    pub const NOW: Locate = Locate { visible_only: true, no_wait: true };
    /// Any element, answered immediately.
    pub const ANY_NOW: Locate = Locate { visible_only: false, no_wait: true };
    /// Any element, waiting up to the implicit timeout.
    pub const ANY: Locate = Locate { visible_only: false, no_wait: false };
}

/// Primitives the engine needs from a browser session. Calls are sequential;
/// every one may fail.
#[async_trait]
pub trait Browser: Send {
    /// Loads `url`. `Ok(false)` means the page was unreachable or errored.
    async fn navigate(&mut self, url: &str) -> Result<bool, BrowserError>;

    async fn current_url(&mut self) -> Result<String, BrowserError>;

    async fn locate(&mut self, selector: &str, opts: Locate) -> Result<Vec<Element>, BrowserError>;

    async fn read_attributes(
        &mut self,
        selector: &str,
        name: &str,
        opts: Locate,
    ) -> Result<Vec<String>, BrowserError>;

    async fn read_attribute_at(
        &mut self,
        selector: &str,
        index: usize,
        name: &str,
    ) -> Result<String, BrowserError>;

    async fn read_text(&mut self, selector: &str, index: usize) -> Result<String, BrowserError>;

    /// Clicks the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;

    /// Clicks the `index`-th element matching `selector`.
    async fn click_nth(&mut self, selector: &str, index: usize) -> Result<(), BrowserError>;

    async fn scroll_to_bottom(&mut self) -> Result<(), BrowserError>;

    async fn count(&mut self, selector: &str) -> Result<usize, BrowserError>;

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), BrowserError>;

    async fn press_enter(&mut self, selector: &str) -> Result<(), BrowserError>;

    /// Switches into the first iframe matching `selector`. `Ok(false)` if none.
    async fn switch_to_frame(&mut self, selector: &str) -> Result<bool, BrowserError>;

    async fn switch_to_parent(&mut self) -> Result<(), BrowserError>;

    async fn cookies(&mut self) -> Result<Vec<Value>, BrowserError>;

    async fn set_cookies(&mut self, cookies: &[Value]) -> Result<(), BrowserError>;

    async fn local_storage(&mut self) -> Result<BTreeMap<String, String>, BrowserError>;

    async fn set_local_storage(&mut self, items: &BTreeMap<String, String>) -> Result<(), BrowserError>;

    async fn session_storage(&mut self) -> Result<BTreeMap<String, String>, BrowserError>;

    async fn set_session_storage(&mut self, items: &BTreeMap<String, String>) -> Result<(), BrowserError>;

    async fn quit(&mut self) -> Result<(), BrowserError>;
}

/// Presence test that never waits.
pub async fn is_present<B: Browser + ?Sized>(browser: &mut B, selector: &str) -> Result<bool, BrowserError> {
    Ok(!browser.locate(selector, Locate::NOW).await?.is_empty())
}

/// Clicks `selector` if it is on the page right now.
pub async fn click_if_present<B: Browser + ?Sized>(browser: &mut B, selector: &str) -> Result<bool, BrowserError> {
    if browser.locate(selector, Locate::ANY_NOW).await?.is_empty() {
        return Ok(false);
    }
    browser.click(selector).await?;
    Ok(true)
}
