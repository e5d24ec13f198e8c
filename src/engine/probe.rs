use crate::browser::{is_present, Browser, BrowserError};
use crate::engine::pacing::Pacer;

/// A page condition that signals trouble when it holds.
#[derive(Debug, Clone, Copy)]
pub enum Condition<'a> {
    /// The selector matches a visible element.
    Present(&'a str),
    /// The selector matches nothing visible.
    Missing(&'a str),
}

impl Condition<'_> {
    pub async fn holds<B: Browser + ?Sized>(&self, browser: &mut B) -> Result<bool, BrowserError> {
        match self {
            Condition::Present(selector) => is_present(browser, selector).await,
            Condition::Missing(selector) => Ok(!is_present(browser, selector).await?),
        }
    }
}

/// Two-stage check: test `condition` immediately; if it holds, wait one
/// humanized step and test again. Returns whether it still holds.
pub async fn persists<B: Browser + ?Sized>(
    browser: &mut B,
    pacer: &mut Pacer,
    condition: Condition<'_>,
) -> Result<bool, BrowserError> {
    if !condition.holds(browser).await? {
        return Ok(false);
    }
    pacer.humanize().await;
    condition.holds(browser).await
}
