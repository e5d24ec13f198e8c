use crate::browser::{is_present, Browser, BrowserError};
use crate::engine::executor::{AbortReason, Outcome};
use crate::engine::identifier::Identifier;
use crate::engine::probe::{persists, Condition};
use crate::engine::session::Session;
use log::debug;

/// Favorites one photo page.
///
/// `Done` only when the favorite was clicked and confirmed. A deleted or
/// already favorited photo is `Skipped`. Navigation is retried once after a
/// pause before the page counts as unreachable.
pub async fn favorite_photo<B: Browser + ?Sized>(session: &mut Session<'_, B>, url: &str) -> Outcome {
    let id = Identifier::new(url);
    if !reach(session, url).await {
        session.humanize().await;
        if !reach(session, url).await {
            return Outcome::Abort(AbortReason::UnreachablePage(id));
        }
    }
    favorite_loaded(session, &id).await.into()
}

async fn reach<B: Browser + ?Sized>(session: &mut Session<'_, B>, url: &str) -> bool {
    match session.visit(url).await {
        Ok(reached) => reached,
        Err(e) => {
            debug!("Loading {} failed: {}", url, e);
            false
        }
    }
}

async fn favorite_loaded<B: Browser + ?Sized>(session: &mut Session<'_, B>, id: &Identifier) -> Result<Outcome, BrowserError> {
    let config = session.config;
    let selectors = &config.selectors;

    // The owner may have deleted it.
    if is_present(&mut *session.browser, &selectors.photo_not_found).await? {
        debug!("Photo {} not found", id);
        return Ok(Outcome::Skipped);
    }
    if is_present(&mut *session.browser, &selectors.photo_favorited).await? {
        debug!("Photo {} already favorited", id);
        return Ok(Outcome::Skipped);
    }

    // An intercepted click means a full-screen overlay froze the page.
    session.browser.click(&selectors.photo_favorite).await?;
    session.humanize().await;

    if persists(&mut *session.browser, &mut *session.pacer, Condition::Missing(&selectors.photo_favorited)).await? {
        return Ok(Outcome::Abort(AbortReason::RateLimited(id.clone())));
    }
    if persists(&mut *session.browser, &mut *session.pacer, Condition::Present(&selectors.loading_indicator)).await? {
        return Ok(Outcome::Abort(AbortReason::Hang(id.clone())));
    }
    Ok(Outcome::Done)
}
