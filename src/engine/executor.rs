//! Batch executors: dequeue up to a randomly drawn number of items and act on
//! each, stopping the whole batch on the first abort signal.

use crate::browser::{is_present, Browser, BrowserError, Locate};
use crate::engine::favorite::favorite_photo;
use crate::engine::identifier::Identifier;
use crate::engine::probe::{persists, Condition};
use crate::engine::session::Session;
use crate::engine::state::RunState;
use log::{debug, info, warn};
use thiserror::Error;

/// Why a batch stopped early.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    #[error("PAGE UNREACHABLE ({0})")]
    UnreachablePage(Identifier),

    #[error("SEEMS USER CAN'T ACT ON ({0}) ANYMORE")]
    RateLimited(Identifier),

    #[error("SEEMS SITE HANG ON ({0})")]
    Hang(Identifier),

    #[error("{0}")]
    Interaction(String),
}

impl From<BrowserError> for AbortReason {
    fn from(e: BrowserError) -> Self {
        AbortReason::Interaction(e.to_string())
    }
}

/// Result of processing one dequeued item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action was performed.
    Done,
    /// Nothing to do for this item; not an error.
    Skipped,
    Abort(AbortReason),
}

impl From<Result<Outcome, BrowserError>> for Outcome {
    fn from(result: Result<Outcome, BrowserError>) -> Self {
        result.unwrap_or_else(|e| Outcome::Abort(e.into()))
    }
}

/// Counters of one batch invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub drawn: u32,
    pub dequeued: usize,
    pub done: usize,
    pub skipped: usize,
    pub aborted: Option<AbortReason>,
}

impl BatchReport {
    fn new(drawn: u32) -> Self {
        Self { drawn, ..Default::default() }
    }

    /// Tallies `outcome`. Returns false once the batch must stop.
    fn record(&mut self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Done => self.done += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Abort(reason) => {
                warn!("ACTION STOPPED : {}", reason);
                self.aborted = Some(reason);
                return false;
            }
        }
        true
    }
}

/// Follows contacts from the follow queue.
pub async fn do_contacts_follow<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> BatchReport {
    let mut todo = session.pacer.draw(session.config.batches.follow);
    let mut report = BatchReport::new(todo);

    while todo > 0 {
        let Some(uri) = state.contacts_to_follow.pop() else {
            break;
        };
        report.dequeued += 1;
        let outcome: Outcome = follow_contact(session, state, &uri).await.into();
        if !report.record(outcome) {
            break;
        }
        todo -= 1;
    }
    debug!("follow -{}", report.dequeued);
    report
}

async fn follow_contact<B: Browser + ?Sized>(
    session: &mut Session<'_, B>,
    state: &mut RunState,
    uri: &Identifier,
) -> Result<Outcome, BrowserError> {
    let config = session.config;
    let selectors = &config.selectors;
    if !session.visit(uri.as_str()).await? {
        return Ok(Outcome::Abort(AbortReason::UnreachablePage(uri.clone())));
    }
    state.in_tryout.insert(uri.clone());

    if !is_present(&mut *session.browser, &selectors.contact_follow).await? {
        debug!("Already following {}", uri);
        return Ok(Outcome::Skipped);
    }
    session.browser.click(&selectors.contact_follow).await?;
    state.known_contacts.insert(uri.clone());
    session.humanize().await;

    // New accounts are limited in how many contacts they may follow.
    if persists(&mut *session.browser, &mut *session.pacer, Condition::Present(&selectors.contact_follow)).await? {
        return Ok(Outcome::Abort(AbortReason::RateLimited(uri.clone())));
    }
    if persists(&mut *session.browser, &mut *session.pacer, Condition::Present(&selectors.loading_indicator)).await? {
        return Ok(Outcome::Abort(AbortReason::Hang(uri.clone())));
    }
    Ok(Outcome::Done)
}

/// Unfollows contacts from the unfollow queue. Banned contacts are never
/// proposed again.
pub async fn do_contacts_unfollow<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> BatchReport {
    let mut todo = session.pacer.draw(session.config.batches.unfollow);
    let mut report = BatchReport::new(todo);

    while todo > 0 {
        let Some(uri) = state.contacts_to_unfollow.pop() else {
            break;
        };
        report.dequeued += 1;
        let outcome: Outcome = unfollow_contact(session, state, &uri).await.into();
        let unfollowed = outcome == Outcome::Done;
        if !report.record(outcome) {
            break;
        }
        if unfollowed {
            todo -= 1;
        }
    }
    debug!("unfollow -{}", report.dequeued);
    report
}

async fn unfollow_contact<B: Browser + ?Sized>(
    session: &mut Session<'_, B>,
    state: &mut RunState,
    uri: &Identifier,
) -> Result<Outcome, BrowserError> {
    let config = session.config;
    let selector = &config.selectors.contact_followed;
    if !session.visit(uri.as_str()).await? {
        return Ok(Outcome::Abort(AbortReason::UnreachablePage(uri.clone())));
    }
    if session.browser.locate(selector, Locate::WAIT).await?.is_empty() {
        return Ok(Outcome::Skipped);
    }
    session.browser.click(selector).await?;
    session.humanize().await;

    state.known_contacts.remove(uri);
    state.in_tryout.remove(uri);
    state.banned_contacts.insert(uri.clone());
    Ok(Outcome::Done)
}

/// Favorites a few photos of each contact in the favorite-contacts queue.
pub async fn do_contacts_fav<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> BatchReport {
    let per_contact = session.config.batches.favorites_per_contact;
    if per_contact.min == 0 {
        debug!("Contact favorites disabled");
        return BatchReport::default();
    }
    let mut contacts_todo = session.pacer.draw(session.config.batches.contacts_favorite);
    let mut report = BatchReport::new(contacts_todo);

    while contacts_todo > 0 {
        let Some(uri) = state.contacts_to_favorite.pop() else {
            break;
        };
        report.dequeued += 1;
        let outcome: Outcome = favorite_contact(session, &uri).await.into();
        let attempted = outcome == Outcome::Done;
        if !report.record(outcome) {
            break;
        }
        if attempted {
            contacts_todo -= 1;
        }
    }
    debug!("favorite-contacts -{}", report.dequeued);
    report
}

/// `Done` when favorites were attempted on this contact, `Skipped` when
/// enough of its photos were already favorited.
async fn favorite_contact<B: Browser + ?Sized>(session: &mut Session<'_, B>, uri: &Identifier) -> Result<Outcome, BrowserError> {
    let config = session.config;
    let selectors = &config.selectors;
    if !session.visit(uri.as_str()).await? {
        return Ok(Outcome::Abort(AbortReason::UnreachablePage(uri.clone())));
    }
    // Only the first photos are rendered before scrolling.
    session.browser.scroll_to_bottom().await?;

    let target = session.pacer.draw(config.batches.favorites_per_contact) as usize;
    let already = session.browser.locate(&selectors.photos_favorited, Locate::ANY_NOW).await?.len();
    let mut favs_todo = target.saturating_sub(already);
    if favs_todo == 0 {
        debug!("{} already has {} favorites", uri, already);
        return Ok(Outcome::Skipped);
    }

    // Resolve the links now, each favorite navigates away.
    let photos = session.browser.read_attributes(&selectors.photo_links, "href", Locate::ANY).await?;
    for photo in photos {
        if favs_todo == 0 {
            break;
        }
        match favorite_photo(session, &photo).await {
            Outcome::Done => favs_todo -= 1,
            Outcome::Skipped => {}
            abort @ Outcome::Abort(_) => return Ok(abort),
        }
    }
    Ok(Outcome::Done)
}

/// Favorites photos from the photo queue.
pub async fn do_photos_fav<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> BatchReport {
    let mut todo = session.pacer.draw(session.config.batches.photos_favorite);
    let mut report = BatchReport::new(todo);

    while todo > 0 {
        let Some(uri) = state.photos_to_favorite.pop() else {
            break;
        };
        report.dequeued += 1;
        let outcome = favorite_photo(session, uri.as_str()).await;
        let favorited = outcome == Outcome::Done;
        if !report.record(outcome) {
            break;
        }
        if favorited {
            todo -= 1;
        }
    }
    info!("Favorited {} photos", report.done);
    debug!("favorite-photos -{}", report.dequeued);
    report
}
