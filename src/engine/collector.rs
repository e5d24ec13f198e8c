//! Discovery: reads listings and pages and feeds the work queues.

use crate::browser::{Browser, BrowserError, Locate};
use crate::engine::identifier::Identifier;
use crate::engine::parser::{favorites_url, myself_from_owner, normalize_photo_url};
use crate::engine::queue::{enqueue_new, IdentifierSet};
use crate::engine::session::Session;
use crate::engine::state::RunState;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;

/// How a listing exposes its further pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `<base>/?page=N`
    Query,
    /// `<base>/pageN/`
    Path,
}

impl Pagination {
    pub fn page_url(&self, base: &str, page: u32) -> String {
        let base = base.trim_end_matches('/');
        match self {
            Pagination::Query => format!("{}/?page={}", base, page),
            Pagination::Path => format!("{}/page{}/", base, page),
        }
    }

    /// Selector of the link to `page`, present only when that page exists.
    pub fn next_control(&self, page: u32) -> String {
        match self {
            Pagination::Query => format!("a[href*=\"/?page={}\"]", page),
            Pagination::Path => format!("a[href*=\"/page{}/\"]", page),
        }
    }
}

/// A paginated listing of identifiers.
#[derive(Debug, Clone)]
pub struct Listing<'a> {
    pub url: String,
    pub selector: &'a str,
    pub pagination: Pagination,
}

/// Counts of identifiers added per queue by one discovery step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discovered {
    pub follow: usize,
    pub favorite_contacts: usize,
    pub favorite_photos: usize,
    pub unfollow: usize,
}

fn dedup(values: Vec<String>) -> Vec<Identifier> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(Identifier::new)
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Every identifier matched by `listing.selector` across all of its pages,
/// deduplicated, in page order.
///
/// A page that fails to load ends the walk early; the caller gets what was
/// read so far.
pub async fn collect_listing<B: Browser + ?Sized>(session: &mut Session<'_, B>, listing: &Listing<'_>) -> Vec<Identifier> {
    let mut values = Vec::new();
    if let Err(e) = walk_listing(session, listing, &mut values).await {
        warn!("Listing {} read partially: {}", listing.url, e);
    }
    dedup(values)
}

async fn walk_listing<B: Browser + ?Sized>(
    session: &mut Session<'_, B>,
    listing: &Listing<'_>,
    values: &mut Vec<String>,
) -> Result<(), BrowserError> {
    if !session.visit(&listing.url).await? {
        warn!("Listing {} unreachable", listing.url);
        return Ok(());
    }
    values.extend(session.browser.read_attributes(listing.selector, "href", Locate::WAIT).await?);

    let mut page = 2;
    loop {
        let control = listing.pagination.next_control(page);
        if session.browser.locate(&control, Locate::NOW).await?.is_empty() {
            break;
        }
        let url = listing.pagination.page_url(&listing.url, page);
        if !session.visit(&url).await? {
            warn!("Listing page {} unreachable", url);
            break;
        }
        values.extend(session.browser.read_attributes(listing.selector, "href", Locate::WAIT).await?);
        page += 1;
    }
    Ok(())
}

fn contacts_listing<'a, B: Browser + ?Sized>(
    session: &Session<'a, B>,
    state: &RunState,
    suffix: &str,
    selector: &'a str,
) -> Option<Listing<'a>> {
    let url = session.owner_url(state.owner.as_ref(), suffix);
    if url.is_none() {
        warn!("No owner contact URL yet, cannot read {}", suffix);
    }
    url.map(|url| Listing { url, selector, pagination: Pagination::Query })
}

/// One of the owner's contact listings (all, one-way, mutual, ...).
pub async fn collect_contacts<B: Browser + ?Sized>(
    session: &mut Session<'_, B>,
    state: &RunState,
    suffix: &str,
) -> Vec<Identifier> {
    let config = session.config;
    match contacts_listing(session, state, suffix, &config.selectors.contact_links) {
        Some(listing) => collect_listing(session, &listing).await,
        None => Vec::new(),
    }
}

pub async fn collect_blocked<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &RunState) -> Vec<Identifier> {
    let config = session.config;
    match contacts_listing(session, state, &config.urls.contacts_blocked, &config.selectors.blocked_contact_links) {
        Some(listing) => collect_listing(session, &listing).await,
        None => Vec::new(),
    }
}

/// Contacts who favorited the photo behind `favorites_url`.
pub async fn collect_favoriters<B: Browser + ?Sized>(session: &mut Session<'_, B>, favorites_url: &str) -> Vec<Identifier> {
    let config = session.config;
    let listing = Listing {
        url: favorites_url.to_string(),
        selector: &config.selectors.favorite_contact_links,
        pagination: Pagination::Path,
    };
    collect_listing(session, &listing).await
}

/// Whether the cached contact sets are missing or older than the cache limit.
pub fn contacts_need_sync(state: &RunState, cache_hours: i64, now: DateTime<Utc>) -> bool {
    match state.contacts_synced_at {
        None => true,
        Some(_) if cache_hours <= 0 => true,
        Some(at) => now > at + Duration::hours(cache_hours),
    }
}

/// Reloads `known-contacts`, `banned-contacts` and `self` from the site when
/// the cache is stale.
pub async fn sync_contacts<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState, now: DateTime<Utc>) -> bool {
    if !contacts_need_sync(state, session.config.persistence.cache_time_limit_hours, now) {
        debug!("Contact cache still fresh");
        return false;
    }
    let contacts_suffix = session.config.urls.contacts.clone();
    state.known_contacts = collect_contacts(session, state, &contacts_suffix).await.into_iter().collect();
    debug!("known ={}", state.known_contacts.len());

    state.banned_contacts = collect_blocked(session, state).await.into_iter().collect();
    debug!("banned ={}", state.banned_contacts.len());

    state.contacts_synced_at = Some(now);
    state.myself = state.owner.as_ref().and_then(myself_from_owner).into_iter().collect();
    true
}

/// Injects configured identifiers into each queue. Entries outside the site
/// root are rejected with a warning.
pub fn add_seeds(state: &mut RunState, seeds: &crate::config::SeedConfig, root: &str) {
    let plan = [
        ("contacts_to_favorite", &seeds.contacts_to_favorite, &mut state.contacts_to_favorite),
        ("contacts_to_follow", &seeds.contacts_to_follow, &mut state.contacts_to_follow),
        ("contacts_to_unfollow", &seeds.contacts_to_unfollow, &mut state.contacts_to_unfollow),
        ("photos_to_favorite", &seeds.photos_to_favorite, &mut state.photos_to_favorite),
    ];
    for (name, values, queue) in plan {
        let mut added = 0;
        for raw in values.iter().filter(|v| !v.trim().is_empty()) {
            let id = Identifier::new(raw.as_str());
            if !id.starts_with_root(root) {
                warn!("Check {} URL format for {}", name, raw);
                continue;
            }
            if queue.push(id) {
                added += 1;
            } else {
                debug!("{} already in {}", raw, name);
            }
        }
        if added > 0 {
            debug!("{} +{} seeded", name, added);
        }
    }
}

fn enqueue_contacts(state: &mut RunState, list: &[Identifier], extra: Option<&IdentifierSet>) -> Discovered {
    let mut filters = vec![&state.known_contacts, &state.banned_contacts];
    if let Some(extra) = extra {
        filters.push(extra);
    }
    let follow = enqueue_new(&mut state.contacts_to_follow, list.iter().cloned(), &filters);
    let favorite_contacts = enqueue_new(&mut state.contacts_to_favorite, list.iter().cloned(), &filters);
    debug!("follow +{} favorite-contacts +{}", follow, favorite_contacts);
    Discovered { follow, favorite_contacts, ..Default::default() }
}

/// People following the owner one-way become follow and favorite candidates.
pub async fn detect_contacts_follow_back<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> Discovered {
    let suffix = session.config.urls.contacts_one_way.clone();
    let list = collect_contacts(session, state, &suffix).await;
    enqueue_contacts(state, &list, None)
}

/// People who favorited `photo_url` become follow and favorite candidates.
pub async fn detect_contacts_from_photo<B: Browser + ?Sized>(
    session: &mut Session<'_, B>,
    state: &mut RunState,
    photo_url: &str,
) -> Discovered {
    let Some(photo) = normalize_photo_url(photo_url) else {
        warn!("ACTION STOPPED : {} IS NOT A PHOTO URL", photo_url);
        return Discovered::default();
    };
    let url = favorites_url(&photo, &session.config.urls.favorites);
    let list = collect_favoriters(session, &url).await;
    let myself = state.myself.clone();
    enqueue_contacts(state, &list, Some(&myself))
}

/// Rebuilds the unfollow queue from one-way contacts.
///
/// Candidates are the not-close contacts that are neither mutual nor attempted
/// this run. The `keep` most recently listed candidates are left alone.
pub async fn detect_contacts_unfollow_back<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> Discovered {
    let urls = session.config.urls.clone();
    let mutual: IdentifierSet = collect_contacts(session, state, &urls.contacts_mutual).await.into_iter().collect();
    // Listing order is oldest first.
    let not_close = collect_contacts(session, state, &urls.contacts_not_close).await;

    let keep = session.config.pruning.keep_unfollowers as usize;
    let unfollow = plan_unfollow_back(state, not_close, &mutual, keep);
    debug!("unfollow ={}", state.contacts_to_unfollow.len());
    Discovered { unfollow, ..Default::default() }
}

/// Queue-side half of unfollow-back detection.
pub fn plan_unfollow_back(state: &mut RunState, not_close: Vec<Identifier>, mutual: &IdentifierSet, keep: usize) -> usize {
    state.contacts_to_unfollow.clear();

    let candidates: Vec<Identifier> = not_close
        .into_iter()
        .filter(|id| !mutual.contains(id) && !state.in_tryout.contains(id))
        .collect();
    // Retention applies only when there are more candidates than kept contacts.
    let take = if keep > 0 && candidates.len() > keep {
        candidates.len() - keep
    } else {
        candidates.len()
    };
    enqueue_new(&mut state.contacts_to_unfollow, candidates.into_iter().take(take), &[])
}

/// Recent uploads of followed contacts become photo candidates.
pub async fn detect_recent_contact_photos<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> Discovered {
    let config = session.config;
    let result = async {
        if !session.visit(&config.urls.recent_contact_posts).await? {
            warn!("ACTION STOPPED : {} UNREACHABLE", config.urls.recent_contact_posts);
            return Ok(Vec::new());
        }
        session.scroll_passes(config.scrolls.recent_contact_posts).await?;
        session
            .browser
            .read_attributes(&config.selectors.recent_contact_posts, "href", Locate::WAIT)
            .await
    }
    .await;

    let list = match result {
        Ok(list) => dedup(list),
        Err(e) => {
            warn!("ACTION STOPPED : {}", e);
            return Discovered::default();
        }
    };
    let favorite_photos = enqueue_new(&mut state.photos_to_favorite, list, &[]);
    debug!("favorite-photos +{}", favorite_photos);
    Discovered { favorite_photos, ..Default::default() }
}

/// Reads contact and photo links off the current page after `scrolls` passes.
async fn harvest_page<B: Browser + ?Sized>(
    session: &mut Session<'_, B>,
    state: &mut RunState,
    scrolls: u32,
) -> Result<Discovered, BrowserError> {
    let selectors = &session.config.selectors;
    let (contact_sel, photo_sel) = (selectors.explore_contact_links.clone(), selectors.photo_links.clone());

    session.scroll_passes(scrolls).await?;

    let contacts = dedup(session.browser.read_attributes(&contact_sel, "href", Locate::ANY).await?);
    let mut found = enqueue_contacts(state, &contacts, None);

    let photos = dedup(session.browser.read_attributes(&photo_sel, "href", Locate::ANY).await?);
    found.favorite_photos = enqueue_new(&mut state.photos_to_favorite, photos, &[]);
    debug!("favorite-photos +{}", found.favorite_photos);
    Ok(found)
}

fn merge(total: &mut Discovered, part: Discovered) {
    total.follow += part.follow;
    total.favorite_contacts += part.favorite_contacts;
    total.favorite_photos += part.favorite_photos;
    total.unfollow += part.unfollow;
}

/// Harvests the explore page.
pub async fn detect_explored<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> Discovered {
    let config = session.config;
    let result = async {
        if !session.visit(&config.urls.explore).await? {
            warn!("ACTION STOPPED : {} UNREACHABLE", config.urls.explore);
            return Ok(Discovered::default());
        }
        harvest_page(session, state, config.scrolls.explore).await
    }
    .await;
    result.unwrap_or_else(|e: BrowserError| {
        warn!("ACTION STOPPED : {}", e);
        Discovered::default()
    })
}

pub fn search_url(base: &str, keyword: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(keyword.trim().as_bytes()).collect();
    format!("{}{}", base, encoded)
}

/// Harvests the search results of every configured keyword.
pub async fn search_keywords<B: Browser + ?Sized>(session: &mut Session<'_, B>, state: &mut RunState) -> Discovered {
    let config = session.config;
    let mut total = Discovered::default();
    for keyword in config.system.search_keywords.iter().filter(|k| !k.trim().is_empty()) {
        info!("Searching {}", keyword);
        let url = search_url(&config.urls.search, keyword);
        let result = async {
            if !session.visit(&url).await? {
                warn!("Search page {} unreachable", url);
                return Ok(Discovered::default());
            }
            session.humanize().await;
            harvest_page(session, state, config.scrolls.search).await
        }
        .await;
        match result {
            Ok(found) => merge(&mut total, found),
            Err(e) => {
                warn!("ACTION STOPPED : {}", e);
                break;
            }
        }
    }
    total
}
