mod common;

use common::*;
use followerbot_rs::engine::executor::{
    do_contacts_fav, do_contacts_follow, do_contacts_unfollow, do_photos_fav, AbortReason, Outcome,
};
use followerbot_rs::engine::favorite::favorite_photo;
use followerbot_rs::engine::session::Session;
use followerbot_rs::engine::state::RunState;
use pretty_assertions::assert_eq;

const A: &str = "https://www.flickr.com/photos/alice/";
const B: &str = "https://www.flickr.com/photos/bob/";
const C: &str = "https://www.flickr.com/photos/carol/";

#[tokio::test]
async fn follow_batch_aborts_when_follow_control_persists() {
    init_logging();
    let mut config = test_config();
    config.batches.follow = fixed(1);
    let sel = config.selectors.clone();

    let mut browser = FakeBrowser::new();
    // The click does nothing: the account can't follow anymore.
    browser.page(A).shows(&sel.contact_follow);

    let mut state = RunState::new();
    state.contacts_to_follow = queue(&[A, B]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_follow(&mut session, &mut state).await;

    assert_eq!(report.aborted, Some(AbortReason::RateLimited(id(A))));
    assert_eq!(contents(&state.contacts_to_follow), vec![B.to_string()]);
    assert!(state.in_tryout.contains(&id(A)));
    assert!(state.known_contacts.contains(&id(A)));
    assert_eq!(browser.visits_of(B), 0);
}

#[tokio::test]
async fn follow_batch_stops_at_drawn_size() {
    init_logging();
    let mut config = test_config();
    config.batches.follow = fixed(2);
    let sel = config.selectors.clone();

    let mut browser = FakeBrowser::new();
    browser
        .page(A)
        .shows(&sel.contact_follow)
        .on_click(&sel.contact_follow, Effect::Remove(sel.contact_follow.clone()));
    // Already followed: no follow control.
    browser.page(B).shows(&sel.contact_followed);

    let mut state = RunState::new();
    state.contacts_to_follow = queue(&[A, B, C]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_follow(&mut session, &mut state).await;

    assert_eq!(report.aborted, None);
    assert_eq!((report.dequeued, report.done, report.skipped), (2, 1, 1));
    assert_eq!(contents(&state.contacts_to_follow), vec![C.to_string()]);
    assert!(state.known_contacts.contains(&id(A)));
    assert!(!state.known_contacts.contains(&id(B)));
    assert!(browser.clicked(A, &sel.contact_follow));
}

#[tokio::test]
async fn follow_batch_aborts_on_unreachable_contact() {
    init_logging();
    let mut config = test_config();
    config.batches.follow = fixed(3);

    let mut browser = FakeBrowser::new();
    browser.unreachable(A);

    let mut state = RunState::new();
    state.contacts_to_follow = queue(&[A, B]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_follow(&mut session, &mut state).await;

    assert_eq!(report.aborted, Some(AbortReason::UnreachablePage(id(A))));
    assert_eq!(contents(&state.contacts_to_follow), vec![B.to_string()]);
    assert!(!state.in_tryout.contains(&id(A)));
}

#[tokio::test]
async fn follow_batch_aborts_on_error_page() {
    init_logging();
    let mut config = test_config();
    config.batches.follow = fixed(1);
    let sel = config.selectors.clone();

    let mut browser = FakeBrowser::new();
    browser.page(A).shows(&sel.error_page);

    let mut state = RunState::new();
    state.contacts_to_follow = queue(&[A]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_follow(&mut session, &mut state).await;

    assert_eq!(report.aborted, Some(AbortReason::UnreachablePage(id(A))));
    assert!(state.contacts_to_follow.is_empty());
}

#[tokio::test]
async fn follow_batch_detects_hang() {
    init_logging();
    let mut config = test_config();
    config.batches.follow = fixed(2);
    let sel = config.selectors.clone();

    let mut browser = FakeBrowser::new();
    browser
        .page(A)
        .shows(&sel.contact_follow)
        .on_click(&sel.contact_follow, Effect::Remove(sel.contact_follow.clone()))
        .on_click(&sel.contact_follow, Effect::Add(sel.loading_indicator.clone(), vec![FakeElement::default()]));

    let mut state = RunState::new();
    state.contacts_to_follow = queue(&[A, B]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_follow(&mut session, &mut state).await;

    assert_eq!(report.aborted, Some(AbortReason::Hang(id(A))));
    assert_eq!(contents(&state.contacts_to_follow), vec![B.to_string()]);
}

#[tokio::test]
async fn unfollow_moves_contact_to_banned() {
    init_logging();
    let mut config = test_config();
    config.batches.unfollow = fixed(1);
    let sel = config.selectors.clone();

    let mut browser = FakeBrowser::new();
    // A was already unfollowed elsewhere, B still followed.
    browser
        .page(B)
        .shows(&sel.contact_followed)
        .on_click(&sel.contact_followed, Effect::Remove(sel.contact_followed.clone()));

    let mut state = RunState::new();
    state.known_contacts.insert(id(B));
    state.in_tryout.insert(id(B));
    state.contacts_to_unfollow = queue(&[A, B, C]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_unfollow(&mut session, &mut state).await;

    // Only actual unfollows consume the batch budget.
    assert_eq!((report.dequeued, report.done, report.skipped), (2, 1, 1));
    assert_eq!(contents(&state.contacts_to_unfollow), vec![C.to_string()]);
    assert!(state.banned_contacts.contains(&id(B)));
    assert!(!state.known_contacts.contains(&id(B)));
    assert!(!state.in_tryout.contains(&id(B)));
}

#[tokio::test]
async fn missing_photo_is_consumed_without_counting() {
    init_logging();
    let mut config = test_config();
    config.batches.photos_favorite = fixed(1);
    let sel = config.selectors.clone();
    let p1 = "https://www.flickr.com/photos/alice/1/";

    let mut browser = FakeBrowser::new();
    browser.page(p1).shows(&sel.photo_not_found);

    let mut state = RunState::new();
    state.photos_to_favorite = queue(&[p1]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_photos_fav(&mut session, &mut state).await;

    assert_eq!(report.aborted, None);
    assert_eq!((report.done, report.skipped), (0, 1));
    assert!(state.photos_to_favorite.is_empty());
    assert!(browser.clicks.is_empty());
}

#[tokio::test]
async fn photo_batch_counts_only_favorited() {
    init_logging();
    let mut config = test_config();
    config.batches.photos_favorite = fixed(1);
    let sel = config.selectors.clone();
    let (p1, p2, p3) = (
        "https://www.flickr.com/photos/alice/1/",
        "https://www.flickr.com/photos/alice/2/",
        "https://www.flickr.com/photos/alice/3/",
    );

    let mut browser = FakeBrowser::new();
    browser.page(p1).shows(&sel.photo_favorited);
    browser
        .page(p2)
        .shows(&sel.photo_favorite)
        .on_click(&sel.photo_favorite, Effect::Add(sel.photo_favorited.clone(), vec![FakeElement::default()]));

    let mut state = RunState::new();
    state.photos_to_favorite = queue(&[p1, p2, p3]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_photos_fav(&mut session, &mut state).await;

    assert_eq!((report.dequeued, report.done, report.skipped), (2, 1, 1));
    assert_eq!(contents(&state.photos_to_favorite), vec![p3.to_string()]);
    assert!(browser.clicked(p2, &sel.photo_favorite));
}

#[tokio::test]
async fn intercepted_click_stops_photo_batch() {
    init_logging();
    let mut config = test_config();
    config.batches.photos_favorite = fixed(3);
    let sel = config.selectors.clone();
    let (p1, p2) = ("https://www.flickr.com/photos/alice/1/", "https://www.flickr.com/photos/alice/2/");

    let mut browser = FakeBrowser::new();
    browser.page(p1).shows(&sel.photo_favorite).intercept(&sel.photo_favorite);

    let mut state = RunState::new();
    state.photos_to_favorite = queue(&[p1, p2]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_photos_fav(&mut session, &mut state).await;

    assert!(matches!(report.aborted, Some(AbortReason::Interaction(_))));
    assert_eq!(contents(&state.photos_to_favorite), vec![p2.to_string()]);
}

#[tokio::test]
async fn unconfirmed_favorite_is_rate_limited() {
    init_logging();
    let config = test_config();
    let sel = config.selectors.clone();
    let p1 = "https://www.flickr.com/photos/alice/1/";

    let mut browser = FakeBrowser::new();
    browser.page(p1).shows(&sel.photo_favorite);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let outcome = favorite_photo(&mut session, p1).await;

    assert_eq!(outcome, Outcome::Abort(AbortReason::RateLimited(id(p1))));
}

#[tokio::test]
async fn photo_navigation_is_retried_once() {
    init_logging();
    let config = test_config();
    let p1 = "https://www.flickr.com/photos/alice/1/";

    let mut browser = FakeBrowser::new();
    browser.unreachable(p1);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let outcome = favorite_photo(&mut session, p1).await;

    assert_eq!(outcome, Outcome::Abort(AbortReason::UnreachablePage(id(p1))));
    assert_eq!(browser.visits_of(p1), 2);
}

#[tokio::test]
async fn contact_favorites_stop_at_per_contact_target() {
    init_logging();
    let mut config = test_config();
    config.batches.contacts_favorite = fixed(1);
    config.batches.favorites_per_contact = fixed(2);
    let sel = config.selectors.clone();
    let photos = [
        "https://www.flickr.com/photos/alice/1/",
        "https://www.flickr.com/photos/alice/2/",
        "https://www.flickr.com/photos/alice/3/",
    ];

    let mut browser = FakeBrowser::new();
    browser.page(A).links(&sel.photo_links, &photos);
    for photo in photos {
        browser
            .page(photo)
            .shows(&sel.photo_favorite)
            .on_click(&sel.photo_favorite, Effect::Add(sel.photo_favorited.clone(), vec![FakeElement::default()]));
    }

    let mut state = RunState::new();
    state.contacts_to_favorite = queue(&[A, B]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_fav(&mut session, &mut state).await;

    assert_eq!((report.dequeued, report.done), (1, 1));
    assert_eq!(contents(&state.contacts_to_favorite), vec![B.to_string()]);
    assert!(browser.clicked(photos[0], &sel.photo_favorite));
    assert!(browser.clicked(photos[1], &sel.photo_favorite));
    assert_eq!(browser.visits_of(photos[2]), 0);
    assert_eq!(browser.scrolls, 1);
}

#[tokio::test]
async fn contact_already_favorited_is_skipped() {
    init_logging();
    let mut config = test_config();
    config.batches.contacts_favorite = fixed(1);
    config.batches.favorites_per_contact = fixed(2);
    let sel = config.selectors.clone();

    let mut browser = FakeBrowser::new();
    browser
        .page(A)
        .shows(&sel.photos_favorited)
        .shows(&sel.photos_favorited)
        .links(&sel.photo_links, &["https://www.flickr.com/photos/alice/1/"]);

    let mut state = RunState::new();
    state.contacts_to_favorite = queue(&[A, B]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_fav(&mut session, &mut state).await;

    // A costs nothing, so B is processed too.
    assert_eq!((report.dequeued, report.skipped), (2, 1));
    assert!(state.contacts_to_favorite.is_empty());
}

#[tokio::test]
async fn photo_error_aborts_whole_contact_batch() {
    init_logging();
    let mut config = test_config();
    config.batches.contacts_favorite = fixed(2);
    config.batches.favorites_per_contact = fixed(1);
    let sel = config.selectors.clone();
    let photo = "https://www.flickr.com/photos/alice/1/";

    let mut browser = FakeBrowser::new();
    browser.page(A).links(&sel.photo_links, &[photo]);
    browser.page(photo).shows(&sel.photo_favorite).intercept(&sel.photo_favorite);

    let mut state = RunState::new();
    state.contacts_to_favorite = queue(&[A, B]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_fav(&mut session, &mut state).await;

    assert!(matches!(report.aborted, Some(AbortReason::Interaction(_))));
    assert_eq!(contents(&state.contacts_to_favorite), vec![B.to_string()]);
}

#[tokio::test]
async fn contact_favorites_disabled_when_per_contact_min_is_zero() {
    init_logging();
    let mut config = test_config();
    config.batches.favorites_per_contact = fixed(0);

    let mut browser = FakeBrowser::new();
    let mut state = RunState::new();
    state.contacts_to_favorite = queue(&[A]);

    let mut pacer = pacer();
    let mut session = Session::new(&mut browser, &mut pacer, &config);
    let report = do_contacts_fav(&mut session, &mut state).await;

    assert_eq!(report.dequeued, 0);
    assert_eq!(state.contacts_to_favorite.len(), 1);
    assert!(browser.visits.is_empty());
}
