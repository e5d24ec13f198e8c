use crate::browser::{click_if_present, Browser, BrowserError, Locate};
use crate::config::Config;
use crate::engine::checkpoint::CheckpointStore;
use crate::engine::collector;
use crate::engine::executor;
use crate::engine::identifier::Identifier;
use crate::engine::pacing::Pacer;
use crate::engine::prune;
use crate::engine::scheduler::{Scheduler, Task};
use crate::engine::session::Session;
use crate::engine::state::RunState;
use crate::error::BotError;
use chrono::Utc;
use log::{debug, info, warn};
use std::time::Duration;

/// Polls of the current URL while a login completes, one per second.
const LOGIN_WAIT_POLLS: u32 = 300;

/// Runs the configured task list against one browser session.
pub struct Bot<B: Browser> {
    config: Config,
    browser: B,
    pacer: Pacer,
    store: CheckpointStore,
    state: RunState,
}

impl<B: Browser> Bot<B> {
    pub fn new(config: Config, browser: B, seed: Option<u64>) -> Self {
        let pacer = Pacer::new(config.timing.step, seed);
        let store = CheckpointStore::from_config(&config);
        Self { config, browser, pacer, store, state: RunState::new() }
    }

    pub fn with_store(mut self, store: CheckpointStore) -> Self {
        self.store = store;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    fn split(&mut self) -> (Session<'_, B>, &mut RunState) {
        (Session::new(&mut self.browser, &mut self.pacer, &self.config), &mut self.state)
    }

    /// Loads the checkpoint, authenticates, then runs every task in order.
    pub async fn run(&mut self) -> Result<(), BotError> {
        let tasks = self.config.parsed_tasks()?;

        if let Some(state) = self.store.load(Utc::now())? {
            self.state = state;
        }
        self.authenticate().await?;
        self.post_auth_init().await;
        info!("Ready: {}", self.state.queue_summary());

        let mut scheduler = Scheduler::new(tasks, self.config.system.loop_task_limit);
        while let Some(task) = scheduler.next_task() {
            info!("Task {}", task);
            match task {
                Task::Save => self.save().await?,
                Task::Wait => self.pacer.wait_in(self.config.timing.wait_task).await,
                Task::Loop => {
                    if self.config.persistence.save_on_loop {
                        self.save().await?;
                    }
                    if scheduler.restarted() {
                        self.pacer.wait_in(self.config.timing.wait_task).await;
                    }
                }
                other => {
                    self.run_task(&other).await;
                    if self.config.persistence.save_after_each_action {
                        self.save().await?;
                    }
                }
            }
        }

        if self.config.persistence.save_on_end {
            self.save().await?;
        }
        info!("Done: {}", self.state.queue_summary());
        Ok(())
    }

    /// Runs one discovery or batch task. These never fail the run.
    pub async fn run_task(&mut self, task: &Task) {
        let (mut session, state) = self.split();
        match task {
            Task::DetectContactsFollowBack => {
                collector::detect_contacts_follow_back(&mut session, state).await;
            }
            Task::DetectContactsFromPhoto(url) => {
                collector::detect_contacts_from_photo(&mut session, state, url).await;
            }
            Task::DetectContactsUnfollowBack => {
                collector::detect_contacts_unfollow_back(&mut session, state).await;
            }
            Task::DetectRecentContactPhotos => {
                collector::detect_recent_contact_photos(&mut session, state).await;
            }
            Task::DetectExplored => {
                collector::detect_explored(&mut session, state).await;
            }
            Task::SearchKeywords => {
                collector::search_keywords(&mut session, state).await;
            }
            Task::DoContactsFollow => {
                let report = executor::do_contacts_follow(&mut session, state).await;
                info!("Followed {} of {} contacts", report.done, report.dequeued);
            }
            Task::DoContactsUnfollow => {
                let report = executor::do_contacts_unfollow(&mut session, state).await;
                info!("Unfollowed {} of {} contacts", report.done, report.dequeued);
            }
            Task::DoContactsInactiveUnfollow => {
                let report = prune::do_contacts_inactive_unfollow(&mut session, state).await;
                info!("Removed {} inactive contacts", report.removed.len());
            }
            Task::DoContactsFav => {
                let report = executor::do_contacts_fav(&mut session, state).await;
                info!("Favorited photos of {} contacts", report.done);
            }
            Task::DoPhotosFav => {
                executor::do_photos_fav(&mut session, state).await;
            }
            Task::Save | Task::Wait | Task::Loop => {}
        }
    }

    async fn authenticate(&mut self) -> Result<(), BotError> {
        if self.state.session.has_cookies() && self.state.owner.is_some() {
            if self.resume_session().await? {
                info!("Session resumed for {}", self.config.system.user_email);
                return Ok(());
            }
            warn!("Couldn't log user from cookie. Try normal auth");
        }
        self.login().await
    }

    async fn open_root(&mut self) -> Result<(), BotError> {
        let root = &self.config.urls.root;
        if !self.browser.navigate(root).await? {
            return Err(BotError::Authentication(format!("{} unreachable", root)));
        }
        Ok(())
    }

    async fn read_myself(&mut self) -> Result<Option<Identifier>, BrowserError> {
        let links = self
            .browser
            .read_attributes(&self.config.selectors.login_myself, "href", Locate::ANY)
            .await?;
        Ok(links
            .into_iter()
            .next()
            .map(|href| Identifier::new(href.trim_end_matches('/'))))
    }

    /// Injects the saved artifacts and checks the page shows the same user.
    async fn resume_session(&mut self) -> Result<bool, BotError> {
        self.open_root().await?;
        let session = &self.state.session;
        self.browser.set_cookies(&session.cookies).await?;
        self.browser.set_session_storage(&session.session_storage).await?;
        self.browser.set_local_storage(&session.local_storage).await?;
        self.open_root().await?;

        let current = self.read_myself().await?;
        Ok(current.is_some() && current == self.state.owner)
    }

    async fn login(&mut self) -> Result<(), BotError> {
        let email = self.config.system.user_email.clone();
        if email.is_empty() {
            return Err(BotError::Authentication("user email required".to_string()));
        }
        let selectors = self.config.selectors.clone();
        let login = &self.config.urls.login;
        if !self.browser.navigate(login).await? {
            return Err(BotError::Authentication(format!("{} unreachable", login)));
        }

        self.browser.type_text(&selectors.login_email, &email).await?;
        self.browser.press_enter(&selectors.login_email).await?;
        if self.config.system.user_password.is_empty() {
            warn!("Waiting user manual password validation...");
        } else {
            let password = self.config.system.user_password.clone();
            self.browser.type_text(&selectors.login_password, &password).await?;
            self.browser.press_enter(&selectors.login_password).await?;
        }

        self.wait_for_root().await?;
        self.pacer.humanize().await;

        let owner = self
            .read_myself()
            .await?
            .ok_or_else(|| BotError::Authentication("logged user not found on page".to_string()))?;
        info!("Logged in as {}", owner);
        self.state.owner = Some(owner);
        self.state.session.initialized_at = Some(Utc::now());
        Ok(())
    }

    async fn wait_for_root(&mut self) -> Result<(), BotError> {
        let root = self.config.urls.root.to_lowercase();
        for _ in 0..LOGIN_WAIT_POLLS {
            if self.browser.current_url().await?.to_lowercase().starts_with(&root) {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        Err(BotError::Authentication("login did not return to the site".to_string()))
    }

    /// Closes the notices shown after login, refreshes stale contact sets and
    /// queues the configured seeds.
    async fn post_auth_init(&mut self) {
        if let Err(e) = self.dismiss_notices().await {
            warn!("Could not dismiss notices: {}", e);
        }
        let (mut session, state) = self.split();
        if collector::sync_contacts(&mut session, state, Utc::now()).await {
            info!("Contacts synced: {}", state.queue_summary());
        }
        collector::add_seeds(state, &session.config.seeds, &session.config.urls.root);
    }

    async fn dismiss_notices(&mut self) -> Result<(), BrowserError> {
        let selectors = &self.config.selectors;
        if click_if_present(&mut self.browser, &selectors.login_warning).await? {
            self.pacer.humanize().await;
        }
        if self.browser.switch_to_frame(&selectors.cookies_iframe).await? {
            let clicked = click_if_present(&mut self.browser, &selectors.accept_cookies).await;
            self.browser.switch_to_parent().await?;
            if clicked? {
                debug!("Cookie consent accepted");
                self.pacer.humanize().await;
            }
        }
        Ok(())
    }

    /// Refreshes the session artifacts from the browser and writes the
    /// checkpoint.
    pub async fn save(&mut self) -> Result<(), BotError> {
        if !self.store.is_enabled() {
            return Ok(());
        }
        if let Err(e) = self.read_artifacts().await {
            warn!("Session artifacts not refreshed: {}", e);
        }
        self.store.save(&self.state)?;
        Ok(())
    }

    async fn read_artifacts(&mut self) -> Result<(), BrowserError> {
        self.state.session.cookies = self.browser.cookies().await?;
        self.state.session.session_storage = self.browser.session_storage().await?;
        self.state.session.local_storage = self.browser.local_storage().await?;
        Ok(())
    }

    pub async fn quit(&mut self) {
        if let Err(e) = self.browser.quit().await {
            warn!("Browser did not quit cleanly: {}", e);
        }
    }
}
