use crate::engine::scheduler::Task;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub system: SystemConfig,
    pub browser: BrowserConfig,
    pub persistence: PersistenceConfig,
    pub timing: TimingConfig,
    pub batches: BatchConfig,
    pub scrolls: ScrollConfig,
    pub pruning: PruningConfig,
    pub locale: LocaleConfig,
    pub urls: UrlConfig,
    pub selectors: SelectorConfig,
    pub seeds: SeedConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    pub user_email: String,
    pub user_password: String,
    pub tasks: Vec<String>,
    pub search_keywords: Vec<String>,
    /// Maximum number of `Loop` restarts, 0 for unbounded.
    pub loop_task_limit: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub timeout_secs: f64,
    pub window_width: u32,
    pub window_height: u32,
    pub arguments: Vec<String>,
    pub chrome_binary: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub save_folder: PathBuf,
    /// Checkpoints older than this are discarded on load. 0 disables resuming.
    pub limit_hours: i64,
    pub cache_contacts: bool,
    /// Contact lists are resynced once older than this. 0 resyncs every run.
    pub cache_time_limit_hours: i64,
    pub save_after_each_action: bool,
    pub save_on_loop: bool,
    pub save_on_end: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TimingConfig {
    pub step: DelayRange,
    pub wait_task: DelayRange,
}

/// Inclusive bounds for a randomly drawn batch size.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct BatchLimit {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BatchConfig {
    pub follow: BatchLimit,
    pub unfollow: BatchLimit,
    pub contacts_favorite: BatchLimit,
    pub photos_favorite: BatchLimit,
    pub inactive_unfollow: BatchLimit,
    pub favorites_per_contact: BatchLimit,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScrollConfig {
    pub explore: u32,
    pub search: u32,
    pub recent_contact_posts: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PruningConfig {
    /// Elapsed months/years above which a contact counts as inactive.
    pub inactivity_threshold: u32,
    /// Most recent one-way contacts left alone by unfollow-back detection.
    pub keep_unfollowers: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LocaleConfig {
    pub month_tokens: Vec<String>,
    pub year_tokens: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UrlConfig {
    pub root: String,
    pub login: String,
    pub explore: String,
    pub search: String,
    pub recent_contact_posts: String,
    /// The following are suffixes appended to the owner's contact URL.
    pub contacts: String,
    pub contacts_one_way: String,
    pub contacts_mutual: String,
    pub contacts_not_close: String,
    pub contacts_blocked: String,
    pub contacts_inactive: String,
    /// Suffix appended to a photo URL to reach its "favorited by" listing.
    pub favorites: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SelectorConfig {
    pub error_page: String,
    pub photo_not_found: String,
    pub login_email: String,
    pub login_password: String,
    pub login_myself: String,
    pub login_warning: String,
    pub cookies_iframe: String,
    pub accept_cookies: String,
    pub contact_links: String,
    pub blocked_contact_links: String,
    pub favorite_contact_links: String,
    pub explore_contact_links: String,
    pub photo_links: String,
    pub recent_contact_posts: String,
    pub contact_follow: String,
    pub contact_followed: String,
    pub photos_favorited: String,
    pub photo_favorite: String,
    pub photo_favorited: String,
    pub loading_indicator: String,
    pub contact_table_rows: String,
    pub contact_last_upload: String,
    pub contact_url: String,
    pub contact_edit: String,
    pub contact_check: String,
    pub contact_remove: String,
}

/// Identifiers injected into the queues before any discovery runs.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SeedConfig {
    pub contacts_to_follow: Vec<String>,
    pub contacts_to_favorite: Vec<String>,
    pub contacts_to_unfollow: Vec<String>,
    pub photos_to_favorite: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system: SystemConfig {
                user_email: "".to_string(),
                user_password: "".to_string(),
                tasks: strings(&[
                    "DetectContactsFollowBack",
                    "DoContactsFollow",
                    "DetectContactsUnfollowBack",
                    "DoContactsUnfollow",
                    "DetectRecentContactPhotos",
                    "DoPhotosFav",
                    "Save",
                    "Wait",
                    "Loop",
                ]),
                search_keywords: Vec::new(),
                loop_task_limit: 3,
            },
            browser: BrowserConfig {
                webdriver_url: "http://localhost:9515".to_string(),
                timeout_secs: 6.0,
                window_width: 1280,
                window_height: 900,
                arguments: Vec::new(),
                chrome_binary: None,
            },
            persistence: PersistenceConfig {
                enabled: true,
                save_folder: PathBuf::from("."),
                limit_hours: 720,
                cache_contacts: true,
                cache_time_limit_hours: 24,
                save_after_each_action: true,
                save_on_loop: true,
                save_on_end: true,
            },
            timing: TimingConfig {
                step: DelayRange { min_ms: 2_000, max_ms: 5_000 },
                wait_task: DelayRange { min_ms: 300_000, max_ms: 600_000 },
            },
            batches: BatchConfig {
                follow: BatchLimit { min: 5, max: 15 },
                unfollow: BatchLimit { min: 5, max: 15 },
                contacts_favorite: BatchLimit { min: 2, max: 5 },
                photos_favorite: BatchLimit { min: 10, max: 25 },
                inactive_unfollow: BatchLimit { min: 1, max: 2 },
                favorites_per_contact: BatchLimit { min: 1, max: 3 },
            },
            scrolls: ScrollConfig {
                explore: 10,
                search: 5,
                recent_contact_posts: 5,
            },
            pruning: PruningConfig {
                inactivity_threshold: 6,
                keep_unfollowers: 20,
            },
            locale: LocaleConfig {
                month_tokens: strings(&["months", "meses"]),
                year_tokens: strings(&["years", "anos"]),
            },
            urls: UrlConfig {
                root: "https://www.flickr.com/".to_string(),
                login: "https://identity.flickr.com/login".to_string(),
                explore: "https://www.flickr.com/explore".to_string(),
                search: "https://www.flickr.com/search/?text=".to_string(),
                recent_contact_posts: "https://www.flickr.com/photos/friends/".to_string(),
                contacts: "/contacts".to_string(),
                contacts_one_way: "/contacts/rev/?filter=oneway".to_string(),
                contacts_mutual: "/contacts/?filter=mutual".to_string(),
                contacts_not_close: "/contacts/?filter=notfriendsandfamily".to_string(),
                contacts_blocked: "/contacts/blocked".to_string(),
                contacts_inactive: "/contacts/?filter=&sort=upload&order=asc".to_string(),
                favorites: "/favorites".to_string(),
            },
            selectors: SelectorConfig {
                error_page: "div.error-500, div.page-not-found".to_string(),
                photo_not_found: "div.photo-not-found, div.error-404".to_string(),
                login_email: "input#login-email".to_string(),
                login_password: "input#login-password".to_string(),
                login_myself: "a.gn-title.you".to_string(),
                login_warning: "button.notification-close".to_string(),
                cookies_iframe: "[title='TrustArc Cookie Consent Manager']".to_string(),
                accept_cookies: "a.call".to_string(),
                contact_links: "td.contact-list-name a[href*='/photos/']".to_string(),
                blocked_contact_links: "td.contact-list-name a[href*='/photos/']".to_string(),
                favorite_contact_links: "div.fave-person a.person-link".to_string(),
                explore_contact_links: "a.attribution".to_string(),
                photo_links: "a.overlay[href*='/photos/']".to_string(),
                recent_contact_posts: "a.photo-link[href*='/photos/']".to_string(),
                contact_follow: "button.follow:not(.followed)".to_string(),
                contact_followed: "button.follow.followed".to_string(),
                photos_favorited: "a.fave-star.fave".to_string(),
                photo_favorite: "div.fave-star:not(.fave)".to_string(),
                photo_favorited: "div.fave-star.fave".to_string(),
                loading_indicator: "div.balls, div.fluid-modal-overlay".to_string(),
                contact_table_rows: "table.contact-list-table tr.contact-list-row".to_string(),
                contact_last_upload: "td.contact-list-last".to_string(),
                contact_url: "td.contact-list-name a".to_string(),
                contact_edit: "td.contact-list-edit a".to_string(),
                contact_check: "input#contact-remove-check".to_string(),
                contact_remove: "input.contact-remove-submit".to_string(),
            },
            seeds: SeedConfig::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            msg: e.to_string(),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Trim credentials
        config.system.user_email = config.system.user_email.trim().to_string();
        config.system.user_password = config.system.user_password.trim().to_string();

        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            msg: e.to_string(),
        })
    }

    /// Credentials from the environment take priority over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(email) = std::env::var("FOLLOWERBOT_EMAIL") {
            self.system.user_email = email.trim().to_string();
        }
        if let Ok(password) = std::env::var("FOLLOWERBOT_PASSWORD") {
            self.system.user_password = password.trim().to_string();
        }
    }

    /// Replaces the task list with a comma-separated one.
    pub fn override_tasks(&mut self, list: &str) {
        self.system.tasks = list
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.urls.root.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "urls.root".to_string() });
        }
        if url::Url::parse(&self.urls.root).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "urls.root".to_string(),
                reason: format!("'{}' is not an absolute URL", self.urls.root),
            });
        }

        let limits = [
            ("batches.follow", self.batches.follow),
            ("batches.unfollow", self.batches.unfollow),
            ("batches.contacts_favorite", self.batches.contacts_favorite),
            ("batches.photos_favorite", self.batches.photos_favorite),
            ("batches.inactive_unfollow", self.batches.inactive_unfollow),
            ("batches.favorites_per_contact", self.batches.favorites_per_contact),
        ];
        for (field, limit) in limits {
            if limit.min > limit.max {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("min {} is greater than max {}", limit.min, limit.max),
                });
            }
        }

        let delays = [("timing.step", self.timing.step), ("timing.wait_task", self.timing.wait_task)];
        for (field, range) in delays {
            if range.min_ms > range.max_ms {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("min_ms {} is greater than max_ms {}", range.min_ms, range.max_ms),
                });
            }
        }

        if self.browser.timeout_secs <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.timeout_secs".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        self.parsed_tasks()?;
        Ok(())
    }

    pub fn parsed_tasks(&self) -> Result<Vec<Task>, ConfigError> {
        self.system.tasks.iter().map(|t| t.parse()).collect()
    }

    /// Checkpoint file for the configured account.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.persistence
            .save_folder
            .join(format!("PersistenceData_{}.json", self.system.user_email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn rejects_inverted_batch_limit() {
        let mut config = Config::default();
        config.batches.follow = BatchLimit { min: 9, max: 3 };
        match config.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "batches.follow"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_task() {
        let mut config = Config::default();
        config.system.tasks.push("DoSomethingElse".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::UnknownTask { .. })));
    }

    #[test]
    fn bad_task_in_file_can_be_overridden() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bot.toml");
        let mut config = Config::default();
        config.system.tasks = vec!["DoSomethingElse".to_string()];
        config.save(&path).unwrap();

        let mut loaded = Config::load(&path).unwrap();
        assert!(loaded.validate().is_err());
        loaded.override_tasks(" DoContactsFollow, ,Save");
        assert_eq!(loaded.system.tasks, vec!["DoContactsFollow", "Save"]);
        loaded.validate().unwrap();
    }

    #[test]
    fn rejects_missing_root() {
        let mut config = Config::default();
        config.urls.root = " ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn checkpoint_path_uses_account_email() {
        let mut config = Config::default();
        config.persistence.save_folder = PathBuf::from("/tmp/bot");
        config.system.user_email = "me@example.com".to_string();
        assert_eq!(
            config.checkpoint_path(),
            PathBuf::from("/tmp/bot/PersistenceData_me@example.com.json")
        );
    }
}
