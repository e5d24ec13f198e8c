use crate::config::Config;
use crate::engine::identifier::Identifier;
use crate::engine::queue::{IdentifierSet, WorkQueue};
use crate::engine::state::{RunState, SessionArtifacts};
use crate::error::CheckpointError;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Persisted snapshot of a run. Missing fields load as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    pub owner: Option<Identifier>,

    pub contacts_to_follow: WorkQueue,
    pub contacts_to_favorite: WorkQueue,
    pub contacts_to_unfollow: WorkQueue,
    pub photos_to_favorite: WorkQueue,

    pub session_initialized_at: Option<DateTime<Utc>>,
    pub cookies: Vec<Value>,
    pub local_storage: BTreeMap<String, String>,
    pub session_storage: BTreeMap<String, String>,

    pub contacts_synced_at: Option<DateTime<Utc>>,
    pub known_contacts: IdentifierSet,
    pub banned_contacts: IdentifierSet,
    pub myself: IdentifierSet,
}

impl Checkpoint {
    /// Snapshot of `state`. The contact sets are left out unless cached.
    pub fn capture(state: &RunState, cache_contacts: bool) -> Self {
        let mut checkpoint = Self {
            owner: state.owner.clone(),
            contacts_to_follow: state.contacts_to_follow.clone(),
            contacts_to_favorite: state.contacts_to_favorite.clone(),
            contacts_to_unfollow: state.contacts_to_unfollow.clone(),
            photos_to_favorite: state.photos_to_favorite.clone(),
            session_initialized_at: state.session.initialized_at,
            cookies: state.session.cookies.clone(),
            local_storage: state.session.local_storage.clone(),
            session_storage: state.session.session_storage.clone(),
            ..Default::default()
        };
        if cache_contacts {
            checkpoint.contacts_synced_at = state.contacts_synced_at;
            checkpoint.known_contacts = state.known_contacts.clone();
            checkpoint.banned_contacts = state.banned_contacts.clone();
            checkpoint.myself = state.myself.clone();
        }
        checkpoint
    }

    /// Rebuilds a run state. Contact queues are filtered again against the
    /// restored sets.
    pub fn restore(self, cache_contacts: bool) -> RunState {
        let mut state = RunState {
            owner: self.owner,
            contacts_to_follow: self.contacts_to_follow,
            contacts_to_favorite: self.contacts_to_favorite,
            contacts_to_unfollow: self.contacts_to_unfollow,
            photos_to_favorite: self.photos_to_favorite,
            session: SessionArtifacts {
                cookies: self.cookies,
                local_storage: self.local_storage,
                session_storage: self.session_storage,
                initialized_at: self.session_initialized_at,
            },
            ..RunState::default()
        };
        if cache_contacts {
            state.contacts_synced_at = self.contacts_synced_at;
            state.known_contacts = self.known_contacts;
            state.banned_contacts = self.banned_contacts;
            state.myself = self.myself;
        }
        let dropped = state.refilter_contact_queues();
        if dropped > 0 {
            debug!("Dropped {} stale queued contacts", dropped);
        }
        state
    }

    /// Time the expiry window starts from.
    pub fn started_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.session_initialized_at.or(self.contacts_synced_at).unwrap_or(now)
    }

    pub fn is_expired(&self, limit_hours: i64, now: DateTime<Utc>) -> bool {
        limit_hours <= 0 || now >= self.started_at(now) + Duration::hours(limit_hours)
    }
}

/// Reads and writes the checkpoint file of one account.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    enabled: bool,
    limit_hours: i64,
    cache_contacts: bool,
}

impl CheckpointStore {
    pub fn new(path: PathBuf, limit_hours: i64, cache_contacts: bool) -> Self {
        Self { path, enabled: true, limit_hours, cache_contacts }
    }

    pub fn from_config(config: &Config) -> Self {
        let persistence = &config.persistence;
        Self {
            path: config.checkpoint_path(),
            enabled: persistence.enabled,
            limit_hours: persistence.limit_hours,
            cache_contacts: persistence.cache_contacts,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The saved run state, or `None` when there is no usable checkpoint.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Option<RunState>, CheckpointError> {
        if !self.enabled {
            return Ok(None);
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No existing session to load: {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let checkpoint: Checkpoint = serde_json::from_str(&content)?;

        if checkpoint.is_expired(self.limit_hours, now) {
            warn!("Persistence limit reached, starting a new session");
            return Ok(None);
        }
        let state = checkpoint.restore(self.cache_contacts);
        info!("Loaded checkpoint {}", self.path.display());
        debug!("{}", state.queue_summary());
        Ok(Some(state))
    }

    /// Writes `state` through a temporary file renamed over the target, so a
    /// reader never sees a partial checkpoint.
    pub fn save(&self, state: &RunState) -> Result<(), CheckpointError> {
        if !self.enabled {
            return Ok(());
        }
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let content = serde_json::to_string_pretty(&Checkpoint::capture(state, self.cache_contacts))?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.path).map_err(|e| CheckpointError::Io(e.error))?;

        debug!("Saved checkpoint {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_uses_init_then_sync_time() {
        let now = Utc::now();
        let mut checkpoint = Checkpoint::default();
        // No timestamp at all: the window starts now.
        assert!(!checkpoint.is_expired(1, now));
        assert!(checkpoint.is_expired(0, now));

        checkpoint.contacts_synced_at = Some(now - Duration::hours(3));
        assert!(checkpoint.is_expired(2, now));
        checkpoint.session_initialized_at = Some(now - Duration::hours(1));
        assert!(!checkpoint.is_expired(2, now));
    }

    #[test]
    fn uncached_contacts_are_not_captured() {
        let mut state = RunState::new();
        state.known_contacts.insert(Identifier::new("https://x/a"));
        state.contacts_to_follow.push(Identifier::new("https://x/b"));

        let checkpoint = Checkpoint::capture(&state, false);
        assert!(checkpoint.known_contacts.is_empty());
        assert_eq!(checkpoint.contacts_to_follow.len(), 1);
    }
}
