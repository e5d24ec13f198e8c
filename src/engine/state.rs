use crate::engine::identifier::Identifier;
use crate::engine::queue::{IdentifierSet, WorkQueue};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Browser artifacts needed to resume an authenticated session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionArtifacts {
    pub cookies: Vec<Value>,
    pub local_storage: BTreeMap<String, String>,
    pub session_storage: BTreeMap<String, String>,
    pub initialized_at: Option<DateTime<Utc>>,
}

impl SessionArtifacts {
    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }
}

/// Mutable run context threaded through the controller, collectors and
/// executors.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Contact URL of the authenticated user, without trailing slash.
    pub owner: Option<Identifier>,

    pub contacts_to_follow: WorkQueue,
    pub contacts_to_favorite: WorkQueue,
    pub contacts_to_unfollow: WorkQueue,
    pub photos_to_favorite: WorkQueue,

    pub known_contacts: IdentifierSet,
    pub banned_contacts: IdentifierSet,
    pub myself: IdentifierSet,

    /// Contacts attempted during this process. Never persisted.
    pub in_tryout: IdentifierSet,

    pub contacts_synced_at: Option<DateTime<Utc>>,
    pub session: SessionArtifacts,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops contact-queue entries that are already known or banned.
    pub fn refilter_contact_queues(&mut self) -> usize {
        let filters = [&self.known_contacts, &self.banned_contacts];
        self.contacts_to_follow.retain_outside(&filters)
            + self.contacts_to_favorite.retain_outside(&filters)
    }

    pub fn queue_summary(&self) -> String {
        format!(
            "follow={} favorite-contacts={} unfollow={} favorite-photos={} known={} banned={}",
            self.contacts_to_follow.len(),
            self.contacts_to_favorite.len(),
            self.contacts_to_unfollow.len(),
            self.photos_to_favorite.len(),
            self.known_contacts.len(),
            self.banned_contacts.len(),
        )
    }
}
