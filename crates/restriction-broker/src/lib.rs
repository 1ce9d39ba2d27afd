pub mod config;
pub mod memory;
pub mod stores;

pub use crate::config::{
    parse_absolute_url, validate_redirect, MetaKeys, RedirectRejection, RestrictionConfig,
};
pub use crate::memory::{InMemoryDirectory, InMemoryMetadataStore, InMemoryRoleStore, PageRecord};
pub use crate::stores::{ContentDirectory, MetaValue, MetadataStore, RoleInfo, RoleStore};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use rolegate_core_types::{Actor, ContentId, GateError, RoleName};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use url::Url;

/// Outcome of an access check for one content item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Denied; `redirect` is set when the governing record carries a usable target.
    Deny { redirect: Option<Url> },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Allow => DecisionKind::Allow,
            Decision::Deny { .. } => DecisionKind::Deny,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecisionKind {
    Allow = 0,
    Deny = 1,
}

/// Event emitted whenever the broker issues a decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub content: ContentId,
    /// Item whose record decided the outcome (the parent when inherited).
    pub governed_by: ContentId,
    pub decision: DecisionKind,
    pub redirect: Option<String>,
    pub timestamp: SystemTime,
}

/// Errors produced by the broker surface.
#[derive(Clone, Debug, Error)]
pub enum BrokerError {
    #[error("metadata storage failure: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BrokerError> for GateError {
    fn from(value: BrokerError) -> Self {
        GateError::new(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerOptions {
    pub keys: MetaKeys,
    /// Roles that bypass every check.
    pub privileged: BTreeSet<RoleName>,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            keys: MetaKeys::default(),
            privileged: BTreeSet::from([
                RoleName::from("administrator"),
                RoleName::from("editor"),
            ]),
        }
    }
}

/// Decision engine over the host's metadata and content structure.
pub struct AccessBroker {
    metadata: Arc<dyn MetadataStore>,
    directory: Arc<dyn ContentDirectory>,
    options: RwLock<BrokerOptions>,
    events: broadcast::Sender<AuditEvent>,
}

impl AccessBroker {
    pub fn new(metadata: Arc<dyn MetadataStore>, directory: Arc<dyn ContentDirectory>) -> Self {
        Self::with_options(metadata, directory, BrokerOptions::default())
    }

    pub fn with_options(
        metadata: Arc<dyn MetadataStore>,
        directory: Arc<dyn ContentDirectory>,
        options: BrokerOptions,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(128);
        Self {
            metadata,
            directory,
            options: RwLock::new(options),
            events: tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.events.subscribe()
    }

    pub fn set_options(&self, options: BrokerOptions) {
        *self.options.write() = options;
    }

    pub fn options(&self) -> BrokerOptions {
        self.options.read().clone()
    }

    pub fn keys(&self) -> MetaKeys {
        self.options.read().keys.clone()
    }

    pub fn is_privileged(&self, actor: &Actor) -> bool {
        actor.holds_any(&self.options.read().privileged)
    }

    /// The item's own record, ignoring inheritance.
    pub fn load_config(&self, id: ContentId) -> RestrictionConfig {
        let keys = self.keys();
        RestrictionConfig::load(self.metadata.as_ref(), &keys, id)
    }

    /// Picks the record that governs `id`: the direct parent's when the parent is
    /// restricted, otherwise the item's own.
    pub fn resolve(&self, id: ContentId) -> (ContentId, RestrictionConfig) {
        let keys = self.keys();
        if let Some(parent) = self.directory.parent_of(id) {
            if RestrictionConfig::load_enabled(self.metadata.as_ref(), &keys, parent) {
                return (
                    parent,
                    RestrictionConfig::load(self.metadata.as_ref(), &keys, parent),
                );
            }
        }
        (id, RestrictionConfig::load(self.metadata.as_ref(), &keys, id))
    }

    pub fn decide(&self, id: ContentId, actor: &Actor) -> Decision {
        let (governed_by, config) = self.resolve(id);
        let decision = if !config.is_active()
            || self.is_privileged(actor)
            || actor.holds_any(&config.allowed_roles)
        {
            Decision::Allow
        } else {
            Decision::Deny {
                redirect: config.redirect_target(),
            }
        };

        debug!(
            target = "restriction-broker",
            content = %id,
            governed_by = %governed_by,
            decision = ?decision.kind(),
            "access decision"
        );
        self.publish_event(id, governed_by, &decision);
        decision
    }

    pub fn is_visible(&self, id: ContentId, actor: &Actor) -> bool {
        self.decide(id, actor).is_allowed()
    }

    /// Items whose own active record shares no role with `actor`.
    pub fn denied_for(&self, actor: &Actor) -> BTreeSet<ContentId> {
        if self.is_privileged(actor) {
            return BTreeSet::new();
        }
        let keys = self.keys();
        self.metadata
            .scan(&keys.restrict_access)
            .into_iter()
            .filter(|(_, flag)| config::flag_from_meta(flag))
            .map(|(id, _)| (id, RestrictionConfig::load(self.metadata.as_ref(), &keys, id)))
            .filter(|(_, config)| config.is_active() && !actor.holds_any(&config.allowed_roles))
            .map(|(id, _)| id)
            .collect()
    }

    fn publish_event(&self, content: ContentId, governed_by: ContentId, decision: &Decision) {
        let redirect = match decision {
            Decision::Deny { redirect } => redirect.as_ref().map(Url::to_string),
            Decision::Allow => None,
        };
        let event = AuditEvent {
            content,
            governed_by,
            decision: decision.kind(),
            redirect,
            timestamp: SystemTime::now(),
        };

        // Sending fails only when nobody subscribed.
        if self.events.send(event).is_err() {
            trace!(target = "restriction-broker", "no audit subscribers");
        }
    }
}
