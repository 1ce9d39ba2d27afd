//! Contracts for the host platform collaborators the broker reads from.

use rolegate_core_types::{ContentId, RoleName};
use serde::{Deserialize, Serialize};

use crate::BrokerError;

/// Value stored under a metadata key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

/// Per-content key/value storage owned by the host.
pub trait MetadataStore: Send + Sync {
    fn get(&self, id: ContentId, key: &str) -> Option<MetaValue>;
    fn set(&self, id: ContentId, key: &str, value: MetaValue) -> Result<(), BrokerError>;
    fn delete(&self, id: ContentId, key: &str) -> Result<(), BrokerError>;
    /// Every content item carrying `key`, ordered by id.
    fn scan(&self, key: &str) -> Vec<(ContentId, MetaValue)>;
}

/// Structural lookups over the host's content items.
pub trait ContentDirectory: Send + Sync {
    fn parent_of(&self, id: ContentId) -> Option<ContentId>;
    fn permalink(&self, id: ContentId) -> Option<String>;
    /// Maps a link target back to the content item it addresses.
    fn resolve_url(&self, href: &str) -> Option<ContentId>;
    fn find_by_title(&self, title: &str) -> Option<ContentId>;
    fn home_url(&self) -> String;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub slug: RoleName,
    pub display_name: String,
}

impl RoleInfo {
    pub fn new(slug: impl Into<RoleName>, display_name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            display_name: display_name.into(),
        }
    }
}

/// Enumerates the roles the host lets editors assign.
pub trait RoleStore: Send + Sync {
    fn assignable_roles(&self) -> Vec<RoleInfo>;
}
