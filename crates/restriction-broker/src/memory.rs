//! In-memory collaborators for tests and embedded hosts.

use dashmap::DashMap;
use parking_lot::RwLock;
use rolegate_core_types::ContentId;

use crate::stores::{ContentDirectory, MetaValue, MetadataStore, RoleInfo, RoleStore};
use crate::BrokerError;

#[derive(Default)]
pub struct InMemoryMetadataStore {
    entries: DashMap<(ContentId, String), MetaValue>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, id: ContentId, key: &str) -> Option<MetaValue> {
        self.entries
            .get(&(id, key.to_string()))
            .map(|entry| entry.value().clone())
    }

    fn set(&self, id: ContentId, key: &str, value: MetaValue) -> Result<(), BrokerError> {
        self.entries.insert((id, key.to_string()), value);
        Ok(())
    }

    fn delete(&self, id: ContentId, key: &str) -> Result<(), BrokerError> {
        self.entries.remove(&(id, key.to_string()));
        Ok(())
    }

    fn scan(&self, key: &str) -> Vec<(ContentId, MetaValue)> {
        let mut hits: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.key().1 == key)
            .map(|entry| (entry.key().0, entry.value().clone()))
            .collect();
        hits.sort_by_key(|(id, _)| *id);
        hits
    }
}

#[derive(Clone, Debug)]
pub struct PageRecord {
    pub title: String,
    pub permalink: String,
    pub parent: Option<ContentId>,
}

pub struct InMemoryDirectory {
    home: String,
    pages: DashMap<ContentId, PageRecord>,
}

impl InMemoryDirectory {
    pub fn new(home: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            pages: DashMap::new(),
        }
    }

    pub fn insert(&self, id: ContentId, record: PageRecord) {
        self.pages.insert(id, record);
    }

    /// Registers a page under `{home}/{slug}/`.
    pub fn add_page(&self, id: ContentId, title: &str, slug: &str, parent: Option<ContentId>) {
        let permalink = format!("{}/{}/", self.home.trim_end_matches('/'), slug);
        self.insert(
            id,
            PageRecord {
                title: title.to_string(),
                permalink,
                parent,
            },
        );
    }
}

fn normalize_link(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);
    without_fragment.trim_end_matches('/')
}

impl ContentDirectory for InMemoryDirectory {
    fn parent_of(&self, id: ContentId) -> Option<ContentId> {
        self.pages.get(&id).and_then(|page| page.parent)
    }

    fn permalink(&self, id: ContentId) -> Option<String> {
        self.pages.get(&id).map(|page| page.permalink.clone())
    }

    fn resolve_url(&self, href: &str) -> Option<ContentId> {
        let wanted = normalize_link(href);
        if wanted.is_empty() {
            return None;
        }
        let mut matches: Vec<ContentId> = self
            .pages
            .iter()
            .filter(|page| normalize_link(&page.permalink) == wanted)
            .map(|page| *page.key())
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    fn find_by_title(&self, title: &str) -> Option<ContentId> {
        let wanted = title.trim();
        let mut matches: Vec<ContentId> = self
            .pages
            .iter()
            .filter(|page| page.title == wanted)
            .map(|page| *page.key())
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    fn home_url(&self) -> String {
        self.home.clone()
    }
}

#[derive(Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<Vec<RoleInfo>>,
}

impl InMemoryRoleStore {
    pub fn new(roles: Vec<RoleInfo>) -> Self {
        Self {
            roles: RwLock::new(roles),
        }
    }

    pub fn add(&self, role: RoleInfo) {
        self.roles.write().push(role);
    }
}

impl RoleStore for InMemoryRoleStore {
    fn assignable_roles(&self) -> Vec<RoleInfo> {
        self.roles.read().clone()
    }
}
