//! Pre-execution exclusion of restricted items from search queries.

use std::collections::BTreeSet;

use restriction_broker::AccessBroker;
use rolegate_core_types::{Actor, ContentId};
use tracing::debug;

/// The parts of a host content query this layer reads and amends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentQuery {
    pub search: Option<String>,
    pub exclude_ids: BTreeSet<ContentId>,
    pub exclude_parent_ids: BTreeSet<ContentId>,
}

impl ContentQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Any non-empty term counts, whitespace included.
    pub fn is_search(&self) -> bool {
        self.search
            .as_deref()
            .map(|term| !term.is_empty())
            .unwrap_or(false)
    }

    /// Whether a row with this id and parent survives the exclusions.
    pub fn admits(&self, id: ContentId, parent: Option<ContentId>) -> bool {
        if self.exclude_ids.contains(&id) {
            return false;
        }
        match parent {
            Some(parent) => !self.exclude_parent_ids.contains(&parent),
            None => true,
        }
    }
}

/// Adds every item denied to `actor` to the query's exclusions and returns
/// how many ids were excluded. Admin screens and privileged actors are left alone.
pub fn restrict_search(
    broker: &AccessBroker,
    query: &mut ContentQuery,
    actor: &Actor,
    admin_screen: bool,
) -> usize {
    if admin_screen || !query.is_search() || broker.is_privileged(actor) {
        return 0;
    }

    let denied = broker.denied_for(actor);
    debug!(target = "rolegate", excluded = denied.len(), "search exclusions applied");
    query.exclude_ids.extend(denied.iter().copied());
    query.exclude_parent_ids.extend(denied.iter().copied());
    denied.len()
}
