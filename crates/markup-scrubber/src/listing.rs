//! Navigation menus and page listings.

use std::collections::HashMap;

use rolegate_core_types::ContentId;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::report::{ScrubReport, Scrubbed};
use crate::tree::{MarkupTree, NodeId};

/// One rendered navigation entry as reported by the host's menu API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub item_id: u64,
    /// Content the entry points at; `None` for custom links.
    pub object_id: Option<ContentId>,
}

impl MenuEntry {
    pub fn new(item_id: u64, object_id: u64) -> Self {
        Self {
            item_id,
            object_id: ContentId::from_raw(object_id),
        }
    }

    fn dom_id(&self) -> String {
        format!("menu-item-{}", self.item_id)
    }
}

/// Removes the `li#menu-item-N` rows whose target content is denied.
pub fn scrub_menu<F>(markup: &str, entries: &[MenuEntry], is_denied: F) -> Scrubbed
where
    F: Fn(ContentId) -> bool,
{
    let denied: HashMap<String, ContentId> = entries
        .iter()
        .filter_map(|entry| entry.object_id.map(|id| (entry.dom_id(), id)))
        .filter(|(_, id)| is_denied(*id))
        .collect();
    if denied.is_empty() {
        return Scrubbed::untouched(markup, "no denied menu entries");
    }

    let tree = match MarkupTree::parse(markup) {
        Ok(tree) => tree,
        Err(err) => {
            warn!(target = "markup-scrubber", %err, "menu markup left unmodified");
            return Scrubbed::untouched(markup, "unparseable menu markup");
        }
    };

    let mut targets: Vec<NodeId> = Vec::new();
    let mut removed: Vec<ContentId> = Vec::new();
    for node in tree.find_all("li") {
        let Some(dom_id) = tree.element(node).attr("id") else {
            continue;
        };
        if let Some(content) = denied.get(dom_id) {
            targets.push(node);
            removed.push(*content);
        }
    }

    finish(&tree, markup, targets, removed)
}

/// Removes page-list rows (`li.page-item-N`) whose content is denied.
pub fn scrub_page_list<F>(markup: &str, is_denied: F) -> Scrubbed
where
    F: Fn(ContentId) -> bool,
{
    let tree = match MarkupTree::parse(markup) {
        Ok(tree) => tree,
        Err(err) => {
            warn!(target = "markup-scrubber", %err, "page list markup left unmodified");
            return Scrubbed::untouched(markup, "unparseable page list markup");
        }
    };

    let mut targets: Vec<NodeId> = Vec::new();
    let mut removed: Vec<ContentId> = Vec::new();
    for node in tree.find_all("li") {
        let Some(content) = page_item_id(tree.element(node).classes()) else {
            continue;
        };
        if is_denied(content) {
            targets.push(node);
            removed.push(content);
        }
    }

    finish(&tree, markup, targets, removed)
}

fn page_item_id<'a>(mut classes: impl Iterator<Item = &'a str>) -> Option<ContentId> {
    classes.find_map(|class| {
        class
            .strip_prefix("page-item-")
            .and_then(|raw| raw.parse::<ContentId>().ok())
    })
}

fn finish(
    tree: &MarkupTree<'_>,
    markup: &str,
    targets: Vec<NodeId>,
    removed: Vec<ContentId>,
) -> Scrubbed {
    if targets.is_empty() {
        return Scrubbed::untouched(markup, "no denied rows present");
    }
    Scrubbed {
        output: tree.without(&targets),
        report: ScrubReport::applied(removed),
    }
}
