use rolegate_core_types::ContentId;
use serde::{Deserialize, Serialize};

use crate::report::ScrubReport;

/// Row of a "recently updated" listing supplied by a companion widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentItem {
    pub id: ContentId,
    pub title: String,
    pub url: String,
    pub modified: Option<String>,
}

/// Keeps the rows the actor may see, preserving order.
pub fn scrub_recent<F>(items: Vec<RecentItem>, is_denied: F) -> (Vec<RecentItem>, ScrubReport)
where
    F: Fn(ContentId) -> bool,
{
    let mut removed = Vec::new();
    let kept: Vec<RecentItem> = items
        .into_iter()
        .filter(|item| {
            let deny = is_denied(item.id);
            if deny {
                removed.push(item.id);
            }
            !deny
        })
        .collect();

    let report = if removed.is_empty() {
        ScrubReport::skipped("no denied items")
    } else {
        ScrubReport::applied(removed)
    };
    (kept, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64) -> RecentItem {
        RecentItem {
            id: ContentId(id),
            title: format!("Page {id}"),
            url: format!("https://example.com/p/{id}/"),
            modified: None,
        }
    }

    #[test]
    fn drops_each_denied_item_and_keeps_order() {
        let (kept, report) = scrub_recent(vec![item(1), item(2), item(3), item(4)], |id| {
            id == ContentId(2) || id == ContentId(4)
        });
        let ids: Vec<_> = kept.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![ContentId(1), ContentId(3)]);
        assert_eq!(report.removed, vec![ContentId(2), ContentId(4)]);
    }

    #[test]
    fn empty_listing_stays_empty() {
        let (kept, report) = scrub_recent(Vec::new(), |_| true);
        assert!(kept.is_empty());
        assert!(!report.applied);
    }
}
