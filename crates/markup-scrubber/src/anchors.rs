//! Links embedded in already-rendered body content.

use std::cell::RefCell;
use std::collections::HashMap;

use rolegate_core_types::ContentId;
use tracing::warn;

use crate::report::{ScrubReport, Scrubbed};
use crate::tree::{MarkupTree, NodeId};

/// Drops the list item around each anchor that points at denied content.
///
/// Only an `li` that directly wraps the anchor is removed. Bare inline links
/// stay in place.
pub fn scrub_anchors<R, F>(markup: &str, resolve: R, is_denied: F) -> Scrubbed
where
    R: Fn(&str) -> Option<ContentId>,
    F: Fn(ContentId) -> bool,
{
    let tree = match MarkupTree::parse(markup) {
        Ok(tree) => tree,
        Err(err) => {
            warn!(target = "markup-scrubber", %err, "body markup left unmodified");
            return Scrubbed::untouched(markup, "unparseable body markup");
        }
    };

    let verdicts: RefCell<HashMap<ContentId, bool>> = RefCell::new(HashMap::new());
    let denied = |id: ContentId| {
        *verdicts
            .borrow_mut()
            .entry(id)
            .or_insert_with(|| is_denied(id))
    };

    let mut targets: Vec<NodeId> = Vec::new();
    let mut removed: Vec<ContentId> = Vec::new();
    for anchor in tree.find_all("a") {
        let Some(href) = tree.element(anchor).attr("href") else {
            continue;
        };
        let Some(content) = resolve(href) else {
            continue;
        };
        if !denied(content) {
            continue;
        }
        let Some(parent) = tree.parent(anchor) else {
            continue;
        };
        if tree.element(parent).name == "li" && !targets.contains(&parent) {
            targets.push(parent);
            removed.push(content);
        }
    }

    if targets.is_empty() {
        return Scrubbed::untouched(markup, "no removable links");
    }
    Scrubbed {
        output: tree.without(&targets),
        report: ScrubReport::applied(removed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(href: &str) -> Option<ContentId> {
        match href.trim_end_matches('/') {
            "https://example.com/members" => Some(ContentId(10)),
            "https://example.com/about" => Some(ContentId(20)),
            _ => None,
        }
    }

    #[test]
    fn removes_enclosing_list_item() {
        let body = concat!(
            "<p>See also:</p>\n<ul>\n",
            r#"<li><a href="https://example.com/members/">Members</a></li>"#,
            "\n",
            r#"<li><a href="https://example.com/about/">About</a></li>"#,
            "\n</ul>",
        );
        let scrubbed = scrub_anchors(body, resolve, |id| id == ContentId(10));
        let expected = concat!(
            "<p>See also:</p>\n<ul>\n",
            "\n",
            r#"<li><a href="https://example.com/about/">About</a></li>"#,
            "\n</ul>",
        );
        assert_eq!(scrubbed.output, expected);
        assert_eq!(scrubbed.report.removed, vec![ContentId(10)]);
    }

    #[test]
    fn list_items_without_end_tags_are_removed_one_at_a_time() {
        let body = concat!(
            r#"<ul><li><a href="https://example.com/members/">M</a>"#,
            r#"<li><a href="https://example.com/about/">A</a></ul>"#,
        );
        let scrubbed = scrub_anchors(body, resolve, |id| id == ContentId(10));
        assert_eq!(
            scrubbed.output,
            r#"<ul><li><a href="https://example.com/about/">A</a></ul>"#
        );
    }

    #[test]
    fn inline_anchor_is_left_alone() {
        let body = r#"<p>Join the <a href="https://example.com/members/">members area</a> today.</p>"#;
        let scrubbed = scrub_anchors(body, resolve, |_| true);
        assert_eq!(scrubbed.output, body);
        assert!(!scrubbed.report.applied);
    }

    #[test]
    fn anchor_nested_deeper_than_list_item_is_left_alone() {
        let body = r#"<ul><li><strong><a href="https://example.com/members/">M</a></strong></li></ul>"#;
        let scrubbed = scrub_anchors(body, resolve, |_| true);
        assert_eq!(scrubbed.output, body);
    }

    #[test]
    fn decision_is_asked_once_per_content_item() {
        let body = concat!(
            r#"<ul><li><a href="https://example.com/about/">A</a></li>"#,
            r#"<li><a href="https://example.com/about">A again</a></li></ul>"#,
        );
        let calls = RefCell::new(0);
        let scrubbed = scrub_anchors(body, resolve, |_| {
            *calls.borrow_mut() += 1;
            false
        });
        assert_eq!(*calls.borrow(), 1);
        assert_eq!(scrubbed.output, body);
    }

    #[test]
    fn malformed_markup_passes_through() {
        let body = r#"<ul><li><a href="https://example.com/members/">M</a></li></ul><!-- unterminated"#;
        let scrubbed = scrub_anchors(body, resolve, |_| true);
        assert_eq!(scrubbed.output, body);
        assert_eq!(
            scrubbed.report.reason.as_deref(),
            Some("unparseable body markup")
        );
    }
}
