//! Element tree over a markup fragment, keyed by byte spans into the source.
//!
//! Only elements are materialised. Removing a node splices its span out of the
//! original text, so everything around it is left byte for byte.

use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::{ScrubError, ScrubResult};

pub type NodeId = usize;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Clone, Debug)]
pub struct Element {
    pub name: String,
    pub span: Range<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|candidate| candidate == class)
    }
}

#[derive(Debug)]
pub struct MarkupTree<'a> {
    source: &'a str,
    elements: Vec<Element>,
}

impl<'a> MarkupTree<'a> {
    pub fn parse(source: &'a str) -> ScrubResult<Self> {
        let mut reader = Reader::from_str(source);
        reader.trim_text(false);
        reader.check_end_names(false);

        let mut elements: Vec<Element> = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();

        loop {
            let start = reader.buffer_position();
            let event = reader.read_event().map_err(|err| ScrubError::Malformed {
                position: reader.buffer_position(),
                reason: err.to_string(),
            })?;
            let end = reader.buffer_position();

            match event {
                Event::Start(tag) => {
                    close_implied(&mut elements, &mut open, tag.name().as_ref(), start);
                    let id = push_element(&mut elements, &tag, start..end, open.last().copied());
                    if !VOID_ELEMENTS.contains(&elements[id].name.as_str()) {
                        open.push(id);
                    }
                }
                Event::Empty(tag) => {
                    close_implied(&mut elements, &mut open, tag.name().as_ref(), start);
                    push_element(&mut elements, &tag, start..end, open.last().copied());
                }
                Event::End(tag) => {
                    let name = lower_name(tag.name().as_ref());
                    // Stray end tags are ignored. Elements still open inside the
                    // matched one are closed where its end tag begins.
                    if let Some(pos) = open.iter().rposition(|id| elements[*id].name == name) {
                        let closed: Vec<NodeId> = open.drain(pos..).collect();
                        elements[closed[0]].span.end = end;
                        for id in &closed[1..] {
                            elements[*id].span.end = start;
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        for id in open {
            elements[id].span.end = source.len();
        }

        Ok(Self { source, elements })
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.elements[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.elements[id].parent
    }

    pub fn find_all<'t>(&'t self, name: &'t str) -> impl Iterator<Item = NodeId> + 't {
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, element)| element.name == name)
            .map(|(id, _)| id)
    }

    /// Source text of one element, tags included.
    pub fn outer_markup(&self, id: NodeId) -> &'a str {
        let span = self.elements[id].span.clone();
        &self.source[span]
    }

    /// Serialises the fragment with the given elements (and their subtrees) cut out.
    pub fn without(&self, removed: &[NodeId]) -> String {
        let mut spans: Vec<Range<usize>> = removed
            .iter()
            .map(|id| self.elements[*id].span.clone())
            .collect();
        spans.sort_by_key(|span| span.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for span in spans {
            if span.start < cursor {
                // Nested inside a span that is already gone.
                continue;
            }
            out.push_str(&self.source[cursor..span.start]);
            cursor = span.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

const LIST_SCOPE: &[&str] = &["ul", "ol", "menu"];
const BUTTON_SCOPE: &[&str] = &[
    "button", "table", "td", "th", "caption", "object", "marquee", "template", "applet", "html",
];
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "menu",
    "nav", "ol", "p", "pre", "section", "table", "ul",
];

type ImpliedEnd = (&'static [&'static str], &'static [&'static str]);

/// Which open elements a start tag ends implicitly, and where the search stops.
fn implied_end(opening: &str) -> Option<ImpliedEnd> {
    const ITEM: ImpliedEnd = (&["li", "p"], LIST_SCOPE);
    const DEFINITION: ImpliedEnd = (&["dt", "dd", "p"], &["dl"]);
    const OPTION: ImpliedEnd = (&["option"], &["select", "datalist", "optgroup"]);
    const OPTGROUP: ImpliedEnd = (&["option", "optgroup"], &["select"]);
    const PARAGRAPH: ImpliedEnd = (&["p"], BUTTON_SCOPE);

    match opening {
        "li" => Some(ITEM),
        "dt" | "dd" => Some(DEFINITION),
        "option" => Some(OPTION),
        "optgroup" => Some(OPTGROUP),
        name if CLOSES_PARAGRAPH.contains(&name) => Some(PARAGRAPH),
        _ => None,
    }
}

/// Ends elements whose end tag may be omitted, e.g. an `li` followed by another `li`.
/// The closed element and anything still open inside it end where `at` begins.
fn close_implied(elements: &mut [Element], open: &mut Vec<NodeId>, raw_name: &[u8], at: usize) {
    let name = lower_name(raw_name);
    let Some((targets, boundaries)) = implied_end(&name) else {
        return;
    };
    let mut found = None;
    for (pos, id) in open.iter().enumerate().rev() {
        let open_name = elements[*id].name.as_str();
        if targets.contains(&open_name) {
            found = Some(pos);
            // A paragraph ends too, but the search goes on for an item around it.
            if open_name != "p" || targets.len() == 1 {
                break;
            }
            continue;
        }
        if boundaries.contains(&open_name) {
            break;
        }
    }
    if let Some(pos) = found {
        for id in open.drain(pos..) {
            elements[id].span.end = at;
        }
    }
}

fn push_element(
    elements: &mut Vec<Element>,
    tag: &BytesStart<'_>,
    span: Range<usize>,
    parent: Option<NodeId>,
) -> NodeId {
    let attrs = tag
        .html_attributes()
        .flatten()
        .map(|attr| {
            let key = lower_name(attr.key.as_ref());
            let value = attr
                .unescape_value()
                .map(|value| value.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect();

    let id = elements.len();
    elements.push(Element {
        name: lower_name(tag.name().as_ref()),
        span,
        parent,
        children: Vec::new(),
        attrs,
    });
    if let Some(parent) = parent {
        elements[parent].children.push(id);
    }
    id
}

fn lower_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_parent_links() {
        let tree = MarkupTree::parse(r#"<ul><li id="a"><a href="/x">X</a></li><li id="b">B</li></ul>"#)
            .unwrap();
        let anchors: Vec<_> = tree.find_all("a").collect();
        assert_eq!(anchors.len(), 1);
        let li = tree.parent(anchors[0]).unwrap();
        assert_eq!(tree.element(li).attr("id"), Some("a"));
        assert_eq!(tree.element(li).children, vec![anchors[0]]);
        assert_eq!(tree.outer_markup(li), r#"<li id="a"><a href="/x">X</a></li>"#);
    }

    #[test]
    fn removal_keeps_siblings_byte_for_byte() {
        let source = "<ul>\n  <li id=\"a\">A</li>\n  <li id=\"b\">B</li>\n</ul>";
        let tree = MarkupTree::parse(source).unwrap();
        let target: Vec<_> = tree
            .find_all("li")
            .filter(|id| tree.element(*id).attr("id") == Some("a"))
            .collect();
        assert_eq!(tree.without(&target), "<ul>\n  \n  <li id=\"b\">B</li>\n</ul>");
    }

    #[test]
    fn void_and_unclosed_elements_do_not_swallow_siblings() {
        let source = r#"<li id="a">A<br><img src="x.png"></li><li id="b"><p>unclosed</li>"#;
        let tree = MarkupTree::parse(source).unwrap();
        let items: Vec<_> = tree.find_all("li").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(tree.parent(items[1]), None);
        assert_eq!(
            tree.outer_markup(items[0]),
            r#"<li id="a">A<br><img src="x.png"></li>"#
        );
        let paragraph = tree.find_all("p").next().unwrap();
        assert_eq!(tree.parent(paragraph), Some(items[1]));
    }

    #[test]
    fn nested_removals_collapse() {
        let source = r#"<ul><li id="outer"><ul><li id="inner">I</li></ul></li><li>keep</li></ul>"#;
        let tree = MarkupTree::parse(source).unwrap();
        let all: Vec<_> = tree
            .find_all("li")
            .filter(|id| tree.element(*id).attr("id").is_some())
            .collect();
        assert_eq!(tree.without(&all), "<ul><li>keep</li></ul>");
    }

    #[test]
    fn omitted_end_tags_close_at_the_next_sibling() {
        let source = r#"<ul><li id="a"><a href="/m">M</a><li id="b"><a href="/x">X</a></ul>"#;
        let tree = MarkupTree::parse(source).unwrap();
        let items: Vec<_> = tree.find_all("li").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(tree.parent(items[1]), tree.parent(items[0]));
        assert_eq!(tree.outer_markup(items[0]), r#"<li id="a"><a href="/m">M</a>"#);
        assert_eq!(
            tree.without(&items[..1]),
            r#"<ul><li id="b"><a href="/x">X</a></ul>"#
        );
    }

    #[test]
    fn nested_lists_do_not_close_the_outer_item() {
        let source = "<ul><li id=\"a\">A<ul><li id=\"c\">C<li id=\"d\">D</ul></li><li id=\"b\">B</ul>";
        let tree = MarkupTree::parse(source).unwrap();
        let outer = tree
            .find_all("li")
            .find(|id| tree.element(*id).attr("id") == Some("a"))
            .unwrap();
        assert_eq!(tree.element(outer).children.len(), 1);
        assert_eq!(
            tree.outer_markup(outer),
            "<li id=\"a\">A<ul><li id=\"c\">C<li id=\"d\">D</ul></li>"
        );
    }

    #[test]
    fn block_start_ends_an_open_paragraph() {
        let tree = MarkupTree::parse("<div><p>one<p>two<div>three</div></div>").unwrap();
        let paragraphs: Vec<_> = tree.find_all("p").collect();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(tree.outer_markup(paragraphs[0]), "<p>one");
        assert_eq!(tree.outer_markup(paragraphs[1]), "<p>two");
    }

    #[test]
    fn html_style_attributes_are_read() {
        let tree = MarkupTree::parse("<li class=page_item data-x>row</li>").unwrap();
        let li = tree.find_all("li").next().unwrap();
        assert!(tree.element(li).has_class("page_item"));
        assert_eq!(tree.element(li).attr("data-x"), Some(""));
    }
}
