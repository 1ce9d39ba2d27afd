//! Full-body and title filtering for a single content item.

use markup_scrubber::DenialFragment;
use restriction_broker::{AccessBroker, ContentDirectory, Decision};
use rolegate_core_types::{Actor, ContentId};
use rolegate_policy_center::GateSettings;
use tracing::debug;

/// What the host should emit for a content body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedBody {
    Markup(String),
    /// Terminal: the host answers with a redirect and stops rendering.
    Redirect(RedirectTarget),
}

impl RenderedBody {
    pub fn markup(&self) -> Option<&str> {
        match self {
            RenderedBody::Markup(markup) => Some(markup),
            RenderedBody::Redirect(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectTarget {
    pub location: String,
    pub status: u16,
}

pub fn denial_fragment(settings: &GateSettings, directory: &dyn ContentDirectory) -> DenialFragment {
    DenialFragment {
        class_prefix: settings.meta.prefix.clone(),
        heading: settings.denial.heading.clone(),
        message: settings.denial.message.clone(),
        home_url: directory.home_url(),
        back_label: settings.denial.back_label.clone(),
    }
}

/// Passes the body through, swaps it for the denial fragment, or redirects.
/// A denied body is always replaced whole.
pub fn filter_content(
    broker: &AccessBroker,
    directory: &dyn ContentDirectory,
    settings: &GateSettings,
    id: ContentId,
    actor: &Actor,
    body: String,
) -> RenderedBody {
    match broker.decide(id, actor) {
        Decision::Allow => RenderedBody::Markup(body),
        Decision::Deny {
            redirect: Some(target),
        } => {
            debug!(target = "rolegate", content = %id, location = %target, "redirecting denied request");
            RenderedBody::Redirect(RedirectTarget {
                location: target.to_string(),
                status: settings.redirect.status,
            })
        }
        Decision::Deny { redirect: None } => {
            RenderedBody::Markup(denial_fragment(settings, directory).render())
        }
    }
}

/// Replaces the title of a denied item with the denial heading.
pub fn filter_title(
    broker: &AccessBroker,
    directory: &dyn ContentDirectory,
    settings: &GateSettings,
    title: String,
    actor: &Actor,
) -> String {
    let normalized = normalize_title(&title);
    if normalized.is_empty() {
        return title;
    }
    match directory.find_by_title(&normalized) {
        Some(id) if !broker.is_visible(id, actor) => settings.denial.heading.clone(),
        _ => title,
    }
}

fn normalize_title(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("&#038;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_normalization_collapses_whitespace_and_entities() {
        assert_eq!(normalize_title("  Tips &#038;\n Tricks "), "Tips & Tricks");
    }
}
