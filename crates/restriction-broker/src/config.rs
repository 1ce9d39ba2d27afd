//! Restriction metadata attached to a single content item.

use std::collections::BTreeSet;

use rolegate_core_types::{ContentId, RoleName};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::stores::{MetaValue, MetadataStore};
use crate::BrokerError;

/// Names of the three metadata fields that make up a restriction record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaKeys {
    pub restrict_access: String,
    pub select_role: String,
    pub redirect_url: String,
}

impl MetaKeys {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            restrict_access: format!("{prefix}_restrict_access"),
            select_role: format!("{prefix}_select_role"),
            redirect_url: format!("{prefix}_redirect_url"),
        }
    }
}

impl Default for MetaKeys {
    fn default() -> Self {
        Self::with_prefix("pcr-rpbr")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionConfig {
    pub enabled: bool,
    pub allowed_roles: BTreeSet<RoleName>,
    pub redirect_url: Option<String>,
}

impl RestrictionConfig {
    /// Enabled with at least one role; anything else admits everyone.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.allowed_roles.is_empty()
    }

    /// The stored redirect target, if it still parses as an absolute URL.
    pub fn redirect_target(&self) -> Option<Url> {
        self.redirect_url.as_deref().and_then(parse_absolute_url)
    }

    /// Reads the record for `id`. Absent or malformed fields read as unrestricted.
    pub fn load(store: &dyn MetadataStore, keys: &MetaKeys, id: ContentId) -> Self {
        let enabled = store
            .get(id, &keys.restrict_access)
            .map(|value| flag_from_meta(&value))
            .unwrap_or(false);
        let allowed_roles = store
            .get(id, &keys.select_role)
            .map(|value| roles_from_meta(&value))
            .unwrap_or_default();
        let redirect_url = match store.get(id, &keys.redirect_url) {
            Some(MetaValue::Text(url)) if !url.trim().is_empty() => Some(url),
            _ => None,
        };
        Self {
            enabled,
            allowed_roles,
            redirect_url,
        }
    }

    /// Only the enabled flag, without touching the other fields.
    pub fn load_enabled(store: &dyn MetadataStore, keys: &MetaKeys, id: ContentId) -> bool {
        store
            .get(id, &keys.restrict_access)
            .map(|value| flag_from_meta(&value))
            .unwrap_or(false)
    }

    /// Upserts the record. Empty role sets and missing redirects are stored as absence.
    pub fn store(
        &self,
        store: &dyn MetadataStore,
        keys: &MetaKeys,
        id: ContentId,
    ) -> Result<(), BrokerError> {
        store.set(id, &keys.restrict_access, MetaValue::Flag(self.enabled))?;
        if self.allowed_roles.is_empty() {
            store.delete(id, &keys.select_role)?;
        } else {
            let roles = self
                .allowed_roles
                .iter()
                .map(|role| role.as_str().to_string())
                .collect();
            store.set(id, &keys.select_role, MetaValue::List(roles))?;
        }
        match &self.redirect_url {
            Some(url) => store.set(id, &keys.redirect_url, MetaValue::Text(url.clone()))?,
            None => store.delete(id, &keys.redirect_url)?,
        }
        Ok(())
    }
}

pub(crate) fn flag_from_meta(value: &MetaValue) -> bool {
    match value {
        MetaValue::Flag(flag) => *flag,
        MetaValue::Text(raw) => matches!(raw.trim(), "1" | "true" | "yes" | "on"),
        MetaValue::List(_) => false,
    }
}

pub(crate) fn roles_from_meta(value: &MetaValue) -> BTreeSet<RoleName> {
    match value {
        MetaValue::List(items) => items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(RoleName::from)
            .collect(),
        MetaValue::Text(raw) if !raw.trim().is_empty() => {
            BTreeSet::from([RoleName::from(raw.trim())])
        }
        _ => BTreeSet::new(),
    }
}

/// Why a redirect target was refused at save time.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RedirectRejection {
    #[error("redirect url is not an absolute url")]
    Malformed,
    #[error("redirect url points back at the restricted item")]
    SelfRedirect,
}

pub fn parse_absolute_url(raw: &str) -> Option<Url> {
    let parsed = Url::parse(raw.trim()).ok()?;
    if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
        return None;
    }
    Some(parsed)
}

/// Checks a submitted redirect target against the item's own permalink.
pub fn validate_redirect(raw: &str, permalink: Option<&str>) -> Result<Url, RedirectRejection> {
    let target = parse_absolute_url(raw).ok_or(RedirectRejection::Malformed)?;
    if let Some(permalink) = permalink {
        let same_text = raw.trim() == permalink.trim();
        let same_url = parse_absolute_url(permalink)
            .map(|own| same_location(&own, &target))
            .unwrap_or(false);
        if same_text || same_url {
            return Err(RedirectRejection::SelfRedirect);
        }
    }
    Ok(target)
}

fn same_location(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
        && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
        && a.query() == b.query()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMetadataStore;

    #[test]
    fn redirect_must_be_absolute() {
        assert_eq!(
            validate_redirect("/members", None),
            Err(RedirectRejection::Malformed)
        );
        assert_eq!(
            validate_redirect("not a url", None),
            Err(RedirectRejection::Malformed)
        );
        assert!(validate_redirect("https://example.com/join", None).is_ok());
    }

    #[test]
    fn redirect_to_own_permalink_is_rejected() {
        let own = "https://example.com/members/";
        assert_eq!(
            validate_redirect(own, Some(own)),
            Err(RedirectRejection::SelfRedirect)
        );
        assert_eq!(
            validate_redirect("https://example.com/members", Some(own)),
            Err(RedirectRejection::SelfRedirect)
        );
        assert!(validate_redirect("https://example.com/join", Some(own)).is_ok());
    }

    #[test]
    fn store_then_load_keeps_roles_and_flag() {
        let store = InMemoryMetadataStore::new();
        let keys = MetaKeys::default();
        let id = ContentId(7);
        let config = RestrictionConfig {
            enabled: true,
            allowed_roles: BTreeSet::from([RoleName::from("reviewer")]),
            redirect_url: None,
        };
        config.store(&store, &keys, id).unwrap();

        assert_eq!(RestrictionConfig::load(&store, &keys, id), config);
        assert_eq!(store.get(id, &keys.redirect_url), None);
    }

    #[test]
    fn empty_roles_are_stored_as_absence() {
        let store = InMemoryMetadataStore::new();
        let keys = MetaKeys::default();
        let id = ContentId(3);
        store
            .set(id, &keys.select_role, MetaValue::List(vec!["member".into()]))
            .unwrap();

        RestrictionConfig {
            enabled: true,
            ..Default::default()
        }
        .store(&store, &keys, id)
        .unwrap();

        assert_eq!(store.get(id, &keys.select_role), None);
        assert!(!RestrictionConfig::load(&store, &keys, id).is_active());
    }

    #[test]
    fn legacy_text_values_are_understood() {
        assert!(flag_from_meta(&MetaValue::Text("1".into())));
        assert!(!flag_from_meta(&MetaValue::Text("0".into())));
        assert_eq!(
            roles_from_meta(&MetaValue::Text("member".into())),
            BTreeSet::from([RoleName::from("member")])
        );
    }
}
