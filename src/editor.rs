//! Restriction panel on the content editing screen, and its save path.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use quick_xml::escape::escape;
use restriction_broker::{
    validate_redirect, ContentDirectory, MetaKeys, MetadataStore, RedirectRejection,
    RestrictionConfig, RoleInfo, RoleStore,
};
use rolegate_core_types::{ContentId, RoleName};
use rolegate_policy_center::{GateSettings, NoticeSettings};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::errors::PluginResult;
use crate::nonce::NonceVerifier;

/// Values posted back from the restriction panel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSubmission {
    pub nonce: Option<String>,
    pub restrict_access: bool,
    pub roles: Vec<String>,
    pub redirect_url: Option<String>,
}

impl EditorSubmission {
    /// Builds a submission from raw form pairs, using the field names the panel renders.
    pub fn from_form<'a, I>(pairs: I, settings: &GateSettings) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let nonce_field = settings.meta.nonce_field();
        let restrict_field = settings.meta.restrict_access_key();
        let role_field = settings.meta.select_role_key();
        let role_list_field = format!("{role_field}[]");
        let redirect_field = settings.meta.redirect_url_key();

        let mut submission = Self::default();
        for (name, value) in pairs {
            if name == nonce_field {
                submission.nonce = Some(value.to_string());
            } else if name == restrict_field {
                submission.restrict_access = !matches!(value.trim(), "" | "0");
            } else if name == role_field || name == role_list_field {
                submission.roles.push(value.to_string());
            } else if name == redirect_field {
                submission.redirect_url = Some(value.to_string());
            }
        }
        submission
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Autosave,
    InvalidToken,
}

/// What happened to the redirect field during a save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedirectField {
    Cleared,
    Stored(String),
    /// Not written; any earlier value stays as it was.
    Rejected(RedirectRejection),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Skipped(SkipReason),
    Saved {
        enabled: bool,
        roles: BTreeSet<RoleName>,
        redirect: RedirectField,
    },
}

impl SaveOutcome {
    /// True when the next admin screen must show the invalid-URL notice.
    pub fn needs_notice(&self) -> bool {
        matches!(
            self,
            SaveOutcome::Saved {
                redirect: RedirectField::Rejected(_),
                ..
            }
        )
    }
}

/// Borrowed view over the collaborators the editor screen needs.
pub struct EditorExtension<'a> {
    pub metadata: &'a dyn MetadataStore,
    pub directory: &'a dyn ContentDirectory,
    pub roles: &'a dyn RoleStore,
    pub nonces: &'a dyn NonceVerifier,
    pub settings: &'a GateSettings,
}

impl EditorExtension<'_> {
    fn keys(&self) -> MetaKeys {
        MetaKeys::with_prefix(&self.settings.meta.prefix)
    }

    pub fn render_panel(&self, id: ContentId) -> String {
        let meta = &self.settings.meta;
        let prefix = escape(&meta.prefix);
        let current = RestrictionConfig::load(self.metadata, &self.keys(), id);
        let token = self.nonces.issue(&meta.nonce_action());
        let checked = if current.enabled {
            " checked='checked'"
        } else {
            ""
        };
        let redirect = current.redirect_url.as_deref().unwrap_or_default();

        let mut html = String::new();
        html.push_str(r#"<div class="misc-pub-section public-post-preview">"#);
        let _ = write!(
            html,
            r#"<input type="hidden" id="{field}" name="{field}" value="{token}" />"#,
            field = escape(&meta.nonce_field()),
            token = escape(&token),
        );
        html.push_str("<p><strong>Restrict access by role?</strong></p>");
        let _ = write!(
            html,
            r#"<input type="checkbox" name="{prefix}_restrict_access" value="1" class="{prefix}_restrict_access"{checked}> Yes?"#,
        );
        let _ = write!(html, r#"<div class="{prefix}_box-select-role">"#);
        html.push_str("<p><strong>Select a role</strong></p>");
        let _ = write!(
            html,
            r#"<label class="screen-reader-text" for="{prefix}_select_role">Select role</label>"#,
        );
        let _ = write!(
            html,
            r#"<select name="{prefix}_select_role[]" id="{prefix}_select_role" class="{prefix}_select_role" multiple="multiple">"#,
        );
        html.push_str(&self.role_options(&current.allowed_roles));
        html.push_str("</select>");
        html.push_str("<p><strong>Specify Redirect URL</strong></p>");
        let _ = write!(
            html,
            r#"<label class="screen-reader-text" for="{prefix}_redirect_url">Redirect URL</label>"#,
        );
        let _ = write!(
            html,
            r#"<input type="text" name="{prefix}_redirect_url" value="{value}" class="{prefix}_redirect_url">"#,
            value = escape(redirect),
        );
        html.push_str("</div></div>");
        html
    }

    /// Assignable roles minus the built-ins, selected ones first, each group by name.
    pub fn role_options(&self, selected: &BTreeSet<RoleName>) -> String {
        let hidden = &self.settings.roles.hidden_from_picker;
        let mut roles: Vec<RoleInfo> = self
            .roles
            .assignable_roles()
            .into_iter()
            .filter(|role| !hidden.iter().any(|name| name == role.slug.as_str()))
            .collect();
        roles.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let (chosen, rest): (Vec<&RoleInfo>, Vec<&RoleInfo>) =
            roles.iter().partition(|role| selected.contains(&role.slug));

        let mut out = String::new();
        for role in chosen {
            let _ = write!(
                out,
                "\n\t<option selected='selected' value='{}'>{}</option>",
                escape(role.slug.as_str()),
                escape(&role.display_name)
            );
        }
        for role in rest {
            let _ = write!(
                out,
                "\n\t<option value='{}'>{}</option>",
                escape(role.slug.as_str()),
                escape(&role.display_name)
            );
        }
        out
    }

    pub fn save(
        &self,
        id: ContentId,
        submission: &EditorSubmission,
        autosave: bool,
    ) -> PluginResult<SaveOutcome> {
        if autosave {
            debug!(target = "rolegate", content = %id, "autosave ignored");
            return Ok(SaveOutcome::Skipped(SkipReason::Autosave));
        }

        let action = self.settings.meta.nonce_action();
        let token_ok = submission
            .nonce
            .as_deref()
            .map(|token| self.nonces.verify(&action, token))
            .unwrap_or(false);
        if !token_ok {
            debug!(target = "rolegate", content = %id, "save without a valid form token ignored");
            return Ok(SaveOutcome::Skipped(SkipReason::InvalidToken));
        }

        let keys = self.keys();
        let roles: BTreeSet<RoleName> = submission
            .roles
            .iter()
            .map(|role| role.trim())
            .filter(|role| !role.is_empty())
            .map(RoleName::from)
            .collect();

        let requested = submission
            .redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty());
        let (redirect, redirect_url) = match requested {
            None => (RedirectField::Cleared, None),
            Some(raw) => {
                let permalink = self.directory.permalink(id);
                match validate_redirect(raw, permalink.as_deref()) {
                    Ok(_) => (RedirectField::Stored(raw.to_string()), Some(raw.to_string())),
                    Err(rejection) => {
                        info!(target = "rolegate", content = %id, %rejection, "redirect url rejected");
                        let kept = RestrictionConfig::load(self.metadata, &keys, id).redirect_url;
                        (RedirectField::Rejected(rejection), kept)
                    }
                }
            }
        };

        let enabled = submission.restrict_access;
        RestrictionConfig {
            enabled,
            allowed_roles: roles.clone(),
            redirect_url,
        }
        .store(self.metadata, &keys, id)?;

        Ok(SaveOutcome::Saved {
            enabled,
            roles,
            redirect,
        })
    }
}

/// Appends the one-shot notice flag to the post-save location.
pub fn add_notice_query_var(location: &str, notice: &NoticeSettings) -> String {
    match Url::parse(location) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair(&notice.query_var, &notice.query_value);
            url.to_string()
        }
        Err(_) => {
            let separator = if location.contains('?') { '&' } else { '?' };
            format!(
                "{location}{separator}{}={}",
                notice.query_var, notice.query_value
            )
        }
    }
}

/// The invalid-URL notice, only when the flag is present in the request query.
pub fn render_admin_notice(
    query: &BTreeMap<String, String>,
    notice: &NoticeSettings,
) -> Option<String> {
    if !query.contains_key(&notice.query_var) {
        return None;
    }
    Some(format!(
        r#"<div class="error"><p>{}</p></div>"#,
        escape(&notice.message)
    ))
}
