use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct GateSettings {
    pub rev: u64,
    pub meta: MetaSettings,
    pub roles: RoleSettings,
    pub denial: DenialCopy,
    pub notice: NoticeSettings,
    pub redirect: RedirectSettings,
    pub features: FeatureFlags,
    pub provenance: HashMap<String, SettingProvenance>,
}

/// Naming of the per-content metadata fields and the editor form.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct MetaSettings {
    pub prefix: String,
}

impl MetaSettings {
    pub fn restrict_access_key(&self) -> String {
        format!("{}_restrict_access", self.prefix)
    }

    pub fn select_role_key(&self) -> String {
        format!("{}_select_role", self.prefix)
    }

    pub fn redirect_url_key(&self) -> String {
        format!("{}_redirect_url", self.prefix)
    }

    /// Action name the editor form token is bound to.
    pub fn nonce_action(&self) -> String {
        self.select_role_key()
    }

    pub fn nonce_field(&self) -> String {
        format!("{}_select_role_wpnonce", self.prefix)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RoleSettings {
    /// Roles that bypass every restriction check.
    pub privileged: Vec<String>,
    /// Built-in roles left out of the editor's role picker.
    pub hidden_from_picker: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DenialCopy {
    pub heading: String,
    pub message: String,
    pub back_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct NoticeSettings {
    pub query_var: String,
    pub query_value: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RedirectSettings {
    pub status: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct FeatureFlags {
    pub strip_hard_links: bool,
    pub page_list: bool,
    pub recent_items: bool,
    pub search_filter: bool,
    pub restrict_titles: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SettingProvenance {
    pub path: String,
    pub source: SettingSource,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SettingSource {
    Builtin,
    File,
    Env,
    RuntimeOverride,
}

impl GateSettings {
    pub fn set_provenance(&mut self, path: &str, source: SettingSource) {
        self.provenance.insert(
            path.to_string(),
            SettingProvenance {
                path: path.to_string(),
                source,
            },
        );
    }

    pub fn source_of(&self, path: &str) -> Option<SettingSource> {
        self.provenance.get(path).map(|entry| entry.source)
    }
}
