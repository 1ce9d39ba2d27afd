use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;
use tracing::debug;

use crate::errors::SettingsError;
use crate::loader::{load_settings_with_options, LoadOptions};
use crate::model::{GateSettings, SettingSource};

/// Holds the active settings snapshot and swaps it atomically on reload.
pub struct SettingsCenter {
    options: LoadOptions,
    current: ArcSwap<GateSettings>,
}

impl SettingsCenter {
    /// Wraps an already-built snapshot; `reload` falls back to builtin defaults.
    pub fn new(settings: GateSettings) -> Self {
        Self {
            options: LoadOptions::default(),
            current: ArcSwap::from_pointee(settings),
        }
    }

    pub fn load(options: LoadOptions) -> Result<Self, SettingsError> {
        let settings = load_settings_with_options(&options)?;
        Ok(Self {
            options,
            current: ArcSwap::from_pointee(settings),
        })
    }

    pub fn snapshot(&self) -> Arc<GateSettings> {
        self.current.load_full()
    }

    pub fn revision(&self) -> u64 {
        self.current.load().rev
    }

    /// Re-reads every configured source and publishes the result under a new revision.
    pub fn reload(&self) -> Result<u64, SettingsError> {
        let mut fresh = load_settings_with_options(&self.options)?;
        fresh.rev = self.revision().saturating_add(1);
        let rev = fresh.rev;
        self.current.store(Arc::new(fresh));
        debug!(target = "rolegate-settings", rev, "settings reloaded");
        Ok(rev)
    }

    pub fn apply_override(&self, path: &str, value: Value) -> Result<u64, SettingsError> {
        let mut next = GateSettings::clone(&self.current.load());
        apply_override_to_settings(&mut next, path, &value, SettingSource::RuntimeOverride)?;
        next.rev = next.rev.saturating_add(1);
        let rev = next.rev;
        self.current.store(Arc::new(next));
        Ok(rev)
    }
}

/// Every path `apply_override_to_settings` accepts.
pub(crate) const SETTING_PATHS: &[&str] = &[
    "meta.prefix",
    "roles.privileged",
    "roles.hidden_from_picker",
    "denial.heading",
    "denial.message",
    "denial.back_label",
    "notice.query_var",
    "notice.query_value",
    "notice.message",
    "redirect.status",
    "features.strip_hard_links",
    "features.page_list",
    "features.recent_items",
    "features.search_filter",
    "features.restrict_titles",
];

pub(crate) fn apply_override_to_settings(
    settings: &mut GateSettings,
    path: &str,
    value: &Value,
    source: SettingSource,
) -> Result<(), SettingsError> {
    match path {
        "meta.prefix" => settings.meta.prefix = to_non_empty_string(value)?,
        "roles.privileged" => settings.roles.privileged = to_string_list(value)?,
        "roles.hidden_from_picker" => settings.roles.hidden_from_picker = to_string_list(value)?,
        "denial.heading" => settings.denial.heading = to_string(value)?,
        "denial.message" => settings.denial.message = to_string(value)?,
        "denial.back_label" => settings.denial.back_label = to_string(value)?,
        "notice.query_var" => settings.notice.query_var = to_non_empty_string(value)?,
        "notice.query_value" => settings.notice.query_value = to_string(value)?,
        "notice.message" => settings.notice.message = to_string(value)?,
        "redirect.status" => settings.redirect.status = to_redirect_status(value)?,
        "features.strip_hard_links" => settings.features.strip_hard_links = to_bool(value)?,
        "features.page_list" => settings.features.page_list = to_bool(value)?,
        "features.recent_items" => settings.features.recent_items = to_bool(value)?,
        "features.search_filter" => settings.features.search_filter = to_bool(value)?,
        "features.restrict_titles" => settings.features.restrict_titles = to_bool(value)?,
        path => return Err(SettingsError::UnsupportedPath(path.to_string())),
    }
    settings.set_provenance(path, source);
    Ok(())
}

fn to_string(value: &Value) -> Result<String, SettingsError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(SettingsError::InvalidValue(format!(
            "expected string, got {other}"
        ))),
    }
}

fn to_non_empty_string(value: &Value) -> Result<String, SettingsError> {
    let s = to_string(value)?;
    if s.trim().is_empty() {
        return Err(SettingsError::InvalidValue("value must not be empty".into()));
    }
    Ok(s)
}

/// Accepts a JSON array of strings or a comma separated string.
fn to_string_list(value: &Value) -> Result<Vec<String>, SettingsError> {
    match value {
        Value::Array(items) => items.iter().map(to_string).collect(),
        Value::String(raw) => Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(SettingsError::InvalidValue(format!(
            "expected list of strings, got {other}"
        ))),
    }
}

fn to_redirect_status(value: &Value) -> Result<u16, SettingsError> {
    let status = value
        .as_u64()
        .ok_or_else(|| SettingsError::InvalidValue(format!("expected integer, got {value}")))?;
    if (300..400).contains(&status) {
        Ok(status as u16)
    } else {
        Err(SettingsError::InvalidValue(format!(
            "redirect status {status} is not a 3xx code"
        )))
    }
}

fn to_bool(value: &Value) -> Result<bool, SettingsError> {
    value
        .as_bool()
        .ok_or_else(|| SettingsError::InvalidValue(format!("expected bool, got {value}")))
}
