use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{apply_override_to_settings, SETTING_PATHS};
use crate::defaults::default_settings;
use crate::errors::SettingsError;
use crate::model::{GateSettings, SettingSource};

const ENV_PREFIX: &str = "ROLEGATE__";
const ENV_JSON: &str = "ROLEGATE_SETTINGS_JSON";

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

impl LoadOptions {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
            include_env: true,
        }
    }
}

/// Where a settings value came from. Errors name it so a bad key can be found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    File { path: PathBuf, key: String },
    EnvVar(String),
    EnvJson(String),
}

impl Origin {
    fn source(&self) -> SettingSource {
        match self {
            Origin::File { .. } => SettingSource::File,
            Origin::EnvVar(_) | Origin::EnvJson(_) => SettingSource::Env,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File { path, key } => write!(f, "{} (key `{}`)", path.display(), key),
            Origin::EnvVar(name) => write!(f, "env {name}"),
            Origin::EnvJson(key) => write!(f, "env {ENV_JSON} (key `{key}`)"),
        }
    }
}

/// One `section.field` value waiting to be applied.
#[derive(Debug)]
struct Assignment {
    path: String,
    value: Value,
    origin: Origin,
}

pub fn load_settings(path: Option<&Path>) -> Result<GateSettings, SettingsError> {
    let options = LoadOptions {
        paths: path.map(Path::to_path_buf).into_iter().collect(),
        include_env: true,
    };
    load_settings_with_options(&options)
}

/// Builtin defaults, then each file in order, then the environment. Later layers win.
pub fn load_settings_with_options(options: &LoadOptions) -> Result<GateSettings, SettingsError> {
    let mut settings = default_settings();
    for path in SETTING_PATHS {
        settings.set_provenance(path, SettingSource::Builtin);
    }

    for path in &options.paths {
        if !path.exists() {
            debug!(target = "rolegate-settings", path = %path.display(), "settings file absent, skipped");
            continue;
        }
        apply_all(&mut settings, file_assignments(path)?)?;
    }

    if options.include_env {
        apply_all(&mut settings, env_assignments()?)?;
    }

    Ok(settings)
}

fn apply_all(settings: &mut GateSettings, assignments: Vec<Assignment>) -> Result<(), SettingsError> {
    for assignment in assignments {
        apply_override_to_settings(
            settings,
            &assignment.path,
            &assignment.value,
            assignment.origin.source(),
        )
        .map_err(|err| SettingsError::Rejected {
            origin: assignment.origin.to_string(),
            reason: err.to_string(),
        })?;
    }
    Ok(())
}

fn file_assignments(path: &Path) -> Result<Vec<Assignment>, SettingsError> {
    let content = fs::read_to_string(path)
        .map_err(|err| SettingsError::Io(format!("{}: {err}", path.display())))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let document: Value = if is_json {
        serde_json::from_str(&content)
            .map_err(|err| SettingsError::Invalid(format!("{}: {err}", path.display())))?
    } else {
        let yaml: serde_yaml::Value = serde_yaml::from_str(&content)
            .map_err(|err| SettingsError::Invalid(format!("{}: {err}", path.display())))?;
        serde_json::to_value(yaml)
            .map_err(|err| SettingsError::Invalid(format!("{}: {err}", path.display())))?
    };

    document_assignments(document, |key| Origin::File {
        path: path.to_path_buf(),
        key: key.to_string(),
    })
}

/// Reads a `{ section: { field: value } }` document. Sections and fields are checked
/// against the known settings paths as they are read.
fn document_assignments<F>(document: Value, origin_of: F) -> Result<Vec<Assignment>, SettingsError>
where
    F: Fn(&str) -> Origin,
{
    let sections = match document {
        Value::Object(sections) => sections,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(SettingsError::Rejected {
                origin: origin_of("").to_string(),
                reason: format!("expected a map of sections, got {other}"),
            })
        }
    };

    let mut assignments = Vec::new();
    for (section, fields) in sections {
        let section = section.trim().to_ascii_lowercase();
        let fields: Map<String, Value> = match fields {
            Value::Object(fields) => fields,
            Value::Null => continue,
            other => {
                return Err(SettingsError::Rejected {
                    origin: origin_of(&section).to_string(),
                    reason: format!("section must be a map, got {other}"),
                })
            }
        };
        for (field, value) in fields {
            let path = format!("{section}.{}", field.trim().to_ascii_lowercase());
            let origin = origin_of(&path);
            if !SETTING_PATHS.contains(&path.as_str()) {
                return Err(SettingsError::Rejected {
                    origin: origin.to_string(),
                    reason: SettingsError::UnsupportedPath(path).to_string(),
                });
            }
            if value.is_object() {
                return Err(SettingsError::Rejected {
                    origin: origin.to_string(),
                    reason: "nested maps are not settings values".into(),
                });
            }
            assignments.push(Assignment {
                path,
                value,
                origin,
            });
        }
    }
    Ok(assignments)
}

/// `ROLEGATE__SECTION__FIELD` variables in name order, then the JSON blob.
fn env_assignments() -> Result<Vec<Assignment>, SettingsError> {
    let vars: BTreeMap<String, String> = env::vars()
        .filter(|(name, _)| name.starts_with(ENV_PREFIX))
        .collect();

    let mut assignments = Vec::new();
    for (name, raw) in vars {
        let origin = Origin::EnvVar(name.clone());
        let segments: Vec<String> = name[ENV_PREFIX.len()..]
            .split("__")
            .map(str::to_ascii_lowercase)
            .collect();
        let [section, field] = segments.as_slice() else {
            return Err(SettingsError::Rejected {
                origin: origin.to_string(),
                reason: format!("expected {ENV_PREFIX}SECTION__FIELD"),
            });
        };
        assignments.push(Assignment {
            path: format!("{section}.{field}"),
            value: env_value(&raw),
            origin,
        });
    }

    if let Ok(raw) = env::var(ENV_JSON) {
        if !raw.trim().is_empty() {
            let document: Value = serde_json::from_str(&raw)
                .map_err(|err| SettingsError::Invalid(format!("{ENV_JSON}: {err}")))?;
            assignments.extend(document_assignments(document, |key| {
                Origin::EnvJson(key.to_string())
            })?);
        }
    }
    Ok(assignments)
}

/// JSON literals (`true`, `307`, `["a"]`) keep their type; anything else is a string.
fn env_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
