use crate::api::{apply_override_to_settings, SettingsCenter, SETTING_PATHS};
use crate::defaults::default_settings;
use crate::loader::{load_settings, LoadOptions};
use crate::model::SettingSource;
use std::env;
use std::sync::{Mutex, OnceLock};

#[test]
fn default_settings_match_builtin_roles() {
    let settings = default_settings();
    assert_eq!(settings.roles.privileged, vec!["administrator", "editor"]);
    assert_eq!(settings.meta.restrict_access_key(), "pcr-rpbr_restrict_access");
    assert_eq!(settings.meta.nonce_field(), "pcr-rpbr_select_role_wpnonce");
    assert_eq!(settings.redirect.status, 302);
}

#[test]
fn load_settings_applies_file_overlay() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("rolegate.yaml");
    std::fs::write(
        &file_path,
        r#"roles:
  privileged:
    - administrator
    - site_manager
denial:
  heading: Members only
features:
  page_list: true
"#,
    )
    .unwrap();

    let settings = load_settings(Some(&file_path)).unwrap();
    assert_eq!(settings.roles.privileged, vec!["administrator", "site_manager"]);
    assert_eq!(settings.denial.heading, "Members only");
    assert!(settings.features.page_list);
    assert_eq!(settings.source_of("denial.heading"), Some(SettingSource::File));
    assert_eq!(settings.source_of("denial.message"), Some(SettingSource::Builtin));
}

#[test]
fn unknown_file_keys_are_rejected() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("rolegate.yaml");
    std::fs::write(&file_path, "features:\n  teleport: true\n").unwrap();

    let err = load_settings(Some(&file_path)).unwrap_err();
    assert!(err.to_string().contains("features.teleport"));
}

#[test]
fn env_overlay_wins_over_defaults() {
    let _guard = env_guard().lock().unwrap();
    let key = "ROLEGATE__ROLES__HIDDEN_FROM_PICKER";
    env::set_var(key, "administrator,editor");
    let settings = load_settings(None).expect("load settings");
    env::remove_var(key);
    assert_eq!(settings.roles.hidden_from_picker, vec!["administrator", "editor"]);
    assert_eq!(
        settings.source_of("roles.hidden_from_picker"),
        Some(SettingSource::Env)
    );
}

#[test]
fn json_env_blob_is_flattened() {
    let _guard = env_guard().lock().unwrap();
    env::set_var(
        "ROLEGATE_SETTINGS_JSON",
        r#"{"redirect":{"status":307},"features":{"restrict_titles":true}}"#,
    );
    let settings = load_settings(None).expect("load settings with json blob");
    env::remove_var("ROLEGATE_SETTINGS_JSON");
    assert_eq!(settings.redirect.status, 307);
    assert!(settings.features.restrict_titles);
}

#[test]
fn non_redirect_status_is_invalid() {
    let center = SettingsCenter::new(default_settings());
    let result = center.apply_override("redirect.status", serde_json::json!(200));
    assert!(result.is_err());
    assert_eq!(center.snapshot().redirect.status, 302);
}

#[test]
fn override_bumps_revision_and_records_source() {
    let center = SettingsCenter::new(default_settings());
    let before = center.revision();
    let rev = center
        .apply_override("features.search_filter", serde_json::json!(false))
        .unwrap();
    assert_eq!(rev, before + 1);

    let snapshot = center.snapshot();
    assert!(!snapshot.features.search_filter);
    assert_eq!(
        snapshot.source_of("features.search_filter"),
        Some(SettingSource::RuntimeOverride)
    );
}

#[test]
fn reload_picks_up_file_changes() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("rolegate.yaml");
    std::fs::write(&file_path, "denial:\n  heading: First\n").unwrap();

    let center = SettingsCenter::load(LoadOptions::with_path(&file_path)).unwrap();
    assert_eq!(center.snapshot().denial.heading, "First");

    std::fs::write(&file_path, "denial:\n  heading: Second\n").unwrap();
    let rev = center.reload().unwrap();
    assert_eq!(rev, 2);
    assert_eq!(center.snapshot().denial.heading, "Second");
}

#[test]
fn every_known_path_takes_its_builtin_value() {
    let defaults = default_settings();
    let document = serde_json::to_value(&defaults).unwrap();
    for path in SETTING_PATHS {
        let pointer = format!("/{}", path.replace('.', "/"));
        let value = document.pointer(&pointer).cloned().unwrap();
        let mut settings = defaults.clone();
        apply_override_to_settings(&mut settings, path, &value, SettingSource::File).unwrap();
        assert_eq!(settings.source_of(path), Some(SettingSource::File), "{path}");
    }
}

#[test]
fn builtin_provenance_covers_every_path() {
    let _guard = env_guard().lock().unwrap();
    let settings = load_settings(None).unwrap();
    for path in SETTING_PATHS {
        assert_eq!(settings.source_of(path), Some(SettingSource::Builtin), "{path}");
    }
}

#[test]
fn bad_env_value_names_the_variable() {
    let _guard = env_guard().lock().unwrap();
    let key = "ROLEGATE__REDIRECT__STATUS";
    env::set_var(key, "200");
    let err = load_settings(None).unwrap_err();
    env::remove_var(key);
    let message = err.to_string();
    assert!(message.contains("env ROLEGATE__REDIRECT__STATUS"), "{message}");
    assert!(message.contains("not a 3xx code"), "{message}");
}

#[test]
fn malformed_env_name_is_rejected() {
    let _guard = env_guard().lock().unwrap();
    let key = "ROLEGATE__FEATURES";
    env::set_var(key, "true");
    let err = load_settings(None).unwrap_err();
    env::remove_var(key);
    assert!(err.to_string().contains("SECTION__FIELD"));
}

#[test]
fn json_file_is_read_by_extension() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("rolegate.json");
    std::fs::write(&file_path, r#"{"notice": {"message": "Bad redirect"}}"#).unwrap();

    let settings = load_settings(Some(&file_path)).unwrap();
    assert_eq!(settings.notice.message, "Bad redirect");
    assert_eq!(settings.source_of("notice.message"), Some(SettingSource::File));
}

fn env_guard() -> &'static Mutex<()> {
    static ENV_GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_GUARD.get_or_init(|| Mutex::new(()))
}
