pub mod api;
pub mod defaults;
pub mod errors;
pub mod loader;
pub mod model;

pub use api::SettingsCenter;
pub use defaults::default_settings;
pub use errors::SettingsError;
pub use loader::{load_settings, load_settings_with_options, LoadOptions};
pub use model::{
    DenialCopy, FeatureFlags, GateSettings, MetaSettings, NoticeSettings, RedirectSettings,
    RoleSettings, SettingSource,
};

#[cfg(test)]
mod tests;
