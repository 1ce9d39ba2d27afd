//! Error surface of the plugin service.

use restriction_broker::BrokerError;
use rolegate_core_types::GateError;
use rolegate_policy_center::SettingsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub type PluginResult<T> = Result<T, PluginError>;

impl From<PluginError> for GateError {
    fn from(value: PluginError) -> Self {
        GateError::new(value.to_string())
    }
}
