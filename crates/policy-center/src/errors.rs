use rolegate_core_types::GateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("unsupported settings path: {0}")]
    UnsupportedPath(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("{origin}: {reason}")]
    Rejected { origin: String, reason: String },
}

impl From<SettingsError> for GateError {
    fn from(value: SettingsError) -> Self {
        GateError::new(value.to_string())
    }
}
