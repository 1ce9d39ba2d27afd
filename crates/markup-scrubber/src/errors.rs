use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrubError {
    #[error("malformed markup near byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
}

pub type ScrubResult<T> = Result<T, ScrubError>;
