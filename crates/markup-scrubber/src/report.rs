use rolegate_core_types::ContentId;
use serde::{Deserialize, Serialize};

/// What a scrubbing pass did, for logging and tests.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ScrubReport {
    pub applied: bool,
    pub removed: Vec<ContentId>,
    pub reason: Option<String>,
}

impl ScrubReport {
    pub fn skipped(reason: &str) -> Self {
        Self {
            applied: false,
            removed: vec![],
            reason: Some(reason.to_string()),
        }
    }

    pub(crate) fn applied(removed: Vec<ContentId>) -> Self {
        Self {
            applied: true,
            removed,
            reason: None,
        }
    }
}

/// Scrubbed markup together with its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scrubbed {
    pub output: String,
    pub report: ScrubReport,
}

impl Scrubbed {
    pub(crate) fn untouched(markup: &str, reason: &str) -> Self {
        Self {
            output: markup.to_string(),
            report: ScrubReport::skipped(reason),
        }
    }
}
