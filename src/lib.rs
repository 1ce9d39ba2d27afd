//! Rolegate library
//!
//! Role-restricted pages and posts: the plugin service and the filters it
//! registers on a host's hooks.

pub mod content;
pub mod editor;
pub mod errors;
pub mod nonce;
pub mod plugin;
pub mod search;
pub mod telemetry;

pub use content::{RedirectTarget, RenderedBody};
pub use editor::{EditorExtension, EditorSubmission, RedirectField, SaveOutcome, SkipReason};
pub use errors::{PluginError, PluginResult};
pub use nonce::{NonceVerifier, SessionNonces};
pub use plugin::{hooks, Collaborators, HookPayload, RequestScope, RestrictPlugin};
pub use search::ContentQuery;
