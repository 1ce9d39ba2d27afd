pub mod anchors;
pub mod errors;
pub mod fragment;
pub mod listing;
pub mod recent;
pub mod report;
pub mod tree;

pub use anchors::scrub_anchors;
pub use errors::{ScrubError, ScrubResult};
pub use fragment::DenialFragment;
pub use listing::{scrub_menu, scrub_page_list, MenuEntry};
pub use recent::{scrub_recent, RecentItem};
pub use report::{ScrubReport, Scrubbed};
pub use tree::{Element, MarkupTree, NodeId};
