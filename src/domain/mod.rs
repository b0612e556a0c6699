pub mod feed;
pub mod snapshot;
pub mod state;

pub use feed::{default_feeds, FeedDescriptor};
pub use snapshot::{Snapshot, VersionRecord};
pub use state::{Lifecycle, PollStatus};
