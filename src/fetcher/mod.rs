pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::FetchError;
use crate::domain::{FeedDescriptor, Snapshot};

/// Produces the latest-item snapshot of a feed.
///
/// Implementations never retry; the next poll cycle is the retry.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, feed: &FeedDescriptor) -> Result<Snapshot, FetchError>;
}
