use crate::domain::{FeedDescriptor, Snapshot};

pub const DEFAULT_BANNER: &str = "Minecraft Feedback 发布了新的文章：";

/// One change, one message. Title always precedes the URL.
pub fn format_message(banner: &str, feed: &FeedDescriptor, snapshot: &Snapshot) -> String {
    format!(
        "{}\n\n{}:\n{}\n\n链接:\n{}",
        banner,
        feed.display_label(),
        snapshot.title,
        snapshot.url
    )
}
