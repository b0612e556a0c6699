use serde::{Deserialize, Serialize};

pub const BETA_SECTION_URL: &str = "https://minecraftfeedback.zendesk.com/api/v2/help_center/en-us/sections/360001185332/articles?per_page=5";
pub const RELEASE_SECTION_URL: &str = "https://minecraftfeedback.zendesk.com/api/v2/help_center/en-us/sections/360001186971/articles?per_page=5";

/// A named endpoint polled for its latest article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub name: String,
    pub url: String,
    /// Heading used in notifications, e.g. "🔜 测试版 (Beta)".
    #[serde(default)]
    pub label: String,
    /// Short name used by `push-<alias>`.
    #[serde(default)]
    pub alias: String,
}

impl FeedDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            label: String::new(),
            alias: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub fn push_command(&self) -> String {
        if self.alias.is_empty() {
            format!("push-{}", self.name)
        } else {
            format!("push-{}", self.alias)
        }
    }

    /// Whether `key` names this feed, by name or alias (case-insensitive).
    pub fn matches(&self, key: &str) -> bool {
        self.name.eq_ignore_ascii_case(key)
            || (!self.alias.is_empty() && self.alias.eq_ignore_ascii_case(key))
    }
}

/// The two Minecraft feedback sections watched out of the box.
pub fn default_feeds() -> Vec<FeedDescriptor> {
    vec![
        FeedDescriptor::new("fb_Beta", BETA_SECTION_URL)
            .with_label("🔜 测试版 (Beta)")
            .with_alias("beta"),
        FeedDescriptor::new("fb_Release", RELEASE_SECTION_URL)
            .with_label("🎉 正式版 (Release)")
            .with_alias("release"),
    ]
}
