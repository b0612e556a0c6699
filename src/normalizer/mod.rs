use serde::Deserialize;
use serde_json::Value;

use crate::app::FetchError;
use crate::domain::Snapshot;

#[derive(Debug, Deserialize)]
struct ArticlePage {
    #[serde(default)]
    articles: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Extracts the first article of a help-center listing as a [`Snapshot`].
///
/// Only the first element of `articles` is decoded; later entries may be malformed.
/// Missing `title` falls back to `name`, then to an empty string; a missing `html_url`
/// becomes an empty URL.
pub fn latest_snapshot(body: &[u8]) -> Result<Snapshot, FetchError> {
    let page: ArticlePage =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let first = page
        .articles
        .and_then(|articles| articles.into_iter().next())
        .ok_or(FetchError::Empty)?;
    let article: Article =
        serde_json::from_value(first).map_err(|e| FetchError::Parse(e.to_string()))?;

    Ok(Snapshot {
        title: article.title.or(article.name).unwrap_or_default(),
        url: article.html_url.unwrap_or_default(),
        updated_at: article.updated_at,
    })
}
