use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::{FetchError, Result};
use crate::domain::{FeedDescriptor, Snapshot};
use crate::fetcher::Fetcher;
use crate::normalizer;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.102 Safari/537.36";

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS), DEFAULT_USER_AGENT)
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_decode() {
        FetchError::Parse(err.to_string())
    } else {
        FetchError::Transport(err.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, feed: &FeedDescriptor) -> std::result::Result<Snapshot, FetchError> {
        let response = self.client.get(&feed.url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        normalizer::latest_snapshot(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    /// Serves `response` to a single connection and reports the raw request.
    async fn serve_once(response: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let _ = tx.send(String::from_utf8_lossy(&buf[..n]).to_string());
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/articles", addr), rx)
    }

    fn fetcher(timeout: Duration) -> HttpFetcher {
        HttpFetcher::new(timeout, DEFAULT_USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_latest_article() {
        let body = r#"{"articles":[{"title":"B","html_url":"u2","updated_at":"2024-01-01T00:00:00Z"}]}"#;
        let (url, request) = serve_once(http_response("200 OK", body)).await;

        let snapshot = fetcher(Duration::from_secs(5))
            .fetch(&FeedDescriptor::new("fb_Beta", url))
            .await
            .unwrap();

        assert_eq!(snapshot, Snapshot::new("B", "u2").with_updated_at("2024-01-01T00:00:00Z"));

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /articles"));
        assert!(request.contains(&format!("user-agent: {}", DEFAULT_USER_AGENT.to_lowercase())));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (url, _request) = serve_once(http_response("503 Service Unavailable", "{}")).await;

        let err = fetcher(Duration::from_secs(5))
            .fetch(&FeedDescriptor::new("fb_Beta", url))
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::HttpStatus(503));
    }

    #[tokio::test]
    async fn test_empty_article_list() {
        let (url, _request) = serve_once(http_response("200 OK", r#"{"articles":[]}"#)).await;

        let err = fetcher(Duration::from_secs(5))
            .fetch(&FeedDescriptor::new("fb_Beta", url))
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Empty);
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await {
                tokio::time::sleep(Duration::from_secs(5)).await;
                drop(socket);
            }
        });

        let err = fetcher(Duration::from_millis(200))
            .fetch(&FeedDescriptor::new("fb_Release", format!("http://{}/", addr)))
            .await
            .unwrap_err();

        assert_eq!(err, FetchError::Timeout);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(Duration::from_secs(2))
            .fetch(&FeedDescriptor::new("fb_Beta", format!("http://{}/", addr)))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)));
    }
}
