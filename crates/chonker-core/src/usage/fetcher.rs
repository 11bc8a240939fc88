//! One authenticated GET against the account usage endpoint.
//!
//! Every failure mode (transport, status, body) collapses to `None` at the
//! public boundary; callers only need to know whether fresh data arrived.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::types::UsageData;

/// API endpoint for usage limits
pub const USAGE_API_URL: &str = "https://api.anthropic.com/api/oauth/usage";

/// Beta header required for the OAuth usage API
const ANTHROPIC_BETA_HEADER: &str = "anthropic-beta";
const ANTHROPIC_BETA_VALUE: &str = "oauth-2025-04-20";

/// User agent matching the host application
const CLAUDE_CODE_USER_AGENT: &str = "claude-code/2.0.32";

/// Default request timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Produces usage data for an access token
pub trait UsageSource: Send + Sync {
    /// Fetch current usage, or `None` if it is unavailable for any reason
    fn fetch(&self, access_token: &str) -> Option<UsageData>;
}

/// Why a fetch failed (logged, never returned to callers)
#[derive(Debug, Error)]
pub enum FetchError {
    /// The endpoint answered with a non-success status
    #[error("usage endpoint returned HTTP {0}")]
    Status(u16),

    /// Connection, TLS or timeout failure
    #[error("usage request failed: {0}")]
    Transport(#[source] ureq::Error),

    /// The body was not a usage document
    #[error("failed to decode usage response: {0}")]
    Body(#[source] ureq::Error),
}

/// HTTPS fetcher with a fixed global timeout
pub struct HttpUsageFetcher {
    agent: ureq::Agent,
    url: String,
}

impl HttpUsageFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self::with_url(USAGE_API_URL, timeout)
    }

    /// Fetcher against a different endpoint (local test servers)
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            url: url.into(),
        }
    }

    fn try_fetch(&self, access_token: &str) -> Result<UsageData, FetchError> {
        let mut response = self
            .agent
            .get(&self.url)
            .header("Authorization", &format!("Bearer {access_token}"))
            .header("Content-Type", "application/json")
            .header("User-Agent", CLAUDE_CODE_USER_AGENT)
            .header(ANTHROPIC_BETA_HEADER, ANTHROPIC_BETA_VALUE)
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => FetchError::Status(code),
                other => FetchError::Transport(other),
            })?;

        response
            .body_mut()
            .read_json::<UsageData>()
            .map_err(FetchError::Body)
    }
}

impl Default for HttpUsageFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl UsageSource for HttpUsageFetcher {
    fn fetch(&self, access_token: &str) -> Option<UsageData> {
        match self.try_fetch(access_token) {
            Ok(data) => {
                debug!("Fetched usage from {}", self.url);
                Some(data)
            }
            Err(e @ FetchError::Status(_)) => {
                warn!("{}", e);
                None
            }
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    /// Serve one canned HTTP response and hand back the raw request
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/oauth/usage", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap();
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });
        (url, handle)
    }

    #[test]
    fn test_fetch_success_sends_required_headers() {
        let body = r#"{"five_hour":{"utilization":10.0,"resets_at":null}}"#;
        let response: &'static str = Box::leak(
            format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            )
            .into_boxed_str(),
        );
        let (url, server) = serve_once(response);

        let fetcher = HttpUsageFetcher::with_url(url, Duration::from_secs(2));
        let data = fetcher.fetch("secret-token").expect("should parse");
        assert_eq!(data.five_hour.unwrap().percent(), 10.0);

        let request = server.join().unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /api/oauth/usage"));
        assert!(request.contains("authorization: bearer secret-token"));
        assert!(request.contains("anthropic-beta: oauth-2025-04-20"));
        assert!(request.contains("user-agent: claude-code/"));
    }

    #[test]
    fn test_non_success_status_is_unavailable() {
        let (url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
        );
        let fetcher = HttpUsageFetcher::with_url(url, Duration::from_secs(2));
        assert!(fetcher.fetch("expired").is_none());
        server.join().unwrap();
    }

    #[test]
    fn test_unparsable_body_is_unavailable() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 9\r\nConnection: close\r\n\r\n<html/>\r\n",
        );
        let fetcher = HttpUsageFetcher::with_url(url, Duration::from_secs(2));
        assert!(fetcher.fetch("token").is_none());
        server.join().unwrap();
    }

    #[test]
    fn test_unreachable_endpoint_is_unavailable() {
        // Bind then drop to get a port nobody listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let fetcher = HttpUsageFetcher::with_url(
            format!("http://127.0.0.1:{port}/api/oauth/usage"),
            Duration::from_secs(1),
        );
        assert!(fetcher.fetch("token").is_none());
    }

    #[test]
    fn test_timeout_is_bounded() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        // Accept but never answer
        let _server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(3));
            drop(stream);
        });

        let fetcher = HttpUsageFetcher::with_url(url, Duration::from_millis(300));
        let start = Instant::now();
        assert!(fetcher.fetch("token").is_none());
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
