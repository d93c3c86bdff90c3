//! HTTP request effector
//!
//! Requests run on the tokio runtime; the calling thread never waits for the
//! response. The spawned task logs the status or the failure.

use super::{EffectorError, HttpPort};
use reqwest::{header, Method, StatusCode, Url};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Split `METHOD|BODY` into its parts
///
/// An empty string means GET. The method is case-insensitive. Everything
/// after the first `|` is the body, so bodies may contain `|`.
pub fn parse_method_and_body(data: &str) -> Result<(Method, Option<String>), EffectorError> {
    let (method, body) = match data.split_once('|') {
        Some((m, b)) => (m.trim(), Some(b)),
        None => (data.trim(), None),
    };

    let method = if method.is_empty() {
        Method::GET
    } else {
        Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| EffectorError::InvalidRequest(format!("bad method '{}'", method)))?
    };

    let body = body.filter(|b| !b.is_empty()).map(str::to_string);
    Ok((method, body))
}

/// Parse and check an http(s) URL
pub fn parse_url(url: &str) -> Result<Url, EffectorError> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| EffectorError::InvalidRequest(format!("bad url '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(EffectorError::InvalidRequest(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

pub struct HttpClient {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpClient {
    pub fn new(runtime: Handle) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("grass-midi/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, runtime })
    }

    /// Send one request and wait for the response status
    pub async fn request(
        client: &reqwest::Client,
        url: Url,
        method: Method,
        body: Option<String>,
    ) -> Result<StatusCode, EffectorError> {
        let mut req = client.request(method, url);
        if let Some(body) = body {
            req = req
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        let response = req
            .send()
            .await
            .map_err(|e| EffectorError::Backend(e.to_string()))?;
        Ok(response.status())
    }
}

impl HttpPort for HttpClient {
    fn send_request(&self, url: &str, method_and_body: &str) -> Result<(), EffectorError> {
        let url = parse_url(url)?;
        let (method, body) = parse_method_and_body(method_and_body)?;
        debug!("HTTP {} {} (body: {} bytes)", method, url, body.as_ref().map_or(0, |b| b.len()));

        let client = self.client.clone();
        self.runtime.spawn(async move {
            let label = format!("{} {}", method, url);
            match Self::request(&client, url, method, body).await {
                Ok(status) if status.is_success() => info!("🌐 {} → {}", label, status),
                Ok(status) => warn!("🌐 {} → {}", label, status),
                Err(e) => warn!("🌐 {} failed: {}", label, e),
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_and_body() {
        assert_eq!(parse_method_and_body("").unwrap(), (Method::GET, None));
        assert_eq!(parse_method_and_body("delete").unwrap(), (Method::DELETE, None));

        let (m, b) = parse_method_and_body(r#"POST|{"a":"x|y"}"#).unwrap();
        assert_eq!(m, Method::POST);
        assert_eq!(b.as_deref(), Some(r#"{"a":"x|y"}"#));

        assert_eq!(parse_method_and_body("PUT|").unwrap(), (Method::PUT, None));
    }

    #[test]
    fn test_bad_method_is_rejected() {
        assert!(matches!(
            parse_method_and_body("PO ST|{}"),
            Err(EffectorError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_parse_url() {
        assert!(parse_url("http://localhost:8080/hook").is_ok());
        assert!(parse_url("https://example.com").is_ok());
        assert!(matches!(
            parse_url("ftp://example.com"),
            Err(EffectorError::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_url("not a url"),
            Err(EffectorError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(r#"{"scene":"Live"}"#)
            .with_status(204)
            .create_async()
            .await;

        let url = parse_url(&format!("{}/hook", server.url())).unwrap();
        let (method, body) = parse_method_and_body(r#"POST|{"scene":"Live"}"#).unwrap();
        let status = HttpClient::request(&reqwest::Client::new(), url, method, body)
            .await
            .unwrap();

        assert_eq!(status, StatusCode::NO_CONTENT);
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_send_request_does_not_wait_for_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(200)
            .create_async()
            .await;

        let client = HttpClient::new(Handle::current()).unwrap();
        client
            .send_request(&format!("{}/ping", server.url()), "")
            .unwrap();

        for _ in 0..50 {
            if mock.matched_async().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_requests_fail_before_spawning() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let client = HttpClient::new(runtime.handle().clone()).unwrap();

        assert!(client.send_request("mailto:a@b", "").is_err());
        assert!(client.send_request("http://localhost/", "BAD METHOD|x").is_err());
    }
}
