//! HTTP client for the events REST backend.
//!
//! Every endpoint wraps its payload in an envelope: `{"events": [...]}` for
//! the collection, `{"event": {...}}` for a single event in both directions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{Event, EventFields, EventId};

use super::{ApiError, RemoteStore};

// ============================================================================
// Constants
// ============================================================================

/// Default backend address used by the events demo server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct EventsEnvelope {
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event: Event,
}

#[derive(Debug, Serialize)]
struct EventBody<'a, T> {
    event: &'a T,
}

/// REST client for the events backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.base_url)
    }

    fn event_url(&self, id: &EventId) -> String {
        format!("{}/events/{}", self.base_url, id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(header::ACCEPT, "application/json")
    }

    /// Check if response is successful, returning a typed error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(status = %status, "Request rejected by server");
            Err(ApiError::from_status(status.as_u16(), &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl RemoteStore for ApiClient {
    async fn list(&self) -> Result<Vec<Event>, ApiError> {
        let url = self.events_url();
        debug!(url = %url, "GET events");
        let envelope: EventsEnvelope = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(envelope.events)
    }

    async fn get_one(&self, id: &EventId) -> Result<Event, ApiError> {
        let url = self.event_url(id);
        debug!(url = %url, "GET event");
        let envelope: EventEnvelope = self.send_json(self.request(Method::GET, &url)).await?;
        Ok(envelope.event)
    }

    async fn create(&self, fields: &EventFields) -> Result<Event, ApiError> {
        let url = self.events_url();
        debug!(url = %url, title = %fields.title, "POST event");
        let builder = self
            .request(Method::POST, &url)
            .json(&EventBody { event: fields });
        let envelope: EventEnvelope = self.send_json(builder).await?;
        Ok(envelope.event)
    }

    async fn update(&self, id: &EventId, fields: &EventFields) -> Result<Event, ApiError> {
        let url = self.event_url(id);
        debug!(url = %url, title = %fields.title, "PUT event");
        let builder = self
            .request(Method::PUT, &url)
            .json(&EventBody { event: fields });
        let envelope: EventEnvelope = self.send_json(builder).await?;
        Ok(envelope.event)
    }

    async fn delete(&self, id: &EventId) -> Result<(), ApiError> {
        let url = self.event_url(id);
        debug!(url = %url, "DELETE event");
        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.events_url(), "http://localhost:3000/events");
        assert_eq!(
            client.event_url(&EventId::new("42")),
            "http://localhost:3000/events/42"
        );
    }

    #[test]
    fn test_parse_events_envelope() {
        let json = r#"{"events": [{"id": "e1", "title": "Conf", "date": "2025-06-01", "time": "09:00", "location": "Hall", "image": "conf.jpg", "description": "Yearly"}]}"#;
        let envelope: EventsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.events.len(), 1);
        assert_eq!(envelope.events[0].title, "Conf");

        let empty: EventsEnvelope = serde_json::from_str("{}").unwrap();
        assert!(empty.events.is_empty());
    }

    /// Accept one connection on a local port, answer it with `response_body`
    /// and hand back the request line and body that were received.
    async fn serve_once(response_body: &'static str) -> (String, JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let (head_len, content_length) = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                    let length = head
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    break (pos + 4, length);
                }
            };
            while buf.len() < head_len + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before body");
                buf.extend_from_slice(&chunk[..n]);
            }

            let head = String::from_utf8_lossy(&buf[..head_len]).to_string();
            let request_line = head.lines().next().unwrap_or_default().to_string();
            let body = String::from_utf8(buf[head_len..head_len + content_length].to_vec()).unwrap();

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                response_body.len(),
                response_body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            (request_line, body)
        });

        (base_url, server)
    }

    #[tokio::test]
    async fn test_update_sends_every_field() {
        let (base_url, server) = serve_once(
            r#"{"event": {"id": "7", "title": "New", "description": "About Old", "date": "2025-06-01", "time": "18:00", "location": "Main Hall", "image": ""}}"#,
        )
        .await;
        let client = ApiClient::new(base_url).unwrap();
        let fields = EventFields {
            title: "New".to_string(),
            description: "About Old".to_string(),
            date: "2025-06-01".to_string(),
            time: "18:00".to_string(),
            location: "Main Hall".to_string(),
            image: String::new(),
        };

        let updated = client.update(&EventId::new("7"), &fields).await.unwrap();
        assert_eq!(updated.title, "New");

        let (request_line, body) = server.await.unwrap();
        assert!(request_line.starts_with("PUT /events/7 "), "{}", request_line);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        let sent = body["event"].as_object().unwrap();
        for field in ["title", "description", "date", "time", "location", "image"] {
            assert!(sent.contains_key(field), "missing {} in {}", field, body);
        }
        assert_eq!(body["event"]["location"], "Main Hall");
        assert_eq!(body["event"]["image"], "");
    }
}
