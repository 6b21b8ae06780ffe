use std::env;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode, header};
use url::Url;

use crate::backend::ChatBackend;
use crate::decoder::ByteStream;
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{
    ChatRequest, DeleteOutcome, ExportFormat, RenameRequest, SessionId, SessionRecord,
    SessionSummary,
};

const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
const BASE_URL_ENV: &str = "CHATSTREAM_BASE_URL";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const MESSAGES_PATH: &str = "api/chat/sessions/messages";
const SESSIONS_PATH: &str = "api/chat/sessions/";

/// HTTP client for the chat service.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl ChatClient {
    /// Create a new chat client.
    ///
    /// The base URL can be provided directly or read from the
    /// CHATSTREAM_BASE_URL environment variable; it defaults to a service on
    /// localhost.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    ///
    /// `timeout` bounds connection setup and every non-streaming request. A
    /// streamed reply may take as long as the service keeps sending.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        };
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The service's base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The download URL of a session export.
    pub fn export_url(&self, id: &SessionId, format: ExportFormat) -> Result<Url> {
        let mut url = self.session_url(id)?;
        url.query_pairs_mut().append_pair("format", format.as_str());
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn session_url(&self, id: &SessionId) -> Result<Url> {
        let mut url = self.endpoint(SESSIONS_PATH)?;
        url.path_segments_mut()
            .map_err(|_| Error::url(format!("{} cannot be a base URL", self.base_url), None))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Sends a request, timing it and converting transport failures.
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = request.send().await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        result.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                Error::timeout(
                    format!("Request timed out: {e}"),
                    Some(self.timeout.as_secs_f64()),
                )
            } else if e.is_connect() {
                Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
            } else {
                Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
            }
        })
    }

    /// Passes successful responses through and turns the rest into errors.
    async fn expect_success(response: Response, resource: Option<&SessionId>) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            CLIENT_REQUEST_ERRORS.click();
            Err(Self::process_error_response(response, resource).await)
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response, resource: Option<&SessionId>) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };
        let message = error_message(status, &error_body);
        tracing::debug!(status = status_code, "service rejected request: {message}");

        match status_code {
            400 | 422 => Error::bad_request(message),
            404 => Error::not_found(message, resource.map(SessionId::to_string)),
            408 => Error::timeout(message, None),
            500 => Error::internal_server(message),
            502..=504 => Error::service_unavailable(message),
            _ => Error::api(status_code, message),
        }
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatClient {
    async fn send_message(&self, request: &ChatRequest) -> Result<ByteStream> {
        let url = self.endpoint(MESSAGES_PATH)?;
        tracing::debug!(%url, bound = request.session_id.is_some(), "submitting message");

        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/x-ndjson, application/json"),
        );

        let response = self
            .execute(self.client.post(url).headers(headers).json(request))
            .await?;
        let response = Self::expect_success(response, request.session_id.as_ref()).await?;

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        Ok(Box::pin(stream))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let url = self.endpoint(SESSIONS_PATH.trim_end_matches('/'))?;
        let response = self
            .execute(
                self.client
                    .get(url)
                    .headers(self.default_headers())
                    .timeout(self.timeout),
            )
            .await?;
        let response = Self::expect_success(response, None).await?;
        response.json::<Vec<SessionSummary>>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse session list: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    async fn load_session(&self, id: &SessionId) -> Result<SessionRecord> {
        let url = self.export_url(id, ExportFormat::Json)?;
        let response = self
            .execute(
                self.client
                    .get(url)
                    .headers(self.default_headers())
                    .timeout(self.timeout),
            )
            .await?;
        let response = Self::expect_success(response, Some(id)).await?;
        response.json::<SessionRecord>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse session: {e}"), Some(Box::new(e)))
        })
    }

    async fn rename_session(&self, id: &SessionId, request: &RenameRequest) -> Result<()> {
        let url = self.session_url(id)?;
        let response = self
            .execute(
                self.client
                    .patch(url)
                    .headers(self.default_headers())
                    .timeout(self.timeout)
                    .json(request),
            )
            .await?;
        Self::expect_success(response, Some(id)).await?;
        Ok(())
    }

    async fn delete_session(&self, id: &SessionId) -> Result<DeleteOutcome> {
        let url = self.session_url(id)?;
        let response = self
            .execute(
                self.client
                    .delete(url)
                    .headers(self.default_headers())
                    .timeout(self.timeout),
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::AlreadyGone);
        }
        Self::expect_success(response, Some(id)).await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn export_session(&self, id: &SessionId, format: ExportFormat) -> Result<Bytes> {
        let url = self.export_url(id, format)?;
        let response = self
            .execute(self.client.get(url).timeout(self.timeout))
            .await?;
        let response = Self::expect_success(response, Some(id)).await?;
        response.bytes().await.map_err(|e| {
            Error::streaming(format!("Failed to download export: {e}"), Some(Box::new(e)))
        })
    }
}

/// Parses a base URL, making sure relative joins land beneath it.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    let url = Url::parse(&raw)?;
    if url.cannot_be_a_base() {
        return Err(Error::url(format!("{raw} cannot be a base URL"), None));
    }
    Ok(url)
}

/// Extracts a readable message from an error body.
///
/// The service answers `{"detail": "..."}`; validation failures carry a
/// structured detail that is passed through as JSON.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = value.get("detail") {
            return match detail.as_str() {
                Some(text) => text.to_string(),
                None => detail.to_string(),
            };
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ChatClient::new(Some("http://localhost:8000".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

        let client = ChatClient::with_options(
            Some("https://chat.example.com/prefix".to_string()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://chat.example.com/prefix/");
        assert_eq!(client.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn invalid_base_url() {
        let err = ChatClient::new(Some("not a url".to_string())).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
        let err = ChatClient::new(Some("mailto:someone@example.com".to_string())).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn export_urls_are_deterministic() {
        let client = ChatClient::new(Some("http://localhost:8000/".to_string())).unwrap();
        let url = client
            .export_url(&SessionId::new("abc123"), ExportFormat::Text)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/chat/sessions/abc123?format=text"
        );
        let url = client
            .export_url(&SessionId::new("7"), ExportFormat::Json)
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/chat/sessions/7?format=json"
        );
    }

    #[test]
    fn session_ids_are_escaped_in_paths() {
        let client = ChatClient::new(Some("http://localhost:8000/".to_string())).unwrap();
        let url = client.session_url(&SessionId::new("a/b c")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/chat/sessions/a%2Fb%20c"
        );
    }

    #[test]
    fn endpoints_respect_path_prefix() {
        let client = ChatClient::new(Some("http://host/chat-ui".to_string())).unwrap();
        assert_eq!(
            client.endpoint(MESSAGES_PATH).unwrap().as_str(),
            "http://host/chat-ui/api/chat/sessions/messages"
        );
    }

    #[test]
    fn error_messages_prefer_detail() {
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, r#"{"detail":"Session not found"}"#),
            "Session not found"
        );
        assert_eq!(
            error_message(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"detail":[{"loc":["path","session_id"]}]}"#
            ),
            r#"[{"loc":["path","session_id"]}]"#
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
    }
}
