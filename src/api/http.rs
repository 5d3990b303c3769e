//! HTTP utilities for Lume REST API calls

use crate::error::{LumeError, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use std::path::Path;
use url::Url;

/// MIME type of `.xlsx` workbooks
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// MIME type of PDF documents
pub const PDF_MIME: &str = "application/pdf";

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "lume-api-key";

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Lume API calls
#[derive(Clone)]
pub struct LumeHttpClient {
    client: Client,
}

impl LumeHttpClient {
    /// Create a client that sends `api_key` with every request
    pub fn new(api_key: &str) -> Result<Self> {
        let mut key = HeaderValue::from_str(api_key).map_err(|_| {
            LumeError::Validation("API key contains characters not allowed in a header".to_string())
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .user_agent(concat!("lume-rs/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(LumeError::Client)?;

        Ok(Self { client })
    }

    /// Make a GET request, with optional query parameters
    pub async fn get(&self, url: Url, query: &[(&str, String)]) -> Result<Value> {
        let mut request = self.client.get(url.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        self.execute(Method::GET, url, request).await
    }

    /// Make a POST request with an optional JSON body
    pub async fn post(&self, url: Url, body: Option<&Value>) -> Result<Value> {
        let mut request = self.client.post(url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(Method::POST, url, request).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: Url, body: &Value) -> Result<Value> {
        let request = self.client.put(url.clone()).json(body);
        self.execute(Method::PUT, url, request).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: Url) -> Result<Value> {
        let request = self.client.delete(url.clone());
        self.execute(Method::DELETE, url, request).await
    }

    /// POST a multipart form (file uploads)
    pub async fn post_multipart(&self, url: Url, form: Form) -> Result<Value> {
        let request = self
            .client
            .post(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form);
        self.execute(Method::POST, url, request).await
    }

    async fn execute(&self, method: Method, url: Url, request: RequestBuilder) -> Result<Value> {
        tracing::debug!("{} {}", method, url);

        let response = request.send().await.map_err(|source| LumeError::Request {
            method: method.to_string(),
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| LumeError::Request {
            method: method.to_string(),
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            // Only the sanitized/truncated body goes to the log; the caller gets it whole
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(LumeError::Http {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body,
            });
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|source| LumeError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Read a local file into a multipart part named after the file
pub async fn file_part(path: &Path, mime: &str) -> Result<Part> {
    let bytes = tokio::fs::read(path).await.map_err(|source| LumeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    tracing::debug!("Attaching {} ({} bytes)", file_name, bytes.len());

    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|_| LumeError::Validation(format!("invalid MIME type: {}", mime)))
}

/// Format a Lume API error for display
/// Maps well-known HTTP statuses to short, actionable messages
pub fn format_api_error(error: &LumeError) -> String {
    if let Some(status) = error.status() {
        match status.as_u16() {
            401 | 403 => {
                return "Authentication failed. Check your Lume API key.".to_string();
            },
            404 => return "Resource not found.".to_string(),
            409 => {
                return "Resource conflict. The resource may already exist or be in use."
                    .to_string();
            },
            422 | 400 => return "Invalid request. Check your parameters.".to_string(),
            429 => return "Rate limit exceeded. Please try again later.".to_string(),
            500..=599 => {
                return "Lume service temporarily unavailable. Please try again.".to_string();
            },
            _ => {},
        }
    }

    if let LumeError::Request { .. } = error {
        return "Request failed. Check your network connection and try again.".to_string();
    }

    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
