//! Lume Client
//!
//! Main client for the Lume APIs, combining the HTTP transport, the service
//! base URLs and the polling policy used by long-running operations.

use super::http::LumeHttpClient;
use crate::config::Config;
use crate::error::{LumeError, Result};
use crate::operation::{Operation, OperationFamily};
use crate::resource::{Page, PollPolicy, Poller};
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Default base URL of the mapping API
pub const DEFAULT_API_URL: &str = "https://api.lume.ai/";

/// Default base URL of the file-processing service (Excel and PDF)
pub const DEFAULT_FILES_URL: &str = "https://staging.lume-terminus.com/crud/";

/// Which Lume service a path is relative to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Pipelines, jobs, results, workshops, targets, mappings
    Api,
    /// Excel conversion and PDF extraction
    Files,
}

/// Main Lume client
#[derive(Clone)]
pub struct LumeClient {
    pub http: LumeHttpClient,
    api_url: Url,
    files_url: Url,
    poll_policy: PollPolicy,
}

impl LumeClient {
    /// Create a client for the hosted service
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_urls(api_key, DEFAULT_API_URL, DEFAULT_FILES_URL)
    }

    /// Create a client against custom base URLs (self-hosted or test servers)
    pub fn with_base_urls(api_key: &str, api_url: &str, files_url: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(LumeError::MissingApiKey);
        }

        Ok(Self {
            http: LumeHttpClient::new(api_key)?,
            api_url: parse_base(api_url)?,
            files_url: parse_base(files_url)?,
            poll_policy: PollPolicy::default(),
        })
    }

    /// Create a client from the user configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.effective_api_key().ok_or(LumeError::MissingApiKey)?;
        let client = Self::with_base_urls(
            &api_key,
            &config.effective_api_url(),
            &config.effective_files_url(),
        )?;
        Ok(client.with_poll_policy(config.poll_policy()))
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Replace the API key; the transport is rebuilt from scratch
    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        if api_key.trim().is_empty() {
            return Err(LumeError::MissingApiKey);
        }
        self.http = LumeHttpClient::new(api_key)?;
        tracing::debug!("API key replaced, HTTP client rebuilt");
        Ok(())
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll_policy
    }

    /// Poller configured with this client's policy
    pub fn poller(&self) -> Poller {
        Poller::new(self.poll_policy.clone())
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    pub fn base_url(&self, service: Service) -> &Url {
        match service {
            Service::Api => &self.api_url,
            Service::Files => &self.files_url,
        }
    }

    /// Build the full URL of `path` on `service`
    pub fn url(&self, service: Service, path: &str) -> Result<Url> {
        Ok(self
            .base_url(service)
            .join(path.trim_start_matches('/'))?)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// GET a path on the mapping API
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.get_from(Service::Api, path, &[]).await
    }

    /// GET a path on any service, with query parameters
    pub async fn get_from(
        &self,
        service: Service,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        let url = self.url(service, path)?;
        self.http.get(url, query).await
    }

    /// POST to the mapping API
    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(Service::Api, path)?;
        self.http.post(url, body).await
    }

    /// PUT to the mapping API
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(Service::Api, path)?;
        self.http.put(url, body).await
    }

    /// DELETE on the mapping API
    pub async fn delete(&self, path: &str) -> Result<Value> {
        let url = self.url(Service::Api, path)?;
        self.http.delete(url).await
    }

    /// Upload a multipart form
    pub async fn upload(&self, service: Service, path: &str, form: Form) -> Result<Value> {
        let url = self.url(service, path)?;
        self.http.post_multipart(url, form).await
    }

    /// Fetch one page of a list endpoint on the mapping API
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        size: u32,
    ) -> Result<Page<T>> {
        self.fetch_page_from(Service::Api, path, page, size).await
    }

    /// Fetch one page of a list endpoint on any service
    pub async fn fetch_page_from<T: DeserializeOwned>(
        &self,
        service: Service,
        path: &str,
        page: u32,
        size: u32,
    ) -> Result<Page<T>> {
        let query = [("page", page.to_string()), ("size", size.to_string())];
        let response = self.get_from(service, path, &query).await?;
        decode(path, response)
    }

    // =========================================================================
    // Long-running operations
    // =========================================================================

    /// Wait for a submitted operation using this client's poll policy
    ///
    /// `status_path` maps the operation id to the path its status is read from.
    pub async fn wait_for<P>(
        &self,
        submitted: Value,
        family: OperationFamily,
        immediate: bool,
        service: Service,
        status_path: P,
    ) -> Result<Operation>
    where
        P: Fn(&str) -> String,
    {
        self.wait_with(&self.poller(), submitted, family, immediate, service, status_path)
            .await
    }

    /// Same as [`LumeClient::wait_for`] with an explicit poller
    pub async fn wait_with<P>(
        &self,
        poller: &Poller,
        submitted: Value,
        family: OperationFamily,
        immediate: bool,
        service: Service,
        status_path: P,
    ) -> Result<Operation>
    where
        P: Fn(&str) -> String,
    {
        let submitted = Operation::from_value(submitted)?;
        self.poll(poller, submitted, family, immediate, service, status_path)
            .await
    }

    /// Wait for an operation whose id the caller already knows
    ///
    /// For endpoints whose payloads only carry `status`, such as confidence
    /// scoring, which reports on the result it was started from.
    pub async fn wait_on<P>(
        &self,
        poller: &Poller,
        id: &str,
        submitted: Value,
        family: OperationFamily,
        service: Service,
        status_path: P,
    ) -> Result<Operation>
    where
        P: Fn(&str) -> String,
    {
        let submitted = Operation::with_id(id, submitted)?;
        self.poll(poller, submitted, family, false, service, status_path)
            .await
    }

    async fn poll<P>(
        &self,
        poller: &Poller,
        submitted: Operation,
        family: OperationFamily,
        immediate: bool,
        service: Service,
        status_path: P,
    ) -> Result<Operation>
    where
        P: Fn(&str) -> String,
    {
        poller
            .poll_until_terminal(submitted, family, immediate, move |id| {
                let path = status_path(&id);
                async move {
                    let body = self.get_from(service, &path, &[]).await?;
                    Operation::with_id(&id, body)
                }
            })
            .await
    }
}

/// Percent-encode an identifier for use as a single path segment
pub fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Decode a JSON payload into a typed record
pub fn decode<T: DeserializeOwned>(origin: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| LumeError::Decode {
        url: origin.to_string(),
        source,
    })
}

/// Base URLs must end in `/` so relative paths are appended, not substituted
fn parse_base(raw: &str) -> Result<Url> {
    if raw.ends_with('/') {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("{}/", raw))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_onto_base() {
        let client = LumeClient::new("key").unwrap();
        assert_eq!(
            client.url(Service::Api, "pipelines/p1/jobs").unwrap().as_str(),
            "https://api.lume.ai/pipelines/p1/jobs"
        );
        assert_eq!(
            client.url(Service::Files, "/pdf/orders").unwrap().as_str(),
            "https://staging.lume-terminus.com/crud/pdf/orders"
        );
    }

    #[test]
    fn test_base_without_trailing_slash_keeps_prefix() {
        let client =
            LumeClient::with_base_urls("key", "http://localhost:8080/v1", "http://localhost:9090")
                .unwrap();
        assert_eq!(
            client.url(Service::Api, "jobs").unwrap().as_str(),
            "http://localhost:8080/v1/jobs"
        );
        assert_eq!(
            client.url(Service::Files, "convert/sheets").unwrap().as_str(),
            "http://localhost:9090/convert/sheets"
        );
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        assert!(matches!(
            LumeClient::new("  "),
            Err(LumeError::MissingApiKey)
        ));

        let mut client = LumeClient::new("key").unwrap();
        assert!(client.set_api_key("").is_err());
        assert!(client.set_api_key("other-key").is_ok());
    }

    #[test]
    fn test_segment_encodes_reserved_characters() {
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
        assert_eq!(segment("plain-id"), "plain-id");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            LumeClient::with_base_urls("key", "not a url", DEFAULT_FILES_URL),
            Err(LumeError::InvalidUrl(_))
        ));
    }
}
