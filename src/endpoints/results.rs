//! Results
//!
//! Outcome records of job and workshop runs, their spec, per-record
//! mappings and confidence scores.

use crate::api::client::{decode, segment, LumeClient, Service};
use crate::error::{LumeError, Result};
use crate::operation::{lenient_id, OperationFamily};
use crate::resource::{Pagination, PollPolicy, Poller};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Default bound on confidence score generation
pub const CONFIDENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a job or workshop run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One source record and what it was mapped to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMapper {
    #[serde(default)]
    pub result_id: Option<String>,
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub source_record: Option<Map<String, Value>>,
    #[serde(default)]
    pub mapped_record: Option<Map<String, Value>>,
    #[serde(default, alias = "messsage")]
    pub message: Option<String>,
}

impl JobResult {
    /// Fetch one page of results
    pub async fn list(client: &LumeClient, pagination: Pagination) -> Result<Vec<Self>> {
        let page = client
            .fetch_page("results", pagination.page(), pagination.size())
            .await?;
        Ok(page.items)
    }

    pub async fn get_by_id(client: &LumeClient, result_id: &str) -> Result<Self> {
        let path = format!("results/{}", segment(result_id));
        decode(&path, client.get(&path).await?)
    }

    /// Re-fetch this result
    pub async fn get_details(&self, client: &LumeClient) -> Result<Self> {
        Self::get_by_id(client, self.require_id("fetching details")?).await
    }

    /// Spec the run produced; an empty answer means the job has not run yet
    pub async fn get_spec(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("fetching the spec")?;
        let spec = client.get(&format!("results/{}/spec", segment(id))).await?;

        if is_empty(&spec) {
            return Err(LumeError::NotFound {
                what: "Spec for result",
                key: format!("{} (consider running the job first)", id),
            });
        }
        Ok(spec)
    }

    /// Fetch one page of per-record mappings
    pub async fn get_mappings(
        &self,
        client: &LumeClient,
        pagination: Pagination,
    ) -> Result<Vec<ResultMapper>> {
        let id = self.require_id("fetching mappings")?;
        let page = client
            .fetch_page(
                &format!("results/{}/mappings", segment(id)),
                pagination.page(),
                pagination.size(),
            )
            .await?;
        Ok(page.items)
    }

    /// Generate confidence scores and wait for them
    ///
    /// Bounded by `timeout`, or [`CONFIDENCE_TIMEOUT`] when `None`; the
    /// client's poll interval and backoff still apply.
    pub async fn generate_confidence_scores(
        &self,
        client: &LumeClient,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let id = self.require_id("generating confidence scores")?;
        let path = format!("results/{}/confidence", segment(id));

        let policy: PollPolicy = client
            .poll_policy()
            .clone()
            .with_timeout(Some(timeout.unwrap_or(CONFIDENCE_TIMEOUT)));
        let poller = Poller::new(policy);

        let submitted = client.post(&path, None).await?;
        let done = client
            .wait_on(
                &poller,
                id,
                submitted,
                OperationFamily::Confidence,
                Service::Api,
                |_| path.clone(),
            )
            .await?;

        Ok(done.body)
    }

    fn require_id(&self, action: &str) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| LumeError::missing_id("Result", action))
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
