//! Jobs
//!
//! A job binds source data to a pipeline. Running it produces a
//! [`JobResult`].

use super::results::JobResult;
use super::workshop::WorkShop;
use crate::api::client::{decode, segment, LumeClient, Service};
use crate::error::{LumeError, Result};
use crate::operation::{lenient_id, OperationFamily};
use crate::resource::{collect, Pagination};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub target_schema_id: Option<String>,
    #[serde(default)]
    pub source_schema_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Job {
    pub async fn list(
        client: &LumeClient,
        pagination: Pagination,
        all: bool,
    ) -> Result<Vec<Self>> {
        collect(pagination, all, |page, size| {
            client.fetch_page("jobs", page, size)
        })
        .await
    }

    /// Create a job feeding `source_data` into a pipeline
    pub async fn create(
        client: &LumeClient,
        pipeline_id: &str,
        source_data: &[Value],
    ) -> Result<Self> {
        let path = format!("pipelines/{}/jobs", segment(pipeline_id));
        let payload = json!({ "data": source_data });
        decode(&path, client.post(&path, Some(&payload)).await?)
    }

    pub async fn get_by_id(client: &LumeClient, job_id: &str) -> Result<Self> {
        let path = format!("jobs/{}", segment(job_id));
        decode(&path, client.get(&path).await?)
    }

    pub async fn delete(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("deletion")?;
        client.delete(&format!("jobs/{}", segment(id))).await
    }

    /// Run the job
    ///
    /// With `immediate` the submission response is returned as is;
    /// otherwise `results/{id}` is polled until the run settles.
    pub async fn run(&self, client: &LumeClient, immediate: bool) -> Result<JobResult> {
        let id = self.require_id("running")?;
        let submitted = client
            .post(&format!("jobs/{}/run", segment(id)), None)
            .await?;

        client
            .wait_for(
                submitted,
                OperationFamily::Result,
                immediate,
                Service::Api,
                |result_id| format!("results/{}", segment(result_id)),
            )
            .await?
            .into_record()
    }

    /// Create then run a job in one call
    pub async fn create_and_run(
        client: &LumeClient,
        pipeline_id: &str,
        source_data: &[Value],
        immediate: bool,
    ) -> Result<JobResult> {
        let job = Self::create(client, pipeline_id, source_data).await?;
        tracing::debug!("Created job {:?} on pipeline {}", job.id, pipeline_id);
        job.run(client, immediate).await
    }

    pub async fn create_workshop(&self, client: &LumeClient) -> Result<WorkShop> {
        let id = self.require_id("creating a workshop")?;
        let path = format!("jobs/{}/workshops", segment(id));
        decode(&path, client.post(&path, None).await?)
    }

    pub async fn get_workshops(
        &self,
        client: &LumeClient,
        pagination: Pagination,
        all: bool,
    ) -> Result<Vec<WorkShop>> {
        let id = self.require_id("fetching workshops")?;
        let path = format!("jobs/{}/workshops", segment(id));
        collect(pagination, all, |page, size| client.fetch_page(&path, page, size)).await
    }

    pub async fn get_target_schema(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("fetching the target schema")?;
        client
            .get(&format!("jobs/{}/target_schema", segment(id)))
            .await
    }

    pub async fn get_results(
        &self,
        client: &LumeClient,
        pagination: Pagination,
        all: bool,
    ) -> Result<Vec<JobResult>> {
        let id = self.require_id("fetching results")?;
        let path = format!("jobs/{}/results", segment(id));
        collect(pagination, all, |page, size| client.fetch_page(&path, page, size)).await
    }

    fn require_id(&self, action: &str) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| LumeError::missing_id("Job", action))
    }
}
