//! Workshops
//!
//! Sandboxes for iterating on a job's mapping: run the mapper, samples,
//! schema changes or prompts, then deploy.

use super::results::JobResult;
use crate::api::client::{decode, segment, LumeClient, Service};
use crate::error::{LumeError, Result};
use crate::operation::{lenient_id, OperationFamily};
use crate::resource::{collect, Pagination};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkShop {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
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

/// Kind of workshop run; each posts a single named field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkshopRun {
    Mapper,
    Sample,
    TargetSchema,
    Prompt,
}

impl WorkshopRun {
    fn path_segment(&self) -> &'static str {
        match self {
            Self::Mapper => "mapper",
            Self::Sample => "sample",
            Self::TargetSchema => "target_schema",
            Self::Prompt => "prompt",
        }
    }

    fn payload_key(&self) -> &'static str {
        match self {
            Self::Mapper => "mapper",
            Self::Sample => "sample",
            Self::TargetSchema => "target_schema",
            Self::Prompt => "target_fields_to_prompt",
        }
    }
}

impl WorkShop {
    /// List workshops (one page, or every page with `all`)
    pub async fn list(
        client: &LumeClient,
        pagination: Pagination,
        all: bool,
    ) -> Result<Vec<Self>> {
        collect(pagination, all, |page, size| {
            client.fetch_page("workshops", page, size)
        })
        .await
    }

    pub async fn get_by_id(client: &LumeClient, workshop_id: &str) -> Result<Self> {
        let path = format!("workshops/{}", segment(workshop_id));
        decode(&path, client.get(&path).await?)
    }

    /// Re-fetch this workshop
    pub async fn get_details(&self, client: &LumeClient) -> Result<Self> {
        Self::get_by_id(client, self.require_id("fetching details")?).await
    }

    /// Delete this workshop; returns the service's confirmation payload
    pub async fn delete(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("deletion")?;
        client.delete(&format!("workshops/{}", segment(id))).await
    }

    pub async fn run_mapper(
        &self,
        client: &LumeClient,
        mapper: &[Value],
        immediate: bool,
    ) -> Result<JobResult> {
        self.run(client, WorkshopRun::Mapper, json!(mapper), immediate)
            .await
    }

    pub async fn run_sample(
        &self,
        client: &LumeClient,
        sample: &Value,
        immediate: bool,
    ) -> Result<JobResult> {
        self.run(client, WorkshopRun::Sample, sample.clone(), immediate)
            .await
    }

    pub async fn run_target_schema(
        &self,
        client: &LumeClient,
        target_schema: &Value,
        immediate: bool,
    ) -> Result<JobResult> {
        self.run(client, WorkshopRun::TargetSchema, target_schema.clone(), immediate)
            .await
    }

    pub async fn run_prompt(
        &self,
        client: &LumeClient,
        target_fields_to_prompt: &Value,
        immediate: bool,
    ) -> Result<JobResult> {
        self.run(
            client,
            WorkshopRun::Prompt,
            target_fields_to_prompt.clone(),
            immediate,
        )
        .await
    }

    /// Submit a run and wait for its result unless `immediate`
    pub async fn run(
        &self,
        client: &LumeClient,
        kind: WorkshopRun,
        input: Value,
        immediate: bool,
    ) -> Result<JobResult> {
        let id = self.require_id("running")?;
        let path = format!("workshops/{}/{}/run", segment(id), kind.path_segment());

        let mut payload = serde_json::Map::new();
        payload.insert(kind.payload_key().to_string(), input);

        let submitted = client.post(&path, Some(&Value::Object(payload))).await?;
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

    /// Deploy this workshop's mapping back to its pipeline
    pub async fn deploy(&self, client: &LumeClient) -> Result<Self> {
        let id = self.require_id("deployment")?;
        let path = format!("workshops/{}/deploy", segment(id));
        decode(&path, client.post(&path, None).await?)
    }

    pub async fn get_results(
        &self,
        client: &LumeClient,
        pagination: Pagination,
        all: bool,
    ) -> Result<Vec<JobResult>> {
        let id = self.require_id("fetching results")?;
        let path = format!("workshops/{}/results", segment(id));
        collect(pagination, all, |page, size| client.fetch_page(&path, page, size)).await
    }

    pub async fn get_target_schema(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("fetching the target schema")?;
        client
            .get(&format!("workshops/{}/target_schema", segment(id)))
            .await
    }

    /// Mapping transformations currently defined in this workshop
    pub async fn get_mapping(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("fetching the mapping")?;
        client.get(&format!("workshops/{}/mapper", segment(id))).await
    }

    fn require_id(&self, action: &str) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| LumeError::missing_id("Workshop", action))
    }
}
