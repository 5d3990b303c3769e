//! Pipelines
//!
//! A pipeline maps source data onto a target schema. Jobs, workshops and
//! the learned mapper all hang off a pipeline.

use super::job::Job;
use super::mapping::{Mapper, Mapping};
use super::results::JobResult;
use super::workshop::WorkShop;
use crate::api::client::{decode, segment, LumeClient, Service};
use crate::api::http::{file_part, XLSX_MIME};
use crate::error::{LumeError, Result};
use crate::operation::{lenient_id, OperationFamily};
use crate::resource::Pagination;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_schema_id: Option<String>,
    #[serde(default)]
    pub source_schema_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub target_schema: Option<Map<String, Value>>,
}

impl Pipeline {
    /// Fetch one page of pipelines
    pub async fn list_page(client: &LumeClient, pagination: Pagination) -> Result<Vec<Self>> {
        let page = client
            .fetch_page("pipelines", pagination.page(), pagination.size())
            .await?;
        Ok(page.items)
    }

    pub async fn create(
        client: &LumeClient,
        name: &str,
        target_schema: &Value,
        description: Option<&str>,
    ) -> Result<Self> {
        let payload = json!({
            "name": name,
            "target_schema": target_schema,
            "description": description,
        });
        decode("pipelines", client.post("pipelines", Some(&payload)).await?)
    }

    pub async fn get_by_id(client: &LumeClient, pipeline_id: &str) -> Result<Self> {
        let path = format!("pipelines/{}", segment(pipeline_id));
        decode(&path, client.get(&path).await?)
    }

    pub async fn update(
        &self,
        client: &LumeClient,
        name: &str,
        description: &str,
    ) -> Result<Self> {
        let path = format!("pipelines/{}", segment(self.require_id("updating")?));
        let payload = json!({ "name": name, "description": description });
        decode(&path, client.put(&path, &payload).await?)
    }

    pub async fn delete(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("deletion")?;
        client.delete(&format!("pipelines/{}", segment(id))).await
    }

    pub async fn create_job(&self, client: &LumeClient, source_data: &[Value]) -> Result<Job> {
        let id = self.require_id("creating a job")?;
        Job::create(client, id, source_data).await
    }

    /// Create a job on this pipeline and run it
    pub async fn run_job(
        &self,
        client: &LumeClient,
        source_data: &[Value],
        immediate: bool,
    ) -> Result<JobResult> {
        let job = self.create_job(client, source_data).await?;
        job.run(client, immediate).await
    }

    /// Fetch one page of this pipeline's workshops
    pub async fn get_workshops(
        &self,
        client: &LumeClient,
        pagination: Pagination,
    ) -> Result<Vec<WorkShop>> {
        let id = self.require_id("fetching workshops")?;
        let page = client
            .fetch_page(
                &format!("pipelines/{}/workshops", segment(id)),
                pagination.page(),
                pagination.size(),
            )
            .await?;
        Ok(page.items)
    }

    pub async fn create_workshop(&self, client: &LumeClient) -> Result<WorkShop> {
        let id = self.require_id("creating a workshop")?;
        let path = format!("pipelines/{}/workshops", segment(id));
        decode(&path, client.post(&path, None).await?)
    }

    pub async fn get_target_schema(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("fetching the target schema")?;
        client
            .get(&format!("pipelines/{}/target_schema", segment(id)))
            .await
    }

    /// Mapper learned for this pipeline; absent until a job has run
    pub async fn get_mapper(&self, client: &LumeClient) -> Result<Mapper> {
        let id = self.require_id("fetching the mapper")?;
        let path = format!("pipelines/{}/mapper", segment(id));

        match client.get(&path).await? {
            Value::Null => Err(LumeError::NotFound {
                what: "Mapper for pipeline",
                key: format!("{} (consider running the job first)", id),
            }),
            mapper => decode(&path, mapper),
        }
    }

    /// Ask the service to (re)learn the mapping, optionally for a subset of fields
    pub async fn learn(
        &self,
        client: &LumeClient,
        target_field_names: Option<&[String]>,
    ) -> Result<Value> {
        let id = self.require_id("learning")?;
        let payload = json!({ "target_field_names": target_field_names });
        client
            .post(&format!("pipelines/{}/learn", segment(id)), Some(&payload))
            .await
    }

    /// Run the pipeline over `source_data` and wait for the mapping
    pub async fn run_pipeline(
        &self,
        client: &LumeClient,
        source_data: &[Value],
        immediate: bool,
    ) -> Result<Mapping> {
        let id = self.require_id("running the pipeline")?;
        let payload = json!({ "data": source_data });
        let submitted = client
            .post(&format!("pipeline/{}/run", segment(id)), Some(&payload))
            .await?;

        client
            .wait_for(
                submitted,
                OperationFamily::Mapping,
                immediate,
                Service::Api,
                |mapping_id| format!("mappings/{}", segment(mapping_id)),
            )
            .await?
            .into_record()
    }

    /// Upload a workbook to be filled by the listed pipelines
    pub async fn upload_sheets(
        client: &LumeClient,
        file: &Path,
        pipeline_map_list: &str,
        second_table_row_to_insert: Option<u32>,
    ) -> Result<Value> {
        let mut form = Form::new()
            .part("file", file_part(file, XLSX_MIME).await?)
            .text("pipeline_map_list", pipeline_map_list.to_string());

        if let Some(row) = second_table_row_to_insert {
            form = form.text("second_table_row_to_insert", row.to_string());
        }

        client
            .upload(Service::Api, "crud/pipelines/upload/sheets", form)
            .await
    }

    /// Populate spreadsheets from the output of several pipelines
    pub async fn populate_sheets(
        client: &LumeClient,
        pipeline_ids: &str,
        populate_excel_payload: &str,
        file_type: &str,
    ) -> Result<Value> {
        let payload = json!({
            "pipeline_ids": pipeline_ids,
            "populate_excel_payload": populate_excel_payload,
            "file_type": file_type,
        });
        client
            .post("pipelines/populate/sheets", Some(&payload))
            .await
    }

    pub async fn get_images(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("fetching images")?;
        client
            .post(&format!("pipelines/{}/populate/images", segment(id)), None)
            .await
    }

    fn require_id(&self, action: &str) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| LumeError::missing_id("Pipeline", action))
    }
}
