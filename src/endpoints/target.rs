//! Target schemas
//!
//! JSON schemas that pipelines map source data onto.

use crate::api::client::{decode, segment, LumeClient};
use crate::error::{LumeError, Result};
use crate::operation::lenient_id;
use crate::resource::{collect, Pagination};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub schema: Option<Map<String, Value>>,
}

impl Target {
    pub async fn list(
        client: &LumeClient,
        pagination: Pagination,
        all: bool,
    ) -> Result<Vec<Self>> {
        collect(pagination, all, |page, size| {
            client.fetch_page("target_schemas", page, size)
        })
        .await
    }

    pub async fn create(
        client: &LumeClient,
        target_schema: &Value,
        name: &str,
        filename: &str,
    ) -> Result<Self> {
        let payload = json!({
            "name": name,
            "schema": target_schema,
            "filename": filename,
        });
        decode(
            "target_schemas",
            client.post("target_schemas", Some(&payload)).await?,
        )
    }

    /// Raw schema document of a target
    pub async fn get_schema_by_id(client: &LumeClient, target_id: &str) -> Result<Value> {
        client
            .get(&format!("target_schemas/{}", segment(target_id)))
            .await
    }

    /// Find a target by id within one listing page
    ///
    /// Only the page described by `pagination` is scanned.
    pub async fn find_by_id(
        client: &LumeClient,
        target_id: &str,
        pagination: Pagination,
    ) -> Result<Self> {
        Self::list(client, pagination, false)
            .await?
            .into_iter()
            .find(|t| t.id.as_deref() == Some(target_id))
            .ok_or_else(|| LumeError::NotFound {
                what: "Target schema",
                key: target_id.to_string(),
            })
    }

    pub async fn get_schema(&self, client: &LumeClient) -> Result<Value> {
        Self::get_schema_by_id(client, self.require_id("fetching the schema")?).await
    }

    pub async fn delete(&self, client: &LumeClient) -> Result<Value> {
        let id = self.require_id("deletion")?;
        client
            .delete(&format!("target_schemas/{}", segment(id)))
            .await
    }

    /// Replace name, filename and schema; returns the service's answer as is
    pub async fn update(
        &self,
        client: &LumeClient,
        name: &str,
        filename: &str,
        target_schema: &Value,
    ) -> Result<Value> {
        let id = self.require_id("updating")?;
        let payload = json!({
            "name": name,
            "filename": filename,
            "schema": target_schema,
        });
        client
            .put(&format!("target_schemas/{}/update", segment(id)), &payload)
            .await
    }

    pub async fn get_object(&self, client: &LumeClient) -> Result<Self> {
        let id = self.require_id("fetching the object")?;
        let path = format!("target_schemas/{}/object", segment(id));
        decode(&path, client.get(&path).await?)
    }

    /// Infer a target schema from a sample record
    pub async fn generate(client: &LumeClient, sample: &Value) -> Result<Value> {
        let payload = json!({ "sample": sample });
        client
            .post("target_schemas/generate", Some(&payload))
            .await
    }

    fn require_id(&self, action: &str) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| LumeError::missing_id("Target", action))
    }
}
