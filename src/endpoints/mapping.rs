//! Mappings
//!
//! Mapped output of pipeline runs, plus the learned mapper a pipeline
//! applies to its source data.

use crate::api::client::{decode, segment, LumeClient};
use crate::error::{LumeError, Result};
use crate::operation::lenient_id;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Output of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub mapped_data: Option<Vec<Map<String, Value>>>,
}

impl Mapping {
    /// Map `data` onto `target_schema` in one shot
    pub async fn create(
        client: &LumeClient,
        data: &[Value],
        name: &str,
        description: &str,
        target_schema: &Value,
    ) -> Result<Self> {
        let payload = json!({
            "data": data,
            "name": name,
            "description": description,
            "target_schema": target_schema,
        });
        decode("mapping", client.post("mapping", Some(&payload)).await?)
    }

    pub async fn get_by_id(client: &LumeClient, mapping_id: &str) -> Result<Self> {
        let path = format!("mappings/{}", segment(mapping_id));
        decode(&path, client.get(&path).await?)
    }

    /// Re-fetch this mapping
    pub async fn get_details(&self, client: &LumeClient) -> Result<Self> {
        let id = self
            .id
            .as_deref()
            .ok_or_else(|| LumeError::missing_id("Mapping", "fetching details"))?;
        Self::get_by_id(client, id).await
    }
}

/// Transformation learned for a single target field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapperField {
    /// Target field name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Field-by-field mapping a pipeline applies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mapper {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub pipeline_id: Option<String>,
    #[serde(default, alias = "mapper")]
    pub fields: Vec<MapperField>,
}

impl Mapper {
    /// Look up the transformation of a target field
    pub fn field(&self, name: &str) -> Result<&MapperField> {
        self.fields
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .ok_or_else(|| LumeError::NotFound {
                what: "Mapper field",
                key: name.to_string(),
            })
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().filter_map(|f| f.name.as_deref()).collect()
    }
}
