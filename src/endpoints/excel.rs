//! Excel
//!
//! Workbook conversion and pivot tasks on the file-processing service.

use crate::api::client::{segment, LumeClient, Service};
use crate::api::http::{file_part, XLSX_MIME};
use crate::error::Result;
use crate::resource::{Page, Pagination};
use reqwest::multipart::Form;
use serde_json::Value;
use std::path::Path;

pub struct Excel;

impl Excel {
    /// Convert a workbook to structured JSON
    ///
    /// `name` is the uploaded file name including its extension; `sheets` is a
    /// comma-separated list of sheet names, empty for every sheet.
    pub async fn convert_sheets(
        client: &LumeClient,
        file: &Path,
        name: &str,
        sheets: &str,
    ) -> Result<Value> {
        let part = file_part(file, XLSX_MIME).await?.file_name(name.to_string());
        let form = Form::new()
            .part("file", part)
            .text("name", name.to_string())
            .text("sheets", sheets.to_string());

        client.upload(Service::Files, "convert/sheets", form).await
    }

    pub async fn pivot_tasks(client: &LumeClient, pagination: Pagination) -> Result<Page<Value>> {
        client
            .fetch_page_from(
                Service::Files,
                "excel/pivot",
                pagination.page(),
                pagination.size(),
            )
            .await
    }

    pub async fn pivot_task_status(client: &LumeClient, task_id: &str) -> Result<Value> {
        client
            .get_from(
                Service::Files,
                &format!("excel/pivot/{}", segment(task_id)),
                &[],
            )
            .await
    }

    /// Download location of a pivot task's workbook
    pub async fn pivot_task_url(client: &LumeClient, task_id: &str) -> Result<Value> {
        client
            .get_from(
                Service::Files,
                &format!("excel/pivot/{}/url", segment(task_id)),
                &[],
            )
            .await
    }
}
