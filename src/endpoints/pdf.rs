//! PDF
//!
//! Document extraction on the file-processing service. Two flows share the
//! same shape: ADV forms (`pdf/adv`) and orders (`pdf/orders`).

use crate::api::client::{segment, LumeClient, Service};
use crate::api::http::{file_part, PDF_MIME};
use crate::error::{LumeError, Result};
use crate::operation::OperationFamily;
use crate::resource::{Page, Pagination};
use reqwest::multipart::Form;
use serde_json::Value;
use std::path::Path;

const ADV_FORMS: &str = "pdf/adv";
const ORDERS: &str = "pdf/orders";

pub struct Pdf;

impl Pdf {
    /// Process an ADV form and wait for the extraction unless `immediate`
    pub async fn process_adv_form(
        client: &LumeClient,
        file: &Path,
        immediate: bool,
    ) -> Result<Value> {
        Self::submit(client, ADV_FORMS, file, immediate).await
    }

    pub async fn get_adv_form(client: &LumeClient, pdf_id: &str) -> Result<Value> {
        Self::get(client, ADV_FORMS, pdf_id).await
    }

    pub async fn adv_forms_page(
        client: &LumeClient,
        pagination: Pagination,
    ) -> Result<Page<Value>> {
        Self::page(client, ADV_FORMS, pagination).await
    }

    pub async fn get_adv_url(client: &LumeClient, pdf_id: &str) -> Result<String> {
        Self::url(client, ADV_FORMS, pdf_id).await
    }

    /// Extract an order PDF and wait for the extraction unless `immediate`
    pub async fn extract_pdf(client: &LumeClient, file: &Path, immediate: bool) -> Result<Value> {
        Self::submit(client, ORDERS, file, immediate).await
    }

    pub async fn pdfs_page(client: &LumeClient, pagination: Pagination) -> Result<Page<Value>> {
        Self::page(client, ORDERS, pagination).await
    }

    pub async fn get_pdf(client: &LumeClient, pdf_id: &str) -> Result<Value> {
        Self::get(client, ORDERS, pdf_id).await
    }

    pub async fn get_pdf_url(client: &LumeClient, pdf_id: &str) -> Result<String> {
        Self::url(client, ORDERS, pdf_id).await
    }

    async fn submit(
        client: &LumeClient,
        collection: &'static str,
        file: &Path,
        immediate: bool,
    ) -> Result<Value> {
        let form = Form::new().part("file", file_part(file, PDF_MIME).await?);
        let submitted = client.upload(Service::Files, collection, form).await?;

        let done = client
            .wait_for(
                submitted,
                OperationFamily::Document,
                immediate,
                Service::Files,
                |id| format!("{}/{}", collection, segment(id)),
            )
            .await?;
        Ok(done.body)
    }

    async fn get(client: &LumeClient, collection: &str, pdf_id: &str) -> Result<Value> {
        client
            .get_from(
                Service::Files,
                &format!("{}/{}", collection, segment(pdf_id)),
                &[],
            )
            .await
    }

    async fn page(
        client: &LumeClient,
        collection: &str,
        pagination: Pagination,
    ) -> Result<Page<Value>> {
        client
            .fetch_page_from(
                Service::Files,
                collection,
                pagination.page(),
                pagination.size(),
            )
            .await
    }

    async fn url(client: &LumeClient, collection: &str, pdf_id: &str) -> Result<String> {
        let body = client
            .get_from(
                Service::Files,
                &format!("{}/{}/url", collection, segment(pdf_id)),
                &[],
            )
            .await?;
        extract_url(&body)
    }
}

fn extract_url(body: &Value) -> Result<String> {
    body.get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LumeError::UnexpectedResponse("response has no `url` field".to_string()))
}
