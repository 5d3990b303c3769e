//! Integration tests for the Lume client using wiremock
//!
//! These tests run endpoint wrappers against mocked services, checking the
//! wire format (paths, headers, query parameters, multipart fields) and how
//! responses and failures surface.

use lume::{
    Excel, Job, JobResult, LumeClient, LumeError, Pagination, Pdf, Pipeline, PollPolicy, Status,
    Target, WorkShop,
};
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

/// Client whose both services point at `server`, polling without delay
fn client_for(server: &MockServer) -> LumeClient {
    LumeClient::with_base_urls(KEY, &server.uri(), &format!("{}/crud", server.uri()))
        .unwrap()
        .with_poll_policy(PollPolicy::busy().with_timeout(Some(Duration::from_secs(5))))
}

mod transport_tests {
    use super::*;

    /// Every request carries the API key; list calls carry page and size
    #[tokio::test]
    async fn test_api_key_and_pagination_parameters_are_sent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jobs"))
            .and(header("lume-api-key", KEY))
            .and(query_param("page", "3"))
            .and(query_param("size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "j-1", "status": "created"}],
                "page": 3,
                "size": 10
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let jobs = Job::list(&client, Pagination::new(3, 10).unwrap(), false)
            .await
            .expect("listing should succeed");

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id.as_deref(), Some("j-1"));
    }

    /// Non-2xx answers become HTTP errors carrying status, URL and body
    #[tokio::test]
    async fn test_error_status_surfaces_as_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pipelines/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"detail": "Pipeline not found"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = Pipeline::get_by_id(&client, "missing").await.unwrap_err();

        match &err {
            LumeError::Http {
                method,
                url,
                status,
                body,
            } => {
                assert_eq!(method, "GET");
                assert!(url.ends_with("/pipelines/missing"));
                assert_eq!(status.as_u16(), 404);
                assert!(body.contains("Pipeline not found"));
            },
            other => panic!("expected an HTTP error, got {other:?}"),
        }
        assert_eq!(lume::api::http::format_api_error(&err), "Resource not found.");
    }

    /// Empty success bodies decode to null instead of failing
    #[tokio::test]
    async fn test_empty_delete_response_is_null() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/jobs/j-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let job = Job {
            id: Some("j-1".to_string()),
            ..Default::default()
        };

        assert!(job.delete(&client).await.unwrap().is_null());
    }

    /// Identifiers are percent-encoded into a single path segment
    #[tokio::test]
    async fn test_ids_are_encoded_in_paths() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/workshops/a%2Fb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a/b"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let workshop = WorkShop::get_by_id(&client, "a/b").await.unwrap();
        assert_eq!(workshop.id.as_deref(), Some("a/b"));
    }
}

mod validation_tests {
    use super::*;

    /// Operations on unsaved records fail before anything is sent
    #[tokio::test]
    async fn test_missing_id_sends_no_request() {
        let server = MockServer::start().await;

        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);

        assert!(matches!(
            Job::default().run(&client, false).await,
            Err(LumeError::Validation(_))
        ));
        assert!(matches!(
            Pipeline::default().create_job(&client, &[json!({"a": 1})]).await,
            Err(LumeError::Validation(_))
        ));
        assert!(matches!(
            WorkShop::default().deploy(&client).await,
            Err(LumeError::Validation(_))
        ));
        assert!(matches!(
            JobResult::default()
                .generate_confidence_scores(&client, None)
                .await,
            Err(LumeError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_find_target_reports_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/target_schemas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "t-1", "name": "orders"}, {"id": "t-2", "name": "invoices"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let found = Target::find_by_id(&client, "t-2", Pagination::default())
            .await
            .unwrap();
        assert_eq!(found.name.as_deref(), Some("invoices"));

        let err = Target::find_by_id(&client, "t-9", Pagination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LumeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_null_mapper_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pipelines/p-1/mapper"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let pipeline = Pipeline {
            id: Some("p-1".to_string()),
            ..Default::default()
        };

        let err = pipeline.get_mapper(&client).await.unwrap_err();
        assert!(matches!(
            err,
            LumeError::NotFound {
                what: "Mapper for pipeline",
                ..
            }
        ));
    }
}

mod operation_tests {
    use super::*;

    /// Running a job polls its result until the run settles
    #[tokio::test]
    async fn test_job_run_polls_result_until_finished() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/jobs/j-1/run"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "r-1", "status": "queued"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/results/r-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "r-1", "status": "running"})),
            )
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/results/r-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "r-1",
                "status": "finished",
                "created_at": "2024-05-01T10:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let job = Job {
            id: Some("j-1".to_string()),
            ..Default::default()
        };

        let result = job.run(&client, false).await.unwrap();
        assert_eq!(result.status.as_deref(), Some("finished"));
        assert_eq!(result.created_at.as_deref(), Some("2024-05-01T10:00:00Z"));
    }

    #[tokio::test]
    async fn test_immediate_run_returns_submission() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/jobs/j-1/run"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "r-1", "status": "queued"})),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/results/r-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let job = Job {
            id: Some("j-1".to_string()),
            ..Default::default()
        };

        let result = job.run(&client, true).await.unwrap();
        assert_eq!(result.status.as_deref(), Some("queued"));
    }

    #[tokio::test]
    async fn test_pipeline_run_posts_data_and_polls_mapping() {
        let server = MockServer::start().await;
        let records = vec![json!({"title": "Chair", "weight_kg": 4})];

        Mock::given(method("POST"))
            .and(path("/pipeline/p-1/run"))
            .and(body_json(json!({ "data": records })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "m-1", "status": "queued"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/mappings/m-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "m-1",
                "status": "succeeded",
                "pipeline_id": "p-1",
                "mapped_data": [{"product.name": "Chair"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let pipeline = Pipeline {
            id: Some("p-1".to_string()),
            ..Default::default()
        };

        let mapping = pipeline
            .run_pipeline(&client, &records, false)
            .await
            .unwrap();
        let mapped = mapping.mapped_data.unwrap();
        assert_eq!(mapped[0]["product.name"], "Chair");
    }

    #[tokio::test]
    async fn test_workshop_prompt_run_sends_named_field() {
        let server = MockServer::start().await;
        let fields = json!(["product.color"]);

        Mock::given(method("POST"))
            .and(path("/workshops/w-1/prompt/run"))
            .and(body_json(json!({ "target_fields_to_prompt": fields })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "r-5", "status": "finished"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let workshop = WorkShop {
            id: Some("w-1".to_string()),
            ..Default::default()
        };

        let result = workshop.run_prompt(&client, &fields, false).await.unwrap();
        assert_eq!(result.id.as_deref(), Some("r-5"));
    }

    /// Numeric ids in a run's answer decode into the result record
    #[tokio::test]
    async fn test_job_run_accepts_numeric_result_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/jobs/j-1/run"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 5, "status": "finished"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let job = Job {
            id: Some("j-1".to_string()),
            ..Default::default()
        };

        let result = job.run(&client, false).await.unwrap();
        assert_eq!(result.id.as_deref(), Some("5"));
        assert_eq!(result.status.as_deref(), Some("finished"));
    }

    /// Confidence payloads only carry a status; the result id drives polling
    #[tokio::test]
    async fn test_confidence_scores_without_ids_use_result_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/results/r-1/confidence"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/results/r-1/confidence"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "finished",
                "scores": {"product.name": 0.9}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = JobResult {
            id: Some("r-1".to_string()),
            ..Default::default()
        };

        let scores = result
            .generate_confidence_scores(&client, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(scores["scores"]["product.name"], 0.9);
        assert_eq!(scores["status"], "finished");
    }

    /// A status that never settles ends in a timeout, not a hang
    #[tokio::test]
    async fn test_stuck_confidence_scores_time_out() {
        let server = MockServer::start().await;

        Mock::given(path("/results/r-1/confidence"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "r-1", "status": "running"})),
            )
            .mount(&server)
            .await;

        let client = LumeClient::with_base_urls(KEY, &server.uri(), &server.uri())
            .unwrap()
            .with_poll_policy(PollPolicy::fixed(Duration::from_millis(10)));
        let result = JobResult {
            id: Some("r-1".to_string()),
            ..Default::default()
        };

        let err = result
            .generate_confidence_scores(&client, Some(Duration::from_millis(100)))
            .await
            .unwrap_err();

        match err {
            LumeError::Timeout { id, last_status, .. } => {
                assert_eq!(id, "r-1");
                assert_eq!(last_status, Status::Running);
            },
            other => panic!("expected a timeout, got {other:?}"),
        }
    }
}

mod upload_tests {
    use super::*;

    fn temp_file(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[tokio::test]
    async fn test_convert_sheets_uploads_named_parts_to_files_service() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crud/convert/sheets"))
            .and(header("lume-api-key", KEY))
            .and(body_string_contains("name=\"file\"; filename=\"catalog.xlsx\""))
            .and(body_string_contains("name=\"sheets\""))
            .and(body_string_contains("Sheet1,Sheet2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Sheet1": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let workbook = temp_file(".xlsx", b"PK\x03\x04workbook");

        let converted =
            Excel::convert_sheets(&client, workbook.path(), "catalog.xlsx", "Sheet1,Sheet2")
                .await
                .unwrap();
        assert!(converted.get("Sheet1").is_some());
    }

    #[tokio::test]
    async fn test_upload_sheets_sends_optional_row_only_when_set() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crud/pipelines/upload/sheets"))
            .and(body_string_contains("name=\"pipeline_map_list\""))
            .and(body_string_contains("name=\"second_table_row_to_insert\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let workbook = temp_file(".xlsx", b"PK\x03\x04workbook");

        let response = Pipeline::upload_sheets(&client, workbook.path(), "p-1,p-2", Some(5))
            .await
            .unwrap();
        assert_eq!(response["ok"], true);
    }

    #[tokio::test]
    async fn test_pdf_extraction_polls_document_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/crud/pdf/orders"))
            .and(body_string_contains("application/pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 42, "status": "QUEUED"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/crud/pdf/orders/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42,
                "status": "SUCCESS",
                "data": {"order_number": "PO-7"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let document = temp_file(".pdf", b"%PDF-1.4");

        let extracted = Pdf::extract_pdf(&client, document.path(), false)
            .await
            .unwrap();
        assert_eq!(extracted["data"]["order_number"], "PO-7");
    }

    #[tokio::test]
    async fn test_pdf_url_requires_url_field() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/crud/pdf/adv/7/url"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"url": "https://files/7.pdf"})),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/crud/pdf/orders/7/url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);

        assert_eq!(
            Pdf::get_adv_url(&client, "7").await.unwrap(),
            "https://files/7.pdf"
        );
        assert!(matches!(
            Pdf::get_pdf_url(&client, "7").await,
            Err(LumeError::UnexpectedResponse(_))
        ));
    }
}
