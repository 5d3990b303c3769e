//! Async client for the Lume data-mapping service
//!
//! Pipelines map source records onto a target schema. Jobs feed data into a
//! pipeline and produce results; workshops iterate on a mapping before it is
//! deployed. Excel and PDF helpers talk to the file-processing service.
//!
//! ```ignore
//! use lume::{LumeClient, Pipeline};
//!
//! async fn run(client: &LumeClient) -> lume::Result<()> {
//!     let pipeline = Pipeline::get_by_id(client, "p-123").await?;
//!     let result = pipeline
//!         .run_job(client, &[serde_json::json!({"title": "Chair"})], false)
//!         .await?;
//!     println!("{:?}", result.status);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod operation;
pub mod resource;

pub use api::client::{LumeClient, Service};
pub use config::Config;
pub use endpoints::{
    Excel, Job, JobResult, Mapper, MapperField, Mapping, Pdf, Pipeline, ResultMapper, Target,
    WorkShop, WorkshopRun,
};
pub use error::{LumeError, Result};
pub use operation::{Operation, OperationFamily, Status};
pub use resource::{Page, Pagination, PollPolicy, Poller};
