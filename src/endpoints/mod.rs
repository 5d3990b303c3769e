//! Typed wrappers over the Lume REST endpoints
//!
//! Records are plain serde structs; operations take the [`LumeClient`]
//! explicitly so one client can serve many records concurrently.
//!
//! [`LumeClient`]: crate::api::client::LumeClient

pub mod excel;
pub mod job;
pub mod mapping;
pub mod pdf;
pub mod pipeline;
pub mod results;
pub mod target;
pub mod workshop;

pub use excel::Excel;
pub use job::Job;
pub use mapping::{Mapper, MapperField, Mapping};
pub use pdf::Pdf;
pub use pipeline::Pipeline;
pub use results::{JobResult, ResultMapper, CONFIDENCE_TIMEOUT};
pub use target::Target;
pub use workshop::{WorkShop, WorkshopRun};
