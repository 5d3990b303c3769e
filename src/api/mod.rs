//! Lume API interaction module
//!
//! Transport and client used by every endpoint wrapper.
//!
//! # Module Structure
//!
//! - [`client`] - Main Lume client: base URLs, request helpers, operation waiting
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use lume::api::client::LumeClient;
//!
//! async fn example() -> lume::Result<()> {
//!     let client = LumeClient::new("my-api-key")?;
//!     let pipeline = client.get("pipelines/p-123").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
