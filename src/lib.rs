//! # fm-data-api
//!
//! A FileMaker Data API client library for Rust.
//!
//! This library provides typed access to the Data API with session
//! management, pluggable authentication, retry logic, and cooperative
//! cancellation.
//!
//! ## Security
//!
//! - Credentials and session tokens are redacted in Debug output
//! - Tracing skips credential parameters
//!
//! ## Crates
//!
//! - **fm-data-client** - Core client: sessions, auth strategies, retry,
//!   error classification
//! - **fm-data-rest** - Endpoint adapters: records, find queries, scripts,
//!   metadata, global fields, containers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fm_data_api::{CancellationToken, Client};
//! use fm_data_api::rest::{FieldOperator, FindBuilder, SortOrder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .base_url("https://fms.example.com")
//!         .basic_auth("admin", "secret")
//!         .build()?;
//!
//!     let found = FindBuilder::new(client, "Contacts", "People")
//!         .where_("LastName", FieldOperator::Equal, "Smith")
//!         .order_by("LastName", SortOrder::Ascend)
//!         .limit(50)
//!         .perform(&CancellationToken::new())
//!         .await?;
//!
//!     for record in &found.response.data {
//!         println!("{:?}", record.field_data);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Re-export the member crates for convenient access
#[cfg(feature = "client")]
pub use fm_data_client as client;
#[cfg(feature = "rest")]
pub use fm_data_rest as rest;

// Re-export commonly used types at the top level
#[cfg(feature = "client")]
pub use fm_data_client::{
    AuthStrategy, CancellationToken, Client, ClientConfig, Envelope, Error, ErrorKind, Result,
    RetryConfig,
};
#[cfg(feature = "rest")]
pub use fm_data_rest::{FindBuilder, RecordBuilder, RecordService};
