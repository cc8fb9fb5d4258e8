//! # fm-data-client
//!
//! Core HTTP client infrastructure for the FileMaker Data API.
//!
//! This crate provides the foundational client with:
//! - Session lifecycle management (create, validate, release)
//! - Pluggable authentication strategies (Basic, external datasource,
//!   OAuth, Claris ID)
//! - Automatic retry with exponential backoff and jitter
//! - Cooperative cancellation via [`CancellationToken`]
//! - An error taxonomy separating caller mistakes, transient faults, and
//!   server-reported business errors
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Endpoint Adapters                        │
//! │  (fm-data-rest: records, find, scripts, metadata, ...)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ RequestSpec
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Client                               │
//! │  - Session create / with_session bracket / release          │
//! │  - execute(): retry engine wraps one transport attempt      │
//! │  - Envelope decoding and error classification               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use fm_data_client::{Client, CancellationToken};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fm_data_client::Error> {
//!     let client = Client::builder()
//!         .base_url("https://fms.example.com")
//!         .basic_auth("admin", "secret")
//!         .build()?;
//!
//!     let cancel = CancellationToken::new();
//!     client
//!         .with_session(&cancel, "Contacts", None, |token| async move {
//!             // issue session-scoped requests with `token`
//!             Ok(())
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod config;
mod error;
mod request;
mod response;
mod retry;
mod session;

pub use auth::AuthStrategy;
pub use client::{Client, ClientBuilder, DEFAULT_VERSION};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{check_envelope, Error, ErrorKind, Result};
pub use request::{RequestAuth, RequestBody, RequestMethod, RequestSpec};
pub use response::{
    DataInfo, DatabaseInfo, Envelope, EnvelopeBody, FieldMetaData, LayoutInfo, Message,
    ProductInfo, Record, ScriptInfo, ValueList, ValueListEntry,
};
pub use retry::{RetryCallback, RetryConfig};

// Re-exported so downstream crates do not need a direct tokio-util
// dependency to drive cancellation.
pub use tokio_util::sync::CancellationToken;

/// User-Agent sent with every request unless overridden in [`ClientConfig`].
pub const USER_AGENT: &str = concat!("fm-data-api/", env!("CARGO_PKG_VERSION"));
