//! # fm-data-rest
//!
//! Endpoint adapters for the FileMaker Data API, built on
//! [`fm_data_client`].
//!
//! ## Features
//!
//! - **Records** - Create, edit, duplicate, delete, get, and list records
//! - **Find** - Compound find requests with operator encoding, sorting,
//!   and portal pagination
//! - **Scripts** - Standalone script execution and script hooks on record
//!   operations
//! - **Metadata** - Database, layout, and script discovery plus product info
//! - **Global fields** - Session-scoped global field values
//! - **Containers** - File upload into container fields and raw downloads
//!
//! ## Example
//!
//! ```rust,ignore
//! use fm_data_client::{CancellationToken, Client};
//! use fm_data_rest::{FieldOperator, FindBuilder, SortOrder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fm_data_client::Error> {
//!     let client = Client::builder()
//!         .base_url("https://fms.example.com")
//!         .basic_auth("admin", "secret")
//!         .build()?;
//!
//!     let found = FindBuilder::new(client, "Contacts", "People")
//!         .where_("LastName", FieldOperator::Equal, "Smith")
//!         .or_where("City", FieldOperator::Contains, "York")
//!         .order_by("LastName", SortOrder::Ascend)
//!         .limit(50)
//!         .perform(&CancellationToken::new())
//!         .await?;
//!
//!     for record in &found.response.data {
//!         println!("{:?}", record.field_data);
//!     }
//!     Ok(())
//! }
//! ```

mod builder;
mod containers;
mod find;
mod globals;
mod metadata;
mod query;
mod records;
mod scripts;
mod validate;

pub use builder::RecordBuilder;
pub use containers::ContainerService;
pub use find::{FindBuilder, FindService, PortalConfig};
pub use globals::GlobalFieldsService;
pub use metadata::MetadataService;
pub use query::{FieldOperator, FieldQuery, QueryGroup, SortOrder, Sorter};
pub use records::{ListOptions, Payload, RecordService};
pub use scripts::{ScriptCall, ScriptOptions, ScriptService};

// Re-export the core client types users need alongside the adapters.
pub use fm_data_client::{
    AuthStrategy, CancellationToken, Client, ClientConfig, Envelope, Error, ErrorKind, Record,
    Result,
};

#[cfg(test)]
pub(crate) mod test_support {
    use fm_data_client::{Client, ClientConfig};
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub fn test_client(server: &MockServer) -> Client {
        Client::builder()
            .base_url(server.uri())
            .basic_auth("admin", "secret")
            .config(ClientConfig::builder().without_retry().build())
            .build()
            .unwrap()
    }

    pub fn ok_envelope() -> serde_json::Value {
        serde_json::json!({
            "response": {},
            "messages": [{ "code": "0", "message": "OK" }]
        })
    }

    pub fn record_envelope(record_id: &str, mod_id: &str) -> serde_json::Value {
        serde_json::json!({
            "response": { "recordId": record_id, "modId": mod_id },
            "messages": [{ "code": "0", "message": "OK" }]
        })
    }

    /// Mount session create and release mocks for `database`; the session
    /// token is always `tok-1`.
    pub async fn mock_session(server: &MockServer, database: &str) {
        Mock::given(method("POST"))
            .and(wiremock::matchers::path(format!(
                "/fmi/data/vLatest/databases/{database}/sessions"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": { "token": "tok-1" },
                "messages": [{ "code": "0", "message": "OK" }]
            })))
            .mount(server)
            .await;

        Mock::given(method("DELETE"))
            .and(path_regex(format!(
                "^/fmi/data/vLatest/databases/{database}/sessions/.+$"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
            .mount(server)
            .await;
    }
}
