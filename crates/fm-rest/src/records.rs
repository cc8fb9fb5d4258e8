//! Record CRUD operations, scoped to one (database, layout) pair.

use fm_data_client::{CancellationToken, Client, Envelope, RequestSpec, Result};
use serde::Serialize;

use crate::query::Sorter;
use crate::scripts::ScriptOptions;
use crate::validate;

/// Body for create and edit operations.
///
/// `mod_id` enables optimistic locking on edits: the server rejects the
/// write when the record has been modified since that modId was read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub field_data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_id: Option<String>,
}

impl Payload {
    pub fn new(field_data: serde_json::Value) -> Self {
        Self {
            field_data,
            portal_data: None,
            mod_id: None,
        }
    }

    pub fn with_portal_data(mut self, portal_data: serde_json::Value) -> Self {
        self.portal_data = Some(portal_data);
        self
    }

    pub fn with_mod_id(mut self, mod_id: impl Into<String>) -> Self {
        self.mod_id = Some(mod_id.into());
        self
    }
}

/// Pagination and sorting for [`RecordService::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// 1-based starting record number.
    pub offset: Option<u32>,
    /// Maximum number of records to return.
    pub limit: Option<u32>,
    pub sorters: Vec<Sorter>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort(mut self, sorter: Sorter) -> Self {
        self.sorters.push(sorter);
        self
    }
}

/// CRUD operations against the records endpoint.
///
/// Every method opens a session, runs the operation with the session token,
/// and releases the session before returning.
#[derive(Debug, Clone)]
pub struct RecordService {
    client: Client,
    database: String,
    layout: String,
}

impl RecordService {
    pub fn new(client: Client, database: impl Into<String>, layout: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            layout: layout.into(),
        }
    }

    fn records_path(&self) -> String {
        format!(
            "fmi/data/{}/databases/{}/layouts/{}/records",
            self.client.version(),
            self.database,
            self.layout
        )
    }

    fn validate_scope(&self) -> Result<()> {
        validate::database(&self.database)?;
        validate::layout(&self.layout)
    }

    async fn run(&self, cancel: &CancellationToken, spec: RequestSpec) -> Result<Envelope> {
        let client = self.client.clone();
        self.client
            .with_session(cancel, &self.database, None, move |token| {
                let spec = spec.bearer_auth(token);
                async move { client.execute(cancel, spec).await }
            })
            .await
    }

    /// Create a new record.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        payload: &Payload,
        scripts: Option<&ScriptOptions>,
    ) -> Result<Envelope> {
        self.validate_scope()?;

        let mut spec = RequestSpec::post(self.records_path()).json(payload)?;
        if let Some(scripts) = scripts {
            spec = scripts.apply(spec);
        }
        self.run(cancel, spec).await
    }

    /// Edit an existing record. Set `payload.mod_id` for optimistic locking.
    pub async fn edit(
        &self,
        cancel: &CancellationToken,
        record_id: &str,
        payload: &Payload,
        scripts: Option<&ScriptOptions>,
    ) -> Result<Envelope> {
        self.validate_scope()?;
        validate::record_id(record_id)?;

        let path = format!("{}/{}", self.records_path(), record_id);
        let mut spec = RequestSpec::patch(path).json(payload)?;
        if let Some(scripts) = scripts {
            spec = scripts.apply(spec);
        }
        self.run(cancel, spec).await
    }

    /// Duplicate a record. A POST to the record path with no body copies it.
    pub async fn duplicate(&self, cancel: &CancellationToken, record_id: &str) -> Result<Envelope> {
        self.validate_scope()?;
        validate::record_id(record_id)?;

        let path = format!("{}/{}", self.records_path(), record_id);
        self.run(cancel, RequestSpec::post(path)).await
    }

    /// Delete a record. `delete_related` names a portal whose related
    /// records are deleted along with it.
    pub async fn delete(
        &self,
        cancel: &CancellationToken,
        record_id: &str,
        delete_related: Option<&str>,
        scripts: Option<&ScriptOptions>,
    ) -> Result<Envelope> {
        self.validate_scope()?;
        validate::record_id(record_id)?;

        let path = format!("{}/{}", self.records_path(), record_id);
        let mut spec = RequestSpec::delete(path);
        if let Some(portal) = delete_related {
            spec = spec.query("deleteRelated", portal);
        }
        if let Some(scripts) = scripts {
            spec = scripts.apply(spec);
        }
        self.run(cancel, spec).await
    }

    /// Fetch a single record by ID.
    pub async fn get_by_id(&self, cancel: &CancellationToken, record_id: &str) -> Result<Envelope> {
        self.validate_scope()?;
        validate::record_id(record_id)?;

        let path = format!("{}/{}", self.records_path(), record_id);
        self.run(cancel, RequestSpec::get(path)).await
    }

    /// List records with pagination and sorting.
    pub async fn list(&self, cancel: &CancellationToken, options: &ListOptions) -> Result<Envelope> {
        self.validate_scope()?;

        let mut spec = RequestSpec::get(self.records_path());
        if let Some(offset) = options.offset {
            spec = spec.query("_offset", offset.to_string());
        }
        if let Some(limit) = options.limit {
            spec = spec.query("_limit", limit.to_string());
        }
        if !options.sorters.is_empty() {
            spec = spec.query("_sort", serde_json::to_string(&options.sorters)?);
        }
        self.run(cancel, spec).await
    }
}
