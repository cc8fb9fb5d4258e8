//! Fluent record assembly over [`RecordService`].

use std::collections::HashMap;

use fm_data_client::{CancellationToken, Client, Envelope, Error, Result};

use crate::records::{ListOptions, Payload, RecordService};
use crate::scripts::{ScriptCall, ScriptOptions};

/// Builds up field and portal data, then runs a record operation.
///
/// ```rust,ignore
/// let response = RecordBuilder::new(client, "Contacts", "People")
///     .set_field("FirstName", "John")
///     .set_field("LastName", "Doe")
///     .create(&cancel)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    service: RecordService,
    record_id: Option<String>,
    field_data: serde_json::Map<String, serde_json::Value>,
    portal_data: HashMap<String, Vec<serde_json::Value>>,
    scripts: Option<ScriptOptions>,
    mod_id: Option<String>,
    delete_related: Option<String>,
    list: ListOptions,
}

impl RecordBuilder {
    pub fn new(client: Client, database: impl Into<String>, layout: impl Into<String>) -> Self {
        Self {
            service: RecordService::new(client, database, layout),
            record_id: None,
            field_data: serde_json::Map::new(),
            portal_data: HashMap::new(),
            scripts: None,
            mod_id: None,
            delete_related: None,
            list: ListOptions::new(),
        }
    }

    /// Set one field value.
    pub fn set_field(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.field_data.insert(name.into(), value.into());
        self
    }

    /// Set several field values at once.
    pub fn set_fields(
        mut self,
        fields: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Self {
        self.field_data.extend(fields);
        self
    }

    /// Append a related record to a portal.
    pub fn add_portal_record(
        mut self,
        portal: impl Into<String>,
        record: serde_json::Value,
    ) -> Self {
        self.portal_data.entry(portal.into()).or_default().push(record);
        self
    }

    /// Target an existing record for get/update/delete/duplicate.
    pub fn for_record(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    /// Require the record's modId to match (optimistic locking).
    pub fn with_mod_id(mut self, mod_id: impl Into<String>) -> Self {
        self.mod_id = Some(mod_id.into());
        self
    }

    /// Delete related records through the named portal on delete.
    pub fn with_delete_related(mut self, portal: impl Into<String>) -> Self {
        self.delete_related = Some(portal.into());
        self
    }

    pub fn with_scripts(mut self, scripts: ScriptOptions) -> Self {
        self.scripts = Some(scripts);
        self
    }

    /// Run a script after the operation completes.
    pub fn with_after_script(mut self, script: impl Into<String>, param: Option<String>) -> Self {
        let mut call = ScriptCall::new(script);
        if let Some(param) = param {
            call = call.with_param(param);
        }
        let scripts = self.scripts.take().unwrap_or_default();
        self.scripts = Some(scripts.after(call));
        self
    }

    /// Run a script before the operation starts.
    pub fn with_prerequest_script(
        mut self,
        script: impl Into<String>,
        param: Option<String>,
    ) -> Self {
        let mut call = ScriptCall::new(script);
        if let Some(param) = param {
            call = call.with_param(param);
        }
        let scripts = self.scripts.take().unwrap_or_default();
        self.scripts = Some(scripts.prerequest(call));
        self
    }

    /// Pagination offset for [`RecordBuilder::list`] (1-based).
    pub fn offset(mut self, offset: u32) -> Self {
        self.list.offset = Some(offset);
        self
    }

    /// Pagination limit for [`RecordBuilder::list`].
    pub fn limit(mut self, limit: u32) -> Self {
        self.list.limit = Some(limit);
        self
    }

    fn payload(&self) -> Payload {
        let mut payload = Payload::new(serde_json::Value::Object(self.field_data.clone()));
        if !self.portal_data.is_empty() {
            payload.portal_data = serde_json::to_value(&self.portal_data).ok();
        }
        if let Some(mod_id) = &self.mod_id {
            payload.mod_id = Some(mod_id.clone());
        }
        payload
    }

    fn require_record_id(&self, operation: &str) -> Result<&str> {
        self.record_id.as_deref().ok_or_else(|| {
            Error::validation(
                "recordId",
                format!("record ID is required for {} operations", operation),
            )
        })
    }

    /// Create a record with the assembled field and portal data.
    pub async fn create(&self, cancel: &CancellationToken) -> Result<Envelope> {
        self.service
            .create(cancel, &self.payload(), self.scripts.as_ref())
            .await
    }

    /// Update the targeted record.
    pub async fn update(&self, cancel: &CancellationToken) -> Result<Envelope> {
        let record_id = self.require_record_id("update")?;
        self.service
            .edit(cancel, record_id, &self.payload(), self.scripts.as_ref())
            .await
    }

    /// Delete the targeted record.
    pub async fn delete(&self, cancel: &CancellationToken) -> Result<Envelope> {
        let record_id = self.require_record_id("delete")?;
        self.service
            .delete(
                cancel,
                record_id,
                self.delete_related.as_deref(),
                self.scripts.as_ref(),
            )
            .await
    }

    /// Fetch the targeted record.
    pub async fn get(&self, cancel: &CancellationToken) -> Result<Envelope> {
        let record_id = self.require_record_id("get")?;
        self.service.get_by_id(cancel, record_id).await
    }

    /// Duplicate the targeted record.
    pub async fn duplicate(&self, cancel: &CancellationToken) -> Result<Envelope> {
        let record_id = self.require_record_id("duplicate")?;
        self.service.duplicate(cancel, record_id).await
    }

    /// List records with the configured offset and limit.
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Envelope> {
        self.service.list(cancel, &self.list).await
    }
}
