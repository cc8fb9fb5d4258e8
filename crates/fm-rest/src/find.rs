//! Find operations against the `_find` endpoint.

use fm_data_client::{CancellationToken, Client, Envelope, Error, RequestSpec, Result};
use serde::Serialize;
use tracing::debug;

use crate::query::{FieldOperator, QueryGroup, SortOrder, Sorter};
use crate::scripts::ScriptOptions;
use crate::validate;

/// Pagination for one portal in a find response. Offsets are 1-based.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub name: String,
    pub offset: u32,
    pub limit: u32,
}

impl PortalConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: 1,
            limit: 50,
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// The `_find` request body.
#[derive(Debug, Serialize)]
struct FindBody {
    query: Vec<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sort: Vec<Sorter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<String>,
    portal: Vec<String>,
}

/// Executes find queries scoped to one (database, layout) pair.
///
/// Criteria within a [`QueryGroup`] combine with AND; separate groups
/// combine with OR. Runs under a session like the record operations.
#[derive(Debug, Clone)]
pub struct FindService {
    client: Client,
    database: String,
    layout: String,
    groups: Vec<QueryGroup>,
    sorters: Vec<Sorter>,
    limit: Option<u32>,
    offset: Option<u32>,
    portals: Vec<String>,
    portal_configs: Vec<PortalConfig>,
    scripts: Option<ScriptOptions>,
}

impl FindService {
    pub fn new(client: Client, database: impl Into<String>, layout: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
            layout: layout.into(),
            groups: Vec::new(),
            sorters: Vec::new(),
            limit: None,
            offset: None,
            portals: Vec::new(),
            portal_configs: Vec::new(),
            scripts: None,
        }
    }

    /// Add a query group (OR with previously added groups).
    pub fn group(mut self, group: QueryGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn sort(mut self, sorter: Sorter) -> Self {
        self.sorters.push(sorter);
        self
    }

    /// 1-based starting record number.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Name the portals to include in the response, without pagination.
    pub fn portals(mut self, portals: Vec<String>) -> Self {
        self.portals = portals;
        self
    }

    /// Include portals with per-portal pagination. The offsets and limits
    /// travel as `_offset.<name>` / `_limit.<name>` query parameters.
    pub fn portal_configs(mut self, configs: Vec<PortalConfig>) -> Self {
        self.portals = configs.iter().map(|c| c.name.clone()).collect();
        self.portal_configs = configs;
        self
    }

    pub fn scripts(mut self, scripts: ScriptOptions) -> Self {
        self.scripts = Some(scripts);
        self
    }

    /// Execute the find under a session.
    pub async fn perform(&self, cancel: &CancellationToken) -> Result<Envelope> {
        validate::database(&self.database)?;
        validate::layout(&self.layout)?;
        if self.groups.iter().all(|g| g.is_empty()) {
            return Err(Error::validation(
                "query",
                "at least one find criterion is required",
            ));
        }

        let body = FindBody {
            query: self.groups.iter().map(|g| g.to_map()).collect(),
            sort: self.sorters.clone(),
            limit: self.limit.map(|v| v.to_string()),
            offset: self.offset.map(|v| v.to_string()),
            portal: self.portals.clone(),
        };

        let path = format!(
            "fmi/data/{}/databases/{}/layouts/{}/_find",
            self.client.version(),
            self.database,
            self.layout
        );

        debug!(
            database = %self.database,
            layout = %self.layout,
            groups = self.groups.len(),
            "executing find"
        );

        let mut spec = RequestSpec::post(path).json(&body)?;
        for config in &self.portal_configs {
            if config.offset > 0 {
                spec = spec.query(format!("_offset.{}", config.name), config.offset.to_string());
            }
            if config.limit > 0 {
                spec = spec.query(format!("_limit.{}", config.name), config.limit.to_string());
            }
        }
        if let Some(scripts) = &self.scripts {
            spec = scripts.apply(spec);
        }

        let client = self.client.clone();
        self.client
            .with_session(cancel, &self.database, None, move |token| {
                let spec = spec.bearer_auth(token);
                async move { client.execute(cancel, spec).await }
            })
            .await
    }
}

/// Fluent find construction: `where_` chains AND criteria, `or_where`
/// starts a new OR group.
#[derive(Debug, Clone)]
pub struct FindBuilder {
    service: FindService,
    current: QueryGroup,
}

impl FindBuilder {
    pub fn new(client: Client, database: impl Into<String>, layout: impl Into<String>) -> Self {
        Self {
            service: FindService::new(client, database, layout),
            current: QueryGroup::new(),
        }
    }

    /// Add a criterion to the current group (AND).
    pub fn where_(
        mut self,
        field: impl Into<String>,
        operator: FieldOperator,
        value: impl Into<String>,
    ) -> Self {
        self.current = self.current.with(field, operator, value);
        self
    }

    /// Close the current group and start a new one (OR).
    pub fn or_where(
        mut self,
        field: impl Into<String>,
        operator: FieldOperator,
        value: impl Into<String>,
    ) -> Self {
        if !self.current.is_empty() {
            let group = std::mem::take(&mut self.current);
            self.service = self.service.group(group);
        }
        self.current = QueryGroup::new().with(field, operator, value);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.service = self.service.sort(Sorter::new(field, order));
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.service = self.service.offset(offset);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.service = self.service.limit(limit);
        self
    }

    pub fn portals(mut self, configs: Vec<PortalConfig>) -> Self {
        self.service = self.service.portal_configs(configs);
        self
    }

    pub fn scripts(mut self, scripts: ScriptOptions) -> Self {
        self.service = self.service.scripts(scripts);
        self
    }

    /// Execute the find.
    pub async fn perform(mut self, cancel: &CancellationToken) -> Result<Envelope> {
        if !self.current.is_empty() {
            let group = std::mem::take(&mut self.current);
            self.service = self.service.group(group);
        }
        self.service.perform(cancel).await
    }
}
