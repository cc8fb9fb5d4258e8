//! Discovery endpoints: databases, layouts, scripts, product info.

use fm_data_client::{CancellationToken, Client, Envelope, RequestSpec, Result};

use crate::validate;

/// Metadata discovery.
///
/// `databases` and `product_info` authenticate with the client's master
/// credentials and need no session; the rest take a session token.
#[derive(Debug, Clone)]
pub struct MetadataService {
    client: Client,
}

impl MetadataService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// List the hosted databases the credentials can see.
    pub async fn databases(&self, cancel: &CancellationToken) -> Result<Envelope> {
        let path = format!("fmi/data/{}/databases", self.client.version());
        let spec = self.client.with_master_auth(RequestSpec::get(path))?;
        self.client.execute(cancel, spec).await
    }

    /// Server product information: version, name, date and time formats.
    pub async fn product_info(&self, cancel: &CancellationToken) -> Result<Envelope> {
        let path = format!("fmi/data/{}/productInfo", self.client.version());
        let spec = self.client.with_master_auth(RequestSpec::get(path))?;
        self.client.execute(cancel, spec).await
    }

    /// List the layouts in `database`.
    pub async fn layouts(
        &self,
        cancel: &CancellationToken,
        database: &str,
        token: &str,
    ) -> Result<Envelope> {
        validate::database(database)?;
        validate::token(token)?;

        let path = format!(
            "fmi/data/{}/databases/{}/layouts",
            self.client.version(),
            database
        );
        self.client
            .execute(cancel, RequestSpec::get(path).bearer_auth(token))
            .await
    }

    /// Field definitions, value lists, and portal metadata for one layout.
    pub async fn layout_metadata(
        &self,
        cancel: &CancellationToken,
        database: &str,
        layout: &str,
        token: &str,
    ) -> Result<Envelope> {
        validate::database(database)?;
        validate::layout(layout)?;
        validate::token(token)?;

        let path = format!(
            "fmi/data/{}/databases/{}/layouts/{}",
            self.client.version(),
            database,
            layout
        );
        self.client
            .execute(cancel, RequestSpec::get(path).bearer_auth(token))
            .await
    }

    /// List the scripts in `database` that the Data API may call.
    pub async fn scripts(
        &self,
        cancel: &CancellationToken,
        database: &str,
        token: &str,
    ) -> Result<Envelope> {
        validate::database(database)?;
        validate::token(token)?;

        let path = format!(
            "fmi/data/{}/databases/{}/scripts",
            self.client.version(),
            database
        );
        self.client
            .execute(cancel, RequestSpec::get(path).bearer_auth(token))
            .await
    }
}
