//! Container field uploads and downloads.

use std::path::Path;

use bytes::Bytes;
use fm_data_client::{CancellationToken, Client, Envelope, Error, RequestSpec, Result};
use tracing::debug;
use uuid::Uuid;

use crate::validate;

/// Uploads files into container fields and downloads their contents.
#[derive(Debug, Clone)]
pub struct ContainerService {
    client: Client,
}

impl ContainerService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Upload a file from disk into a container field (repetition 1).
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_file(
        &self,
        cancel: &CancellationToken,
        database: &str,
        layout: &str,
        record_id: &str,
        field_name: &str,
        file_path: impl AsRef<Path>,
        token: &str,
    ) -> Result<Envelope> {
        self.upload_file_with_repetition(
            cancel, database, layout, record_id, field_name, file_path, token, 1,
        )
        .await
    }

    /// Upload a file from disk into a specific repetition (1-based) of a
    /// container field.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_file_with_repetition(
        &self,
        cancel: &CancellationToken,
        database: &str,
        layout: &str,
        record_id: &str,
        field_name: &str,
        file_path: impl AsRef<Path>,
        token: &str,
        repetition: u32,
    ) -> Result<Envelope> {
        let file_path = file_path.as_ref();
        let Some(filename) = file_path.file_name().and_then(|n| n.to_str()) else {
            return Err(Error::validation("filePath", "file path is required"));
        };
        let filename = filename.to_string();

        let data = tokio::fs::read(file_path).await.map_err(|err| {
            Error::validation("filePath", format!("failed to read file: {}", err))
        })?;

        self.upload_data_with_repetition(
            cancel, database, layout, record_id, field_name, &filename, data, token, repetition,
        )
        .await
    }

    /// Upload in-memory data into a container field (repetition 1).
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_data(
        &self,
        cancel: &CancellationToken,
        database: &str,
        layout: &str,
        record_id: &str,
        field_name: &str,
        filename: &str,
        data: impl Into<Bytes>,
        token: &str,
    ) -> Result<Envelope> {
        self.upload_data_with_repetition(
            cancel, database, layout, record_id, field_name, filename, data, token, 1,
        )
        .await
    }

    /// Upload in-memory data into a specific repetition (1-based) of a
    /// container field.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_data_with_repetition(
        &self,
        cancel: &CancellationToken,
        database: &str,
        layout: &str,
        record_id: &str,
        field_name: &str,
        filename: &str,
        data: impl Into<Bytes>,
        token: &str,
        repetition: u32,
    ) -> Result<Envelope> {
        validate::database(database)?;
        validate::layout(layout)?;
        validate::record_id(record_id)?;
        validate::field_name(field_name)?;
        validate::token(token)?;
        validate::require("filename", filename, "filename is required")?;
        validate::repetition(repetition)?;

        let data = data.into();
        if data.is_empty() {
            return Err(Error::validation("data", "file data cannot be empty"));
        }

        let path = format!(
            "fmi/data/{}/databases/{}/layouts/{}/records/{}/containers/{}/{}",
            self.client.version(),
            database,
            layout,
            record_id,
            field_name,
            repetition
        );

        debug!(database, layout, record_id, field_name, size = data.len(), "uploading container data");

        // The form is assembled into a plain byte buffer so the retry
        // engine can resend it; a streaming multipart body is single-use.
        let boundary = format!("fm-data-{}", Uuid::new_v4().simple());
        let body = multipart_body(&boundary, filename, &data);

        let spec = RequestSpec::post(path).bearer_auth(token).bytes(
            body,
            format!("multipart/form-data; boundary={}", boundary),
        );

        self.client.execute(cancel, spec).await
    }

    /// Download a container field's contents from the URL stored in the
    /// field. The body streams outside the retry engine, raw and unparsed.
    pub async fn download(
        &self,
        cancel: &CancellationToken,
        url: &str,
        token: Option<&str>,
    ) -> Result<Bytes> {
        validate::require("url", url, "url is required")?;
        self.client.fetch_raw(cancel, url, token).await
    }
}

fn multipart_body(boundary: &str, filename: &str, data: &[u8]) -> Bytes {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"upload\"; filename=\"{}\"\r\n",
            filename.replace('"', "%22")
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    Bytes::from(body)
}
