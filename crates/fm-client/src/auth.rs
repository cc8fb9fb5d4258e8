//! Authentication strategies for session creation.
//!
//! Each strategy turns (client configuration, target database) into a
//! ready-to-send session-create request. Exactly one strategy applies per
//! call: the per-call override is an `Option<AuthStrategy>` and falls back to
//! the client's configured default.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::request::RequestSpec;

/// Relative path template for session endpoints.
pub(crate) fn session_path(version: &str, database: &str) -> String {
    format!("fmi/data/{}/databases/{}/sessions", version, database)
}

/// How to authenticate a session-create call.
#[derive(Clone)]
pub enum AuthStrategy {
    /// HTTP Basic credentials for the target database.
    Basic { username: String, password: String },
    /// External data source credentials, carried in the JSON body. The
    /// client's stored master credentials authenticate the file itself via
    /// the Basic header; the two pairs are deliberately distinct.
    CustomDatasource { username: String, password: String },
    /// OAuth headers carrying a request id and an identity claim.
    OAuth {
        request_id: String,
        identifier: String,
    },
    /// A signed Claris ID token in the Authorization header.
    ClarisId { token: String },
}

impl std::fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStrategy::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            AuthStrategy::CustomDatasource { username, .. } => f
                .debug_struct("CustomDatasource")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            AuthStrategy::OAuth { request_id, .. } => f
                .debug_struct("OAuth")
                .field("request_id", request_id)
                .finish(),
            AuthStrategy::ClarisId { .. } => f
                .debug_struct("ClarisId")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasourcePayload {
    fm_data_source: Vec<Datasource>,
}

#[derive(Serialize)]
struct Datasource {
    database: String,
    username: String,
    password: String,
}

impl AuthStrategy {
    /// Basic credentials for the target database.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthStrategy::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// External data source credentials.
    pub fn custom_datasource(
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        AuthStrategy::CustomDatasource {
            username: username.into(),
            password: password.into(),
        }
    }

    /// OAuth request id and identifier headers.
    pub fn oauth(request_id: impl Into<String>, identifier: impl Into<String>) -> Self {
        AuthStrategy::OAuth {
            request_id: request_id.into(),
            identifier: identifier.into(),
        }
    }

    /// Claris ID bearer token.
    pub fn claris_id(token: impl Into<String>) -> Self {
        AuthStrategy::ClarisId {
            token: token.into(),
        }
    }

    /// Build the session-create request for `database`.
    ///
    /// `master_credentials` is the client's stored (username, password) pair;
    /// it is only consulted by the custom-datasource strategy, which must not
    /// silently reuse the external pair for the Basic header.
    pub(crate) fn session_request(
        &self,
        version: &str,
        database: &str,
        master_credentials: Option<(&str, &str)>,
    ) -> Result<RequestSpec> {
        let path = session_path(version, database);

        match self {
            AuthStrategy::Basic { username, password } => {
                if username.is_empty() {
                    return Err(Error::validation("username", "username is required"));
                }
                Ok(RequestSpec::post(path)
                    .basic_auth(username, password)
                    .json_value(serde_json::json!({})))
            }
            AuthStrategy::CustomDatasource { username, password } => {
                if username.is_empty() {
                    return Err(Error::validation(
                        "username",
                        "external datasource username is required",
                    ));
                }
                let Some((master_user, master_pass)) = master_credentials else {
                    return Err(Error::validation(
                        "auth",
                        "master file credentials are required for datasource authentication",
                    ));
                };
                let payload = DatasourcePayload {
                    fm_data_source: vec![Datasource {
                        database: database.to_string(),
                        username: username.clone(),
                        password: password.clone(),
                    }],
                };
                RequestSpec::post(path)
                    .basic_auth(master_user, master_pass)
                    .json(&payload)
            }
            AuthStrategy::OAuth {
                request_id,
                identifier,
            } => {
                if request_id.is_empty() || identifier.is_empty() {
                    return Err(Error::validation(
                        "auth",
                        "OAuth request id and identifier are required",
                    ));
                }
                Ok(RequestSpec::post(path)
                    .header("X-FM-Data-OAuth-Request-Id", request_id)
                    .header("X-FM-Data-OAuth-Identifier", identifier)
                    .json_value(serde_json::json!({})))
            }
            AuthStrategy::ClarisId { token } => {
                if token.is_empty() {
                    return Err(Error::validation("token", "Claris ID token is required"));
                }
                Ok(RequestSpec::post(path)
                    .header("Authorization", format!("FMID {}", token))
                    .json_value(serde_json::json!({})))
            }
        }
    }
}
