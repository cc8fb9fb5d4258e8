//! Request building for Data API calls.

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Authentication carried by a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestAuth {
    /// No authentication; used for session-create calls that authenticate
    /// through bespoke headers instead.
    #[default]
    None,
    /// HTTP Basic credentials; session-create and metadata-discovery calls.
    Basic { username: String, password: String },
    /// Bearer session token; all session-scoped calls.
    Bearer(String),
}

/// Request body content.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Bytes),
}

/// An immutable description of one Data API request, built by an endpoint
/// adapter and consumed once by [`Client::execute`](crate::Client::execute).
///
/// The `path` is relative to the client's base URL and already versioned,
/// e.g. `fmi/data/vLatest/databases/Contacts/sessions`.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub(crate) method: RequestMethod,
    pub(crate) path: String,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) auth: RequestAuth,
}

impl RequestSpec {
    /// Create a new request spec for the given method and relative path.
    pub fn new(method: RequestMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: Vec::new(),
            headers: HashMap::new(),
            body: None,
            auth: RequestAuth::None,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Get, path)
    }

    /// Shorthand for a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Post, path)
    }

    /// Shorthand for a PATCH request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Patch, path)
    }

    /// Shorthand for a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Delete, path)
    }

    /// Authenticate with a bearer session token.
    pub fn bearer_auth(mut self, token: impl Into<String>) -> Self {
        self.auth = RequestAuth::Bearer(token.into());
        self
    }

    /// Authenticate with HTTP Basic credentials.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = RequestAuth::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body serialized from `body`.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)?;
        self.body = Some(RequestBody::Json(value));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Set a raw JSON body.
    pub fn json_value(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        self
    }

    /// Set a bytes body with an explicit content type; used for multipart
    /// container uploads.
    pub fn bytes(mut self, body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self.headers
            .insert("Content-Type".to_string(), content_type.into());
        self
    }

    /// The request method.
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// The relative path.
    pub fn path(&self) -> &str {
        &self.path
    }
}
