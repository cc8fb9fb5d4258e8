//! Core HTTP client: request execution with retry and envelope parsing.

use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::auth::AuthStrategy;
use crate::config::ClientConfig;
use crate::error::{check_envelope, status_text, Error, ErrorKind, Result};
use crate::request::{RequestAuth, RequestBody, RequestSpec};
use crate::response::Envelope;
use crate::retry::RetryConfig;

/// Default Data API version segment.
pub const DEFAULT_VERSION: &str = "vLatest";

/// Client-wide configuration shared by all in-flight operations. Reads take
/// the read side of the lock and are never held across an await.
#[derive(Debug)]
pub(crate) struct ClientState {
    pub(crate) base_url: String,
    pub(crate) version: String,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) default_auth: Option<AuthStrategy>,
}

/// FileMaker Data API client.
///
/// Cheap to clone; clones share the HTTP connection pool and configuration.
/// Many logical operations may run concurrently on one client; each carries
/// its own [`CancellationToken`] and no per-operation state is shared.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ClientConfig,
    pub(crate) state: Arc<RwLock<ClientState>>,
}

impl Client {
    /// Create a client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The configured base URL.
    pub fn base_url(&self) -> String {
        self.read_state(|s| s.base_url.clone())
    }

    /// The Data API version segment.
    pub fn version(&self) -> String {
        self.read_state(|s| s.version.clone())
    }

    /// The transport configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Replace the Data API version segment.
    pub fn set_version(&self, version: impl Into<String>) {
        self.write_state(|s| {
            s.version = version.into();
            if s.version.is_empty() {
                s.version = DEFAULT_VERSION.to_string();
            }
        });
    }

    /// Replace the master credentials and make Basic the default strategy.
    pub fn set_basic_auth(&self, username: impl Into<String>, password: impl Into<String>) {
        let username = username.into();
        let password = password.into();
        self.write_state(|s| {
            s.default_auth = Some(AuthStrategy::basic(username.clone(), password.clone()));
            s.username = Some(username);
            s.password = Some(password);
        });
    }

    /// Replace the default authentication strategy.
    pub fn set_default_auth(&self, strategy: AuthStrategy) {
        self.write_state(|s| s.default_auth = Some(strategy));
    }

    /// Attach the stored master credentials to `spec` as HTTP Basic auth.
    ///
    /// Used by the session-free discovery endpoints (database list, product
    /// info). Fails with a validation error when no credentials are stored,
    /// without exposing them to the caller.
    pub fn with_master_auth(&self, spec: RequestSpec) -> Result<RequestSpec> {
        let creds = self.read_state(|s| match (&s.username, &s.password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        });
        let Some((username, password)) = creds else {
            return Err(Error::validation(
                "auth",
                "master file credentials are required; configure the client \
                 with basic_auth",
            ));
        };
        Ok(spec.basic_auth(username, password))
    }

    pub(crate) fn read_state<T>(&self, f: impl FnOnce(&ClientState) -> T) -> T {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&state)
    }

    fn write_state(&self, f: impl FnOnce(&mut ClientState)) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state);
    }

    /// Execute one logical Data API request.
    ///
    /// The transport call runs inside the retry engine; transport failures
    /// are classified as network/timeout errors before the retry decision,
    /// and envelope-level error codes surface as [`ErrorKind::FileMaker`].
    /// Returns the decoded envelope on success.
    #[instrument(skip(self, cancel, spec), fields(method = ?spec.method(), path = %spec.path()))]
    pub async fn execute(&self, cancel: &CancellationToken, spec: RequestSpec) -> Result<Envelope> {
        let base_url = self.read_state(|s| s.base_url.clone());
        if base_url.is_empty() {
            return Err(Error::validation("url", "base URL is required"));
        }

        let url = format!("{}/{}", base_url, spec.path());
        let retry = self
            .config
            .retry
            .clone()
            .unwrap_or_else(RetryConfig::no_retry);

        retry
            .execute(cancel, || self.execute_once(&url, &spec))
            .await
    }

    /// Perform a single request without retry logic.
    async fn execute_once(&self, url: &str, spec: &RequestSpec) -> Result<Envelope> {
        let mut req = self.http.request(spec.method.to_reqwest(), url);

        match &spec.auth {
            RequestAuth::None => {}
            RequestAuth::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            RequestAuth::Bearer(token) => {
                req = req.bearer_auth(token);
            }
        }

        req = req.header("Accept", "application/json");
        for (name, value) in &spec.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if !spec.query_params.is_empty() {
            req = req.query(&spec.query_params);
        }

        if let Some(body) = &spec.body {
            req = match body {
                RequestBody::Json(value) => req.json(value),
                RequestBody::Text(text) => req.body(text.clone()),
                RequestBody::Bytes(bytes) => req.body(bytes.clone()),
            };
        }

        if self.config.enable_tracing {
            debug!(url, "sending request");
        }

        let response = req.send().await?;
        let status = response.status().as_u16();

        if self.config.enable_tracing {
            if (200..300).contains(&status) {
                debug!(status, "response received");
            } else {
                info!(status, "non-success response");
            }
        }

        let body = response.bytes().await?;
        let envelope = decode_envelope(&body, status)?;
        check_envelope(&envelope, status)?;

        Ok(envelope)
    }

    /// Fetch raw bytes from an absolute URL, outside the retry engine.
    ///
    /// Used for container downloads, where the body is opaque binary data
    /// rather than a response envelope.
    pub async fn fetch_raw(
        &self,
        cancel: &CancellationToken,
        url: &str,
        token: Option<&str>,
    ) -> Result<Bytes> {
        if url.is_empty() {
            return Err(Error::validation("url", "url is required"));
        }

        let fetch = async {
            let mut req = self.http.get(url);
            if let Some(token) = token {
                req = req.bearer_auth(token);
            }
            let response = req.send().await?;
            let status = response.status().as_u16();
            if status >= 400 {
                return Err(Error::new(ErrorKind::FileMaker {
                    code: String::new(),
                    http_status: status,
                    message: status_text(status),
                }));
            }
            Ok(response.bytes().await?)
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::new(ErrorKind::Cancelled)),
            result = fetch => result,
        }
    }
}

/// Decode the response body into an envelope.
///
/// An empty body on a success status decodes to the default envelope; an
/// undecodable body on a failure status is reported as an envelope error
/// keyed off the status text, so callers always see taxonomy errors.
fn decode_envelope(body: &[u8], status: u16) -> Result<Envelope> {
    if body.is_empty() {
        return Ok(Envelope::default());
    }

    match serde_json::from_slice(body) {
        Ok(envelope) => Ok(envelope),
        Err(err) if status >= 400 => Err(Error::with_source(
            ErrorKind::FileMaker {
                code: String::new(),
                http_status: status,
                message: status_text(status),
            },
            err,
        )),
        Err(err) => Err(err.into()),
    }
}

/// Builder for [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    base_url: Option<String>,
    version: Option<String>,
    username: Option<String>,
    password: Option<String>,
    default_auth: Option<AuthStrategy>,
    config: Option<ClientConfig>,
}

impl ClientBuilder {
    /// Set the server base URL (scheme, host, optional port). Required.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the Data API version segment. Defaults to `vLatest`.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Store master credentials and make Basic the default auth strategy.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let password = password.into();
        self.default_auth = Some(AuthStrategy::basic(username.clone(), password.clone()));
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    /// Set the default authentication strategy without storing credentials.
    pub fn default_auth(mut self, strategy: AuthStrategy) -> Self {
        self.default_auth = Some(strategy);
        self
    }

    /// Set the transport configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        let Some(base_url) = self.base_url else {
            return Err(Error::new(ErrorKind::Config(
                "base URL is required".to_string(),
            )));
        };
        // Validate early so a malformed URL fails at construction, not on
        // the first request.
        url::Url::parse(&base_url)?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let config = self.config.unwrap_or_default();

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        let version = match self.version {
            Some(v) if !v.is_empty() => v,
            _ => DEFAULT_VERSION.to_string(),
        };

        Ok(Client {
            http,
            config,
            state: Arc::new(RwLock::new(ClientState {
                base_url,
                version,
                username: self.username,
                password: self.password,
                default_auth: self.default_auth,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ok_envelope() -> serde_json::Value {
        serde_json::json!({
            "response": {},
            "messages": [{ "code": "0", "message": "OK" }]
        })
    }

    fn client_for(server: &MockServer) -> Client {
        Client::builder()
            .base_url(server.uri())
            .config(ClientConfig::builder().without_retry().build())
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_base_url() {
        let err = Client::builder().build().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
    }

    #[test]
    fn builder_rejects_malformed_url() {
        let err = Client::builder().base_url("not a url").build().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
    }

    #[test]
    fn builder_defaults_version() {
        let client = Client::builder()
            .base_url("https://fms.example.com")
            .build()
            .unwrap();
        assert_eq!(client.version(), "vLatest");

        client.set_version("v1");
        assert_eq!(client.version(), "v1");
    }

    #[tokio::test]
    async fn executes_bearer_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fmi/data/vLatest/databases/Contacts/layouts"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let envelope = client
            .execute(
                &CancellationToken::new(),
                RequestSpec::get("fmi/data/vLatest/databases/Contacts/layouts").bearer_auth("tok"),
            )
            .await
            .unwrap();

        assert_eq!(envelope.messages[0].code, "0");
    }

    #[tokio::test]
    async fn classifies_envelope_business_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "messages": [{ "code": "212", "message": "Invalid user account or password" }],
                "response": {}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .execute(
                &CancellationToken::new(),
                RequestSpec::post("fmi/data/vLatest/databases/Contacts/sessions")
                    .basic_auth("u", "p")
                    .json_value(serde_json::json!({})),
            )
            .await
            .unwrap_err();

        assert_eq!(err.filemaker_code(), Some("212"));
        assert!(err.is_auth_error());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn success_code_zero_wins_over_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fmi/data/vLatest/productInfo"))
            .respond_with(ResponseTemplate::new(500).set_body_json(ok_envelope()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .execute(
                &CancellationToken::new(),
                RequestSpec::get("fmi/data/vLatest/productInfo"),
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn error_status_without_envelope_uses_status_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .execute(&CancellationToken::new(), RequestSpec::get("missing"))
            .await
            .unwrap_err();

        match err.kind {
            ErrorKind::FileMaker {
                http_status,
                ref message,
                ..
            } => {
                assert_eq!(http_status, 404);
                assert_eq!(message, "Not Found");
            }
            ref other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn retries_on_503_until_success() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        Mock::given(method("GET"))
            .and(path("/fmi/data/vLatest/productInfo"))
            .respond_with(move |_: &wiremock::Request| {
                let n = calls_clone.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    ResponseTemplate::new(503).set_body_json(serde_json::json!({
                        "messages": [{ "code": "100", "message": "unavailable" }],
                        "response": {}
                    }))
                } else {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "response": {},
                        "messages": [{ "code": "0", "message": "OK" }]
                    }))
                }
            })
            .mount(&server)
            .await;

        let client = Client::builder()
            .base_url(server.uri())
            .config(
                ClientConfig::builder()
                    .with_retry(
                        RetryConfig::default()
                            .with_max_retries(3)
                            .with_wait_times(Duration::from_millis(5), Duration::from_millis(20))
                            .with_jitter(false),
                    )
                    .build(),
            )
            .build()
            .unwrap();

        let result = client
            .execute(
                &CancellationToken::new(),
                RequestSpec::get("fmi/data/vLatest/productInfo"),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fmi/data/vLatest/productInfo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ok_envelope())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel_clone.cancel();
        });

        let start = std::time::Instant::now();
        let err = client
            .execute(
                &cancel,
                RequestSpec::get("fmi/data/vLatest/productInfo"),
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled(), "cancellation replaces the transport result");
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "must not wait out the delayed response"
        );
    }

    #[tokio::test]
    async fn fetch_raw_returns_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Streaming/file.pdf"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let bytes = client
            .fetch_raw(
                &CancellationToken::new(),
                &format!("{}/Streaming/file.pdf", server.uri()),
                Some("tok"),
            )
            .await
            .unwrap();

        assert_eq!(&bytes[..], b"%PDF-1.4");
    }

    #[tokio::test]
    async fn fetch_raw_reports_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Streaming/file.pdf"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .fetch_raw(
                &CancellationToken::new(),
                &format!("{}/Streaming/file.pdf", server.uri()),
                None,
            )
            .await
            .unwrap_err();

        assert!(err.is_auth_error());
    }

    #[tokio::test]
    async fn fetch_raw_honors_cancellation() {
        let client = Client::builder()
            .base_url("https://fms.example.com")
            .build()
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client
            .fetch_raw(&cancel, "https://fms.example.com/file", None)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
