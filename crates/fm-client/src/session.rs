//! Session lifecycle: create, validate, release, and the scoped bracket.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::auth::{session_path, AuthStrategy};
use crate::client::Client;
use crate::error::{Error, ErrorKind, Result};
use crate::request::RequestSpec;
use crate::response::Envelope;

/// How long a best-effort session release may run after the scoped work
/// finishes.
const RELEASE_GRACE: Duration = Duration::from_secs(5);

impl Client {
    /// Open a Data API session against `database`.
    ///
    /// `auth` overrides the client's default strategy for this call; when
    /// `None`, the default applies. The session token arrives in
    /// `response.token` of the returned envelope.
    pub async fn create_session(
        &self,
        cancel: &CancellationToken,
        database: &str,
        auth: Option<AuthStrategy>,
    ) -> Result<Envelope> {
        if database.is_empty() {
            return Err(Error::validation("database", "database name is required"));
        }

        let (version, master, default_auth) = self.read_state(|s| {
            let master = match (&s.username, &s.password) {
                (Some(u), Some(p)) => Some((u.clone(), p.clone())),
                _ => None,
            };
            (s.version.clone(), master, s.default_auth.clone())
        });

        let strategy = auth.or(default_auth).ok_or_else(|| {
            Error::validation(
                "auth",
                "an authentication strategy is required; configure one on the \
                 client or pass one per call",
            )
        })?;

        let spec = strategy.session_request(
            &version,
            database,
            master.as_ref().map(|(u, p)| (u.as_str(), p.as_str())),
        )?;

        debug!(database, "creating session");
        self.execute(cancel, spec).await
    }

    /// Release a session token. Safe to call with a token the server has
    /// already expired; the server treats that as success.
    pub async fn release_session(
        &self,
        cancel: &CancellationToken,
        database: &str,
        token: &str,
    ) -> Result<Envelope> {
        if database.is_empty() {
            return Err(Error::validation("database", "database name is required"));
        }
        if token.is_empty() {
            return Err(Error::validation("token", "session token is required"));
        }

        let version = self.version();
        let path = format!("{}/{}", session_path(&version, database), token);
        debug!(database, "releasing session");
        self.execute(cancel, RequestSpec::delete(path)).await
    }

    /// Check whether a session token is still valid.
    pub async fn validate_session(
        &self,
        cancel: &CancellationToken,
        database: &str,
        token: &str,
    ) -> Result<Envelope> {
        if database.is_empty() {
            return Err(Error::validation("database", "database name is required"));
        }
        if token.is_empty() {
            return Err(Error::validation("token", "session token is required"));
        }

        let version = self.version();
        let path = format!("fmi/data/{}/validateSession", version);
        self.execute(cancel, RequestSpec::get(path).bearer_auth(token))
            .await
    }

    /// Run `f` inside a session: create, hand the token to `f`, then make
    /// exactly one best-effort release attempt on every exit path.
    ///
    /// The release never replaces `f`'s result. A release failure is logged
    /// at `warn`. When `cancel` has already fired by the time `f` returns,
    /// the release is skipped; otherwise it runs under an independent grace
    /// timeout so a hung server cannot pin the caller.
    pub async fn with_session<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        database: &str,
        auth: Option<AuthStrategy>,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let created = self.create_session(cancel, database, auth).await?;
        let token = created.response.token.clone().ok_or_else(|| {
            Error::new(ErrorKind::Authentication(
                "session response did not include a token".to_string(),
            ))
        })?;

        let result = f(token.clone()).await;

        if cancel.is_cancelled() {
            warn!(database, "skipping session release after cancellation");
        } else {
            // Independent token: the release must not inherit a cancellation
            // that fires between f returning and the release completing.
            let release_cancel = CancellationToken::new();
            match tokio::time::timeout(
                RELEASE_GRACE,
                self.release_session(&release_cancel, database, &token),
            )
            .await
            {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!(database, error = %err, "failed to release session"),
                Err(_) => warn!(database, "session release timed out"),
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use std::sync::atomic::{AtomicBool, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_envelope(token: &str) -> serde_json::Value {
        serde_json::json!({
            "response": { "token": token },
            "messages": [{ "code": "0", "message": "OK" }]
        })
    }

    fn ok_envelope() -> serde_json::Value {
        serde_json::json!({
            "response": {},
            "messages": [{ "code": "0", "message": "OK" }]
        })
    }

    fn client_for(server: &MockServer) -> Client {
        Client::builder()
            .base_url(server.uri())
            .basic_auth("admin", "secret")
            .config(ClientConfig::builder().without_retry().build())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn create_session_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions"))
            .and(header("Authorization", "Basic YWRtaW46c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_envelope("tok-1")))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let envelope = client
            .create_session(&CancellationToken::new(), "Contacts", None)
            .await
            .unwrap();

        assert_eq!(envelope.response.token.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn create_session_requires_a_strategy() {
        let client = Client::builder()
            .base_url("https://fms.example.com")
            .build()
            .unwrap();

        let err = client
            .create_session(&CancellationToken::new(), "Contacts", None)
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[tokio::test]
    async fn create_session_requires_database() {
        let client = Client::builder()
            .base_url("https://fms.example.com")
            .basic_auth("u", "p")
            .build()
            .unwrap();

        let err = client
            .create_session(&CancellationToken::new(), "", None)
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[tokio::test]
    async fn with_session_releases_exactly_once_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_envelope("tok-1")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions/tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .with_session(&CancellationToken::new(), "Contacts", None, |token| async move {
                assert_eq!(token, "tok-1");
                Ok(42u32)
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        // expect(1) on both mocks verifies on drop.
    }

    #[tokio::test]
    async fn with_session_releases_after_failure_and_keeps_the_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_envelope("tok-1")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions/tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .with_session(
                &CancellationToken::new(),
                "Contacts",
                None,
                |_token| async move {
                    Err::<(), _>(Error::new(ErrorKind::Other("work failed".into())))
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::Other(_)));
    }

    #[tokio::test]
    async fn with_session_release_failure_never_shadows_the_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_envelope("tok-1")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions/tok-1"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "messages": [{ "code": "10", "message": "release failed" }],
                "response": {}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .with_session(&CancellationToken::new(), "Contacts", None, |_token| async move {
                Ok("payload")
            })
            .await;

        assert_eq!(result.unwrap(), "payload");
    }

    #[tokio::test]
    async fn with_session_skips_body_when_create_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "messages": [{ "code": "212", "message": "Invalid user account" }],
                "response": {}
            })))
            .mount(&server)
            .await;

        let ran = AtomicBool::new(false);
        let client = client_for(&server);
        let err = client
            .with_session(&CancellationToken::new(), "Contacts", None, |_token| {
                ran.store(true, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap_err();

        assert_eq!(err.filemaker_code(), Some("212"));
        assert!(!ran.load(Ordering::SeqCst), "body must not run without a session");
    }

    #[tokio::test]
    async fn with_session_errors_when_token_is_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .with_session(&CancellationToken::new(), "Contacts", None, |_token| async {
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err.kind, ErrorKind::Authentication(_)));
    }

    #[tokio::test]
    async fn with_session_skips_release_when_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_envelope("tok-1")))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/fmi/data/vLatest/databases/Contacts/sessions/tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
            .expect(0)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let client = client_for(&server);
        let result = client
            .with_session(&cancel, "Contacts", None, |_token| {
                // Cancellation fires while the scoped work runs.
                cancel.cancel();
                async { Ok("done") }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn release_session_validates_inputs() {
        let client = Client::builder()
            .base_url("https://fms.example.com")
            .build()
            .unwrap();

        let err = client
            .release_session(&CancellationToken::new(), "Contacts", "")
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[tokio::test]
    async fn validate_session_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fmi/data/vLatest/validateSession"))
            .and(header("Authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .validate_session(&CancellationToken::new(), "Contacts", "tok-1")
            .await;
        assert!(result.is_ok());
    }
}
