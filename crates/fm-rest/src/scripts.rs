//! Script execution and script hooks for record operations.

use fm_data_client::{CancellationToken, Client, Envelope, RequestSpec, Result};

use crate::validate;

/// A script name plus its optional parameter.
#[derive(Debug, Clone)]
pub struct ScriptCall {
    pub script: String,
    pub param: Option<String>,
}

impl ScriptCall {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            param: None,
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    fn push_params(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        if self.script.is_empty() {
            return;
        }
        out.push((prefix.to_string(), self.script.clone()));
        if let Some(param) = &self.param {
            out.push((format!("{}.param", prefix), param.clone()));
        }
    }
}

/// Scripts to run around a record operation.
///
/// The Data API runs `prerequest` before the action, `presort` before
/// sorting (find operations), and `after` once the action completes. All
/// three travel as query parameters on the record request.
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    pub prerequest: Option<ScriptCall>,
    pub presort: Option<ScriptCall>,
    pub after: Option<ScriptCall>,
}

impl ScriptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prerequest(mut self, call: ScriptCall) -> Self {
        self.prerequest = Some(call);
        self
    }

    pub fn presort(mut self, call: ScriptCall) -> Self {
        self.presort = Some(call);
        self
    }

    pub fn after(mut self, call: ScriptCall) -> Self {
        self.after = Some(call);
        self
    }

    /// Encode as the Data API's query parameters: `script.prerequest`,
    /// `script.presort`, and plain `script` for the after hook, each with an
    /// optional `.param` companion.
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(call) = &self.prerequest {
            call.push_params("script.prerequest", &mut params);
        }
        if let Some(call) = &self.presort {
            call.push_params("script.presort", &mut params);
        }
        if let Some(call) = &self.after {
            call.push_params("script", &mut params);
        }
        params
    }

    /// Attach the script parameters to a request spec.
    pub(crate) fn apply(&self, mut spec: RequestSpec) -> RequestSpec {
        for (name, value) in self.to_query_params() {
            spec = spec.query(name, value);
        }
        spec
    }
}

/// Standalone script execution.
#[derive(Debug, Clone)]
pub struct ScriptService {
    client: Client,
}

impl ScriptService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Run a script on a layout under an existing session.
    ///
    /// The script name is percent-encoded so names with spaces or slashes
    /// survive the path. The script's result arrives in
    /// `response.script_result`.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        database: &str,
        layout: &str,
        script: &str,
        param: Option<&str>,
        token: &str,
    ) -> Result<Envelope> {
        validate::database(database)?;
        validate::layout(layout)?;
        validate::script(script)?;
        validate::token(token)?;

        let path = format!(
            "fmi/data/{}/databases/{}/layouts/{}/script/{}",
            self.client.version(),
            database,
            layout,
            urlencoding::encode(script)
        );

        let mut spec = RequestSpec::get(path).bearer_auth(token);
        if let Some(param) = param {
            if !param.is_empty() {
                spec = spec.query("script.param", param);
            }
        }

        self.client.execute(cancel, spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_client;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn execute_escapes_script_name_and_passes_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/fmi/data/vLatest/databases/Contacts/layouts/People/script/Send%20Invoice",
            ))
            .and(header("Authorization", "Bearer tok-1"))
            .and(query_param("script.param", "42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": { "scriptResult": "done", "scriptError": "0" },
                "messages": [{ "code": "0", "message": "OK" }]
            })))
            .mount(&server)
            .await;

        let service = ScriptService::new(test_client(&server));
        let envelope = service
            .execute(
                &CancellationToken::new(),
                "Contacts",
                "People",
                "Send Invoice",
                Some("42"),
                "tok-1",
            )
            .await
            .unwrap();

        assert_eq!(envelope.response.script_result.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn execute_validates_inputs() {
        let server = MockServer::start().await;
        let service = ScriptService::new(test_client(&server));
        let cancel = CancellationToken::new();

        for (db, layout, script, token) in [
            ("", "People", "S", "t"),
            ("Contacts", "", "S", "t"),
            ("Contacts", "People", "", "t"),
            ("Contacts", "People", "S", ""),
        ] {
            let err = service
                .execute(&cancel, db, layout, script, None, token)
                .await
                .unwrap_err();
            assert!(err.is_validation_error());
        }
    }

    #[test]
    fn script_options_encode_all_three_hooks() {
        let options = ScriptOptions::new()
            .prerequest(ScriptCall::new("Before").with_param("a"))
            .presort(ScriptCall::new("Sort"))
            .after(ScriptCall::new("After").with_param("b"));

        let params = options.to_query_params();
        assert_eq!(
            params,
            vec![
                ("script.prerequest".to_string(), "Before".to_string()),
                ("script.prerequest.param".to_string(), "a".to_string()),
                ("script.presort".to_string(), "Sort".to_string()),
                ("script".to_string(), "After".to_string()),
                ("script.param".to_string(), "b".to_string()),
            ]
        );
    }
}
