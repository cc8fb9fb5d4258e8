//! Global field values, set per session.

use std::collections::HashMap;

use fm_data_client::{CancellationToken, Client, Envelope, Error, RequestSpec, Result};

use crate::validate;

/// Sets global field values. Globals keep their value for the lifetime of
/// the session that set them, across every record in the database.
#[derive(Debug, Clone)]
pub struct GlobalFieldsService {
    client: Client,
}

impl GlobalFieldsService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// PATCH one or more global fields. Field names use the
    /// `Table::Field` form; at least one field is required.
    pub async fn set_global_fields(
        &self,
        cancel: &CancellationToken,
        database: &str,
        fields: &HashMap<String, serde_json::Value>,
        token: &str,
    ) -> Result<Envelope> {
        validate::database(database)?;
        if fields.is_empty() {
            return Err(Error::validation(
                "globalFields",
                "at least one global field must be specified",
            ));
        }
        validate::token(token)?;

        let path = format!(
            "fmi/data/{}/databases/{}/globals",
            self.client.version(),
            database
        );
        let body = serde_json::json!({ "globalFields": fields });

        self.client
            .execute(
                cancel,
                RequestSpec::patch(path).bearer_auth(token).json_value(body),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ok_envelope, test_client};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn set_global_fields_patches_wrapped_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/fmi/data/vLatest/databases/Contacts/globals"))
            .and(header("Authorization", "Bearer tok-1"))
            .and(body_json(serde_json::json!({
                "globalFields": { "Prefs::Theme": "dark" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_envelope()))
            .mount(&server)
            .await;

        let mut fields = HashMap::new();
        fields.insert("Prefs::Theme".to_string(), serde_json::json!("dark"));

        let service = GlobalFieldsService::new(test_client(&server));
        service
            .set_global_fields(&CancellationToken::new(), "Contacts", &fields, "tok-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn set_global_fields_requires_at_least_one_field() {
        let server = MockServer::start().await;
        let service = GlobalFieldsService::new(test_client(&server));
        let err = service
            .set_global_fields(
                &CancellationToken::new(),
                "Contacts",
                &HashMap::new(),
                "tok-1",
            )
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("globalFields"));
    }
}
