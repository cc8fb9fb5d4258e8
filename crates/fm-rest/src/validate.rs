//! Input validation shared by the endpoint adapters.

use fm_data_client::{Error, Result};

pub(crate) fn require(field: &str, value: &str, message: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(field, message));
    }
    Ok(())
}

pub(crate) fn database(database: &str) -> Result<()> {
    require("database", database, "database name is required")
}

pub(crate) fn layout(layout: &str) -> Result<()> {
    require("layout", layout, "layout name is required")
}

pub(crate) fn token(token: &str) -> Result<()> {
    require("token", token, "session token is required")
}

pub(crate) fn record_id(record_id: &str) -> Result<()> {
    require("recordId", record_id, "record ID is required")
}

pub(crate) fn script(script: &str) -> Result<()> {
    require("script", script, "script name is required")
}

pub(crate) fn field_name(field_name: &str) -> Result<()> {
    require("fieldName", field_name, "field name is required")
}

pub(crate) fn repetition(repetition: u32) -> Result<()> {
    if repetition < 1 {
        return Err(Error::validation("repetition", "repetition must be >= 1"));
    }
    Ok(())
}
