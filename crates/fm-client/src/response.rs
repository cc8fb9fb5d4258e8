//! The FileMaker Data API response envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The JSON wrapper `{ response, messages }` returned by every Data API call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Envelope {
    #[serde(default)]
    pub response: EnvelopeBody,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// One entry of the envelope's `messages` array. Code `"0"` signals success.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Message {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Operation-specific payload carried in the envelope's `response` field.
///
/// The Data API reuses one shape for every endpoint and omits the fields a
/// given operation does not produce, so everything here is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeBody {
    /// Session token, present on session-create responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mod_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_info: Option<DataInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_info: Option<ProductInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<DatabaseInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layouts: Vec<LayoutInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scripts: Vec<ScriptInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_meta_data: Vec<FieldMetaData>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub portal_meta_data: HashMap<String, Vec<FieldMetaData>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_lists: Vec<ValueList>,
}

/// One record returned by a get, list, or find operation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub field_data: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub portal_data: HashMap<String, Vec<serde_json::Value>>,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub mod_id: String,
}

/// Found-set statistics accompanying record responses.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInfo {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub total_record_count: i64,
    #[serde(default)]
    pub found_count: i64,
    #[serde(default)]
    pub returned_count: i64,
}

/// Server product information from the `productInfo` endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub build_date: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub date_format: String,
    #[serde(default)]
    pub time_format: String,
    #[serde(default)]
    pub time_stamp_format: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseInfo {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LayoutInfo {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptInfo {
    pub name: String,
    #[serde(default)]
    pub is_folder: bool,
}

/// Field definition from layout metadata.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetaData {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub display_type: String,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub auto_enter: bool,
    #[serde(default)]
    pub not_empty: bool,
    #[serde(default)]
    pub numeric: bool,
    #[serde(default)]
    pub max_repeat: i32,
    #[serde(default)]
    pub max_characters: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueList {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub list_type: String,
    #[serde(default)]
    pub values: Vec<ValueListEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ValueListEntry {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub display: String,
}
