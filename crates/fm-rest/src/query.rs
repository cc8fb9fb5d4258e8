//! Find-query primitives: field operators, query groups, and sort orders.

use serde::{Deserialize, Serialize};

/// Comparison operator for a single find criterion.
///
/// The Data API expresses operators by prefixing or wrapping the field value,
/// so each variant maps to a textual encoding rather than a JSON field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOperator {
    /// Exact match (`==value`).
    Equal,
    /// Substring match (`==*value*`).
    Contains,
    /// Prefix match (`==value*`).
    BeginsWith,
    /// Suffix match (`==*value`).
    EndsWith,
    /// `>value`
    GreaterThan,
    /// `>=value`
    GreaterThanEqual,
    /// `<value`
    LessThan,
    /// `<=value`
    LessThanEqual,
}

impl FieldOperator {
    /// Encode `value` with this operator's prefix/wrapper.
    pub fn encode(&self, value: &str) -> String {
        match self {
            FieldOperator::Equal => format!("=={}", value),
            FieldOperator::Contains => format!("==*{}*", value),
            FieldOperator::BeginsWith => format!("=={}*", value),
            FieldOperator::EndsWith => format!("==*{}", value),
            FieldOperator::GreaterThan => format!(">{}", value),
            FieldOperator::GreaterThanEqual => format!(">={}", value),
            FieldOperator::LessThan => format!("<{}", value),
            FieldOperator::LessThanEqual => format!("<={}", value),
        }
    }
}

/// One find criterion: a field name, a comparison value, and an operator.
#[derive(Debug, Clone)]
pub struct FieldQuery {
    pub name: String,
    pub value: String,
    pub operator: FieldOperator,
}

impl FieldQuery {
    pub fn new(
        name: impl Into<String>,
        operator: FieldOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            operator,
        }
    }

    /// The operator-encoded value string sent to the server.
    pub fn encoded_value(&self) -> String {
        self.operator.encode(&self.value)
    }
}

/// A group of criteria combined with AND. Multiple groups in one find
/// request combine with OR.
#[derive(Debug, Clone, Default)]
pub struct QueryGroup {
    fields: Vec<FieldQuery>,
}

impl QueryGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a criterion to this group (AND with the group's other criteria).
    pub fn with(
        mut self,
        name: impl Into<String>,
        operator: FieldOperator,
        value: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldQuery::new(name, operator, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flatten into the `{ field: encoded-value }` map the `_find` body uses.
    pub(crate) fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), serde_json::Value::from(f.encoded_value())))
            .collect()
    }
}

/// Sort direction for find and list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ascend")]
    Ascend,
    #[serde(rename = "descend")]
    Descend,
}

/// One sort rule, serialized as `{ "fieldName": ..., "sortOrder": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sorter {
    pub field_name: String,
    pub sort_order: SortOrder,
}

impl Sorter {
    pub fn new(field_name: impl Into<String>, sort_order: SortOrder) -> Self {
        Self {
            field_name: field_name.into(),
            sort_order,
        }
    }

    /// Shorthand for an ascending sort on `field_name`.
    pub fn ascending(field_name: impl Into<String>) -> Self {
        Self::new(field_name, SortOrder::Ascend)
    }

    /// Shorthand for a descending sort on `field_name`.
    pub fn descending(field_name: impl Into<String>) -> Self {
        Self::new(field_name, SortOrder::Descend)
    }
}
