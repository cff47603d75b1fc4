//! List query builders, encoded the way the REST API expects them in
//! `queries[]`.

use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal { attribute: String, value: Value },
    OrderAsc(String),
    OrderDesc(String),
    Limit(u32),
    CursorAfter(String),
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Equal { attribute: attribute.into(), value: value.into() }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self { Query::OrderDesc(attribute.into()) }

    pub fn order_asc(attribute: impl Into<String>) -> Self { Query::OrderAsc(attribute.into()) }

    pub fn to_json(&self) -> Value {
        match self {
            Query::Equal { attribute, value } => {
                let values = match value {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                json!({ "method": "equal", "attribute": attribute, "values": values })
            }
            Query::OrderAsc(attribute) => json!({ "method": "orderAsc", "attribute": attribute }),
            Query::OrderDesc(attribute) => json!({ "method": "orderDesc", "attribute": attribute }),
            Query::Limit(n) => json!({ "method": "limit", "values": [n] }),
            Query::CursorAfter(id) => json!({ "method": "cursorAfter", "values": [id] }),
        }
    }

    pub fn encode(&self) -> String { self.to_json().to_string() }
}
