//! Normalizes list endpoint payloads into a single `PageResult` shape.

use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::protocol::ListResponse;

use crate::error::ClientError;

/// One page of records plus the server-side total across all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> PageResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<ListResponse<T>> for PageResult<T> {
    fn from(value: ListResponse<T>) -> Self {
        match value {
            ListResponse::Envelope { data, total } => {
                let total = total.unwrap_or(data.len() as u64);
                Self { items: data, total }
            }
            ListResponse::Bare(items) => Self {
                total: items.len() as u64,
                items,
            },
        }
    }
}

/// Accepts a bare array or a `{data, total}` envelope; anything else is an
/// `InvalidResponse` so the caller shows an error instead of an empty list.
pub fn normalize_list<T: DeserializeOwned>(payload: Value) -> Result<PageResult<T>, ClientError> {
    let shape_ok = match &payload {
        Value::Array(_) => true,
        Value::Object(map) => matches!(map.get("data"), Some(Value::Array(_))),
        _ => false,
    };
    if !shape_ok {
        return Err(ClientError::InvalidResponse(format!(
            "expected a list or a {{data, total}} envelope, got {}",
            describe(&payload)
        )));
    }

    let response: ListResponse<T> = serde_json::from_value(payload)
        .map_err(|err| ClientError::InvalidResponse(format!("malformed list item: {err}")))?;
    Ok(response.into())
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object without a data array",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared::domain::College;

    use super::*;

    fn college(code: &str) -> Value {
        json!({"id": 1, "college_code": code, "college_name": "College of Engineering"})
    }

    #[test]
    fn bare_array_total_defaults_to_length() {
        let page: PageResult<College> =
            normalize_list(json!([college("COE"), college("CCS")])).expect("bare");
        assert_eq!(page.total, 2);
        assert_eq!(page.items[1].college_code.as_str(), "CCS");
    }

    #[test]
    fn envelope_keeps_server_total() {
        let page: PageResult<College> =
            normalize_list(json!({"data": [college("COE")], "total": 31})).expect("envelope");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 31);
    }

    #[test]
    fn envelope_without_total_counts_items() {
        let page: PageResult<College> =
            normalize_list(json!({"data": [college("COE")]})).expect("envelope");
        assert_eq!(page.total, 1);
    }

    #[test]
    fn empty_array_is_an_empty_page() {
        let page: PageResult<College> = normalize_list(json!([])).expect("empty");
        assert_eq!(page, PageResult::empty());
    }

    #[test]
    fn unknown_shapes_are_rejected() {
        for payload in [
            json!({"items": []}),
            json!({"data": "nope"}),
            json!("text"),
            json!(null),
        ] {
            let err = normalize_list::<College>(payload).expect_err("must reject");
            assert!(matches!(err, ClientError::InvalidResponse(_)));
        }
    }

    #[test]
    fn malformed_items_are_rejected() {
        let err = normalize_list::<College>(json!([{"college_code": 5}])).expect_err("bad item");
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }
}
