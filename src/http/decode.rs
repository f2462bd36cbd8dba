//! Response-shape decoding
//!
//! List endpoints answer either with a bare JSON array or with a paginated
//! envelope. [`decode_list`] accepts the known shapes and reports anything else
//! as a [`DecodeError`] instead of quietly treating it as "no data".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::DecodeError;

/// Envelope keys that may carry the list, in lookup order
const LIST_KEYS: &[&str] = &["results", "items", "data"];

/// DRF-style paginated response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<Value>,
    #[serde(default, alias = "prev")]
    pub previous: Option<Value>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// True when the server reports a further page
    pub fn has_next(&self) -> bool {
        matches!(&self.next, Some(v) if !v.is_null())
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, DecodeError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| DecodeError::Item {
                index,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Decode a list response
///
/// Accepted: `[...]`, `{"results": [...]}`, `{"items": [...]}`, `{"data": [...]}`.
pub fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, DecodeError> {
    match value {
        Value::Array(items) => decode_items(items),
        Value::Object(mut map) => {
            for key in LIST_KEYS {
                if matches!(map.get(*key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(*key) {
                        return decode_items(items);
                    }
                }
            }
            Err(DecodeError::UnexpectedShape {
                expected: "array or {results|items|data: array}".to_string(),
                found: describe(&Value::Object(map)),
            })
        }
        other => Err(DecodeError::UnexpectedShape {
            expected: "array or {results|items|data: array}".to_string(),
            found: describe(&other),
        }),
    }
}

/// Decode a single object, naming the shape on failure
pub fn decode_one<T: DeserializeOwned>(value: Value) -> Result<T, DecodeError> {
    let found = describe(&value);
    serde_json::from_value(value).map_err(|e| DecodeError::UnexpectedShape {
        expected: std::any::type_name::<T>().to_string(),
        found: format!("{found} ({e})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: u64,
    }

    #[test]
    fn test_bare_array() {
        let rows: Vec<Row> = decode_list(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(rows, vec![Row { id: 1 }, Row { id: 2 }]);
    }

    #[test]
    fn test_envelopes() {
        for key in ["results", "items", "data"] {
            let rows: Vec<Row> = decode_list(json!({ key: [{"id": 7}] })).unwrap();
            assert_eq!(rows, vec![Row { id: 7 }], "envelope key {key}");
        }
    }

    #[test]
    fn test_empty_list_is_ok() {
        let rows: Vec<Row> = decode_list(json!({"count": 0, "results": []})).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_malformed_shape_is_an_error() {
        let err = decode_list::<Row>(json!({"detail": "oops"})).unwrap_err();
        match err {
            DecodeError::UnexpectedShape { found, .. } => assert!(found.contains("detail")),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(decode_list::<Row>(json!(null)).is_err());
        assert!(decode_list::<Row>(json!({"results": "nope"})).is_err());
    }

    #[test]
    fn test_bad_item_reports_index() {
        let err = decode_list::<Row>(json!([{"id": 1}, {"id": "x"}])).unwrap_err();
        assert!(matches!(err, DecodeError::Item { index: 1, .. }));
    }

    #[test]
    fn test_page_accepts_prev_alias() {
        let page: Page<Row> =
            serde_json::from_value(json!({"count": 3, "next": 2, "prev": null, "results": [{"id": 1}]}))
                .unwrap();
        assert!(page.has_next());
        assert_eq!(page.results.len(), 1);
    }
}
