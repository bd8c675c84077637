use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::model::ResponseSnapshot;

#[derive(Debug, Error, PartialEq)]
pub enum AssertionError {
    #[error("expected status {expected}, got {actual}")]
    Status { expected: u16, actual: u16 },
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("expected a JSON {expected}, got {actual}")]
    UnexpectedShape {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("field `{field}` expected {expected}, got {actual}")]
    FieldMismatch {
        field: String,
        expected: Value,
        actual: Value,
    },
    #[error("unexpected id {0} in filtered response")]
    UnexpectedId(String),
}

pub fn expect_status(response: &ResponseSnapshot, expected: u16) -> Result<(), AssertionError> {
    if response.status == expected {
        Ok(())
    } else {
        Err(AssertionError::Status {
            expected,
            actual: response.status,
        })
    }
}

pub fn expect_json(response: &ResponseSnapshot) -> Result<Value, AssertionError> {
    response
        .json()
        .map_err(|err| AssertionError::InvalidJson(err.to_string()))
}

/// Lists and objects pass; scalars do not.
pub fn expect_container(value: &Value) -> Result<(), AssertionError> {
    match value {
        Value::Array(_) | Value::Object(_) => Ok(()),
        other => Err(AssertionError::UnexpectedShape {
            expected: "list or object",
            actual: json_kind(other),
        }),
    }
}

pub fn expect_field_present<'a>(
    value: &'a Value,
    field: &str,
) -> Result<&'a Value, AssertionError> {
    value
        .get(field)
        .ok_or_else(|| AssertionError::MissingField(field.to_string()))
}

pub fn expect_field_eq(value: &Value, field: &str, expected: &Value) -> Result<(), AssertionError> {
    let actual = expect_field_present(value, field)?;
    if actual == expected {
        Ok(())
    } else {
        Err(AssertionError::FieldMismatch {
            field: field.to_string(),
            expected: expected.clone(),
            actual: actual.clone(),
        })
    }
}

/// Every element of the list must carry an `id` from `allowed`. Ids are
/// compared by their text, so `3` and `"3"` are the same id.
pub fn expect_ids_subset<T: ToString>(value: &Value, allowed: &[T]) -> Result<(), AssertionError> {
    let Value::Array(items) = value else {
        return Err(AssertionError::UnexpectedShape {
            expected: "list",
            actual: json_kind(value),
        });
    };

    let allowed: HashSet<String> = allowed.iter().map(ToString::to_string).collect();
    for item in items {
        let id = id_text(expect_field_present(item, "id")?);
        if !allowed.contains(&id) {
            return Err(AssertionError::UnexpectedId(id));
        }
    }
    Ok(())
}

fn id_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
