//! JSON response envelope printed by every command.

use orgdir_core::{LookupError, LookupResult};
use serde::Serialize;
use serde_json::{json, Value};

/// `{status, message, data, extras}` response body.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub status: &'static str,
    pub message: String,
    pub data: Option<Value>,
    pub extras: Option<Value>,
}

impl Envelope {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            status: "success",
            message: message.into(),
            data: Some(data),
            extras: None,
        }
    }

    pub fn error(err: &LookupError) -> Self {
        Self {
            status: "error",
            message: err.to_string(),
            data: None,
            extras: Some(json!({ "status_code": err.kind().status_code() })),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Shapes a lookup outcome into an envelope.
pub fn from_lookup<T: Serialize>(result: LookupResult<T>) -> serde_json::Result<Envelope> {
    match result {
        Ok(value) => {
            let data = serde_json::to_value(value)?;
            let message = match &data {
                Value::Array(items) => format!("found {} organizations", items.len()),
                _ => "organization found".to_string(),
            };
            Ok(Envelope::success(message, data))
        }
        Err(err) => Ok(Envelope::error(&err)),
    }
}
