//! Invoker input shapes and their CSV normalization.

use serde_json::Value;

use crate::error::{LifeboatError, Result};

const SHAPE_HINT: &str = "Provide \"body\" (CSV string) or \"data\" (array).";

/// Accepted invoker inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationEvent {
    /// Gateway wrapper: `{"body": ...}`.
    Gateway(Value),
    /// Direct call: `{"data": [...]}`.
    Direct(Vec<Value>),
}

impl InvocationEvent {
    /// Classify a raw event. `body` wins when both keys are present.
    pub fn from_value(event: &Value) -> Result<Self> {
        let Some(obj) = event.as_object() else {
            return Err(LifeboatError::InvalidInvocationShape(SHAPE_HINT.to_string()));
        };
        if let Some(body) = obj.get("body") {
            return Ok(Self::Gateway(body.clone()));
        }
        match obj.get("data") {
            Some(Value::Array(values)) => Ok(Self::Direct(values.clone())),
            Some(_) => Err(LifeboatError::InvalidInvocationShape(
                "\"data\" must be an array of feature values.".to_string(),
            )),
            None => Err(LifeboatError::InvalidInvocationShape(SHAPE_HINT.to_string())),
        }
    }

    /// Single CSV line to forward downstream.
    pub fn into_csv(self) -> Result<String> {
        match self {
            Self::Direct(values) => join_features(&values),
            Self::Gateway(Value::String(body)) => csv_from_body_text(body),
            Self::Gateway(Value::Object(obj)) => data_from_object(&obj),
            Self::Gateway(_) => Err(LifeboatError::InvalidInvocationShape(
                "\"body\" must be a CSV string or a JSON object with \"data\".".to_string(),
            )),
        }
    }
}

fn csv_from_body_text(body: String) -> Result<String> {
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(obj)) => data_from_object(&obj),
        Ok(Value::String(inner)) => Ok(inner),
        // Anything else is forwarded as CSV text untouched, including JSON
        // numbers, arrays and booleans. The endpoint decides what to do with
        // it; a non-numeric body there comes back as the default prediction.
        _ => Ok(body),
    }
}

fn data_from_object(obj: &serde_json::Map<String, Value>) -> Result<String> {
    match obj.get("data") {
        Some(Value::Array(values)) => join_features(values),
        _ => Err(LifeboatError::InvalidInvocationShape(
            "JSON body must contain a \"data\" array.".to_string(),
        )),
    }
}

/// `','.join` of the values, numbers kept in their JSON text form.
pub fn join_features(values: &[Value]) -> Result<String> {
    if values.is_empty() {
        return Err(LifeboatError::InvalidInvocationShape(
            "\"data\" must not be empty.".to_string(),
        ));
    }
    let fields = values
        .iter()
        .enumerate()
        .map(|(idx, v)| match v {
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.clone()),
            other => Err(LifeboatError::InvalidInvocationShape(format!(
                "feature {idx} must be a number or string, got {other}"
            ))),
        })
        .collect::<Result<Vec<String>>>()?;
    Ok(fields.join(","))
}
