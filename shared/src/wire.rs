//! FileMaker Data API wire codec
//!
//! Every Data API response has the same envelope:
//! ```text
//! { "response": { ... }, "messages": [ { "code": "0", "message": "OK" } ] }
//! ```
//!
//! A `code` other than `"0"` signals an error. Record creation additionally
//! reports the outcome of an attached script in `response.scriptError`.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::record::UploadRecord;

/// Error code used for failures that never produced a Data API answer
pub const TRANSPORT_ERROR_CODE: i64 = -1;

/// Data API code for a token the server no longer accepts
pub const INVALID_TOKEN_CODE: i64 = 952;

/// Errors that can occur while decoding a Data API response
#[derive(Error, Debug)]
pub enum WireError {
    #[error("Malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Response carries no messages")]
    MissingMessages,

    #[error("Unparsable error code: {0:?}")]
    InvalidCode(String),

    #[error("Data API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Response is missing {0}")]
    MissingField(&'static str),
}

impl WireError {
    /// Data API code carried by this error, if the server sent one
    pub fn code(&self) -> i64 {
        match self {
            WireError::Api { code, .. } => *code,
            _ => TRANSPORT_ERROR_CODE,
        }
    }
}

/// An error reported on one of the two submit channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFault {
    pub code: i64,
    pub message: String,
}

impl ApiFault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Fault for a request that never got a decodable answer
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(TRANSPORT_ERROR_CODE, message)
    }

    pub fn is_invalid_token(&self) -> bool {
        self.code == INVALID_TOKEN_CODE
    }
}

impl std::fmt::Display for ApiFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code, self.message)
    }
}

impl From<WireError> for ApiFault {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Api { code, message } => ApiFault::new(code, message),
            other => ApiFault::transport(other.to_string()),
        }
    }
}

/// Outcome of a record submission: record channel and script channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitResult {
    pub record_id: Option<String>,
    pub record_error: Option<ApiFault>,
    pub script_error: Option<ApiFault>,
}

impl SubmitResult {
    pub fn is_success(&self) -> bool {
        self.record_error.is_none() && self.script_error.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: Value,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBody {
    record_id: Option<String>,
    script_error: Option<String>,
}

/// Parse a numeric code the way the Data API sends it (as a string)
fn parse_code(raw: &str) -> Result<i64, WireError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| WireError::InvalidCode(raw.to_string()))
}

/// Decode the envelope and fail on a non-zero message code
fn decode_envelope(body: &[u8]) -> Result<Value, WireError> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    let first = envelope.messages.first().ok_or(WireError::MissingMessages)?;

    let code = parse_code(&first.code)?;
    if code != 0 {
        return Err(WireError::Api {
            code,
            message: first.message.clone(),
        });
    }

    Ok(envelope.response)
}

/// Decode a login response into the session token
pub fn decode_session(body: &[u8]) -> Result<String, WireError> {
    let response = decode_envelope(body)?;
    let session: SessionBody = serde_json::from_value(response)?;

    match session.token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(WireError::MissingField("response.token")),
    }
}

/// Decode a logout response
pub fn decode_logout(body: &[u8]) -> Result<(), WireError> {
    decode_envelope(body).map(|_| ())
}

/// Decode a create-record response into both error channels
pub fn decode_submit(body: &[u8]) -> SubmitResult {
    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return SubmitResult {
                record_error: Some(ApiFault::from(WireError::Json(e))),
                ..Default::default()
            }
        }
    };

    let record_error = match envelope.messages.first() {
        None => Some(ApiFault::from(WireError::MissingMessages)),
        Some(first) => match parse_code(&first.code) {
            Ok(0) => None,
            Ok(code) => Some(ApiFault::new(code, first.message.clone())),
            Err(e) => Some(ApiFault::from(e)),
        },
    };

    // The script channel is reported even when the record itself failed
    let body: Option<CreateBody> = serde_json::from_value(envelope.response).ok();
    let (record_id, script_error) = match body {
        Some(body) => {
            let script_error = match body.script_error.as_deref().map(parse_code) {
                None | Some(Ok(0)) => None,
                Some(Ok(code)) => Some(ApiFault::new(code, "script error")),
                Some(Err(e)) => Some(ApiFault::from(e)),
            };
            (body.record_id, script_error)
        }
        None => (None, None),
    };

    SubmitResult {
        record_id,
        record_error,
        script_error,
    }
}

/// Encode a record as a create-record request body
pub fn encode_record(record: &UploadRecord) -> Value {
    let field_data: Map<String, Value> = record
        .fields()
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    let mut body = Map::new();
    body.insert("fieldData".into(), Value::Object(field_data));

    if let Some(script) = record.script() {
        body.insert(script.timing.key().into(), Value::String(script.name.clone()));
        if let Some(param) = &script.param {
            body.insert(script.timing.param_key().into(), Value::String(param.clone()));
        }
    }

    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{fields, ScriptRequest, ScriptTiming, GAP_SCRIPT};

    #[test]
    fn test_decode_session_token() {
        let body = br#"{"response":{"token":"8bd0e9c6"},"messages":[{"code":"0","message":"OK"}]}"#;
        assert_eq!(decode_session(body).expect("token"), "8bd0e9c6");
    }

    #[test]
    fn test_decode_session_error() {
        let body = br#"{"response":{},"messages":[{"code":"212","message":"Invalid user account and/or password; please try again"}]}"#;
        let err = decode_session(body).expect_err("should fail");
        assert!(matches!(err, WireError::Api { code: 212, .. }));
        assert_eq!(err.code(), 212);
    }

    #[test]
    fn test_decode_session_empty_token() {
        let body = br#"{"response":{"token":""},"messages":[{"code":"0","message":"OK"}]}"#;
        assert!(matches!(
            decode_session(body),
            Err(WireError::MissingField(_))
        ));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_session(b"<html>Bad Gateway</html>").expect_err("should fail");
        assert!(matches!(err, WireError::Json(_)));
        assert_eq!(err.code(), TRANSPORT_ERROR_CODE);
    }

    #[test]
    fn test_decode_submit_success() {
        let body = br#"{"response":{"recordId":"147","modId":"0","scriptError":"0"},"messages":[{"code":"0","message":"OK"}]}"#;
        let result = decode_submit(body);
        assert!(result.is_success());
        assert_eq!(result.record_id.as_deref(), Some("147"));
    }

    #[test]
    fn test_decode_submit_script_error_only() {
        let body = br#"{"response":{"recordId":"148","modId":"0","scriptError":"104"},"messages":[{"code":"0","message":"OK"}]}"#;
        let result = decode_submit(body);
        assert!(result.record_error.is_none());
        assert_eq!(result.script_error.map(|f| f.code), Some(104));
    }

    #[test]
    fn test_decode_submit_record_error() {
        let body = br#"{"response":{},"messages":[{"code":"952","message":"Invalid FileMaker Data API token (*)"}]}"#;
        let result = decode_submit(body);
        let fault = result.record_error.expect("record error");
        assert!(fault.is_invalid_token());
        assert!(result.script_error.is_none());
    }

    #[test]
    fn test_decode_submit_garbage_is_transport_fault() {
        let result = decode_submit(b"");
        assert_eq!(result.record_error.map(|f| f.code), Some(TRANSPORT_ERROR_CODE));
    }

    #[test]
    fn test_encode_record() {
        let mut record = UploadRecord::new();
        record.add_field(fields::HUMIDITY, "41.2");
        record.add_field(fields::WHEN, "05/01/2024 10:00:00");
        record.set_script(ScriptRequest::after(GAP_SCRIPT));

        let body = encode_record(&record);
        assert_eq!(body["fieldData"]["humidity"], "41.2");
        assert_eq!(body["script"], GAP_SCRIPT);
        assert!(body.get("script.param").is_none());

        // Field order is preserved on the wire
        let keys: Vec<&String> = body["fieldData"].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["humidity", "when"]);
    }

    #[test]
    fn test_encode_prerequest_script_with_param() {
        let mut record = UploadRecord::new();
        record.set_script(ScriptRequest {
            name: "stamp".into(),
            timing: ScriptTiming::Prerequest,
            param: Some("x".into()),
        });

        let body = encode_record(&record);
        assert_eq!(body["script.prerequest"], "stamp");
        assert_eq!(body["script.prerequest.param"], "x");
        assert!(body["fieldData"].as_object().unwrap().is_empty());
    }
}
