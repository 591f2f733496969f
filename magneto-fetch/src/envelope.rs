//! Box response envelope.
//!
//! Every box endpoint answers with `{"success": bool, "result": ..., "msg": ...,
//! "error_code": ...}`. Some error paths (missing endpoints, proxies) return
//! plain HTML or an empty body instead, so the HTTP status is consulted only
//! when no envelope can be read.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BoxError;

/// Error code the box returns when a session is missing or expired.
pub const AUTH_REQUIRED: &str = "auth_required";

/// Maximum body length kept in [`BoxError::Http`].
const MAX_BODY_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    success: Option<bool>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

/// Decodes a box response into `T`.
///
/// # Errors
///
/// - [`BoxError::SessionExpired`] for HTTP 403 with `auth_required`
/// - [`BoxError::Rejected`] when the box answered `success: false`
/// - [`BoxError::NotFound`] / [`BoxError::Http`] for non-envelope error bodies
/// - [`BoxError::InvalidResponse`] when `result` does not match `T`
pub fn decode<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, BoxError> {
    let envelope = serde_json::from_str::<RawEnvelope>(body)
        .ok()
        .filter(|e| e.success.is_some());

    let Some(envelope) = envelope else {
        return Err(non_envelope_error(status, body));
    };

    if status == 403 && envelope.error_code.as_deref() == Some(AUTH_REQUIRED) {
        return Err(BoxError::SessionExpired);
    }

    if envelope.success != Some(true) {
        return Err(BoxError::Rejected {
            message: envelope.msg.unwrap_or_else(|| format!("HTTP {status}")),
            error_code: envelope.error_code,
        });
    }

    let result = envelope.result.unwrap_or(Value::Null);
    serde_json::from_value(result).map_err(|e| BoxError::InvalidResponse(e.to_string()))
}

fn non_envelope_error(status: u16, body: &str) -> BoxError {
    match status {
        404 => BoxError::NotFound,
        200..=299 => BoxError::InvalidResponse(format!(
            "expected a box envelope, got: {}",
            truncate(body)
        )),
        _ => BoxError::Http {
            status,
            body: truncate(body),
        },
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_BODY_LEN).collect()
}

// ============================================================================
// Tests
// ============================================================================
