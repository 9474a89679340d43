//! Invitation decoding
//!
//! Invitations arrive out-of-band as whatever the other party pasted: raw
//! JSON, a URL carrying the payload in a `c_i=` or `oob=` query parameter,
//! or a bare base64url blob that may have lost its padding.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::Engine;
use serde_json::{Map, Value};
use url::Url;

use crate::error::DecodeError;

/// Query markers, in priority order. Legacy connection invitations use
/// `c_i=`, out-of-band invitations use `oob=`.
const QUERY_MARKERS: &[&str] = &["c_i=", "oob="];

/// URL-safe base64 that accepts non-zero trailing bits, which some
/// encoders emit when they strip padding.
const INVITE_ENGINE: GeneralPurpose =
    GeneralPurpose::new(&alphabet::URL_SAFE, PAD.with_decode_allow_trailing_bits(true));

/// A decoded invitation message
#[derive(Debug, Clone, PartialEq)]
pub struct Invitation {
    message: Map<String, Value>,
}

impl Invitation {
    /// The invitation as a JSON value, ready to post to the agent
    pub fn as_json(&self) -> Value {
        Value::Object(self.message.clone())
    }

    /// The DIDComm message type (`@type`), if present
    pub fn message_type(&self) -> Option<&str> {
        self.message.get("@type").and_then(Value::as_str)
    }

    /// Whether this is an out-of-band invitation rather than a legacy
    /// connection invitation
    pub fn is_out_of_band(&self) -> bool {
        self.message_type()
            .is_some_and(|t| t.contains("/out-of-band/"))
    }

    /// The inviter's label, if present
    pub fn label(&self) -> Option<&str> {
        self.message.get("label").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.message.get(key)
    }
}

/// Decode raw user input into an invitation.
///
/// A failure means the input could not be turned into a JSON object; the
/// caller should ask for another line.
pub fn decode(raw: &str) -> Result<Invitation, DecodeError> {
    let candidate = decode_padded_base64(&extract_candidate(raw));

    let value: Value = serde_json::from_str(&candidate)
        .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    match value {
        Value::Object(message) => Ok(Invitation { message }),
        _ => Err(DecodeError::InvalidJson(
            "invitation must be a JSON object".to_string(),
        )),
    }
}

/// Pull the payload out of a URL query, or return the input unchanged.
///
/// The payload is sliced from the text as given, so characters a URL parser
/// would percent-encode (quotes, spaces) survive.
fn extract_candidate(raw: &str) -> String {
    if Url::parse(raw).is_err() {
        return raw.to_string();
    }

    let before_fragment = raw.split('#').next().unwrap_or(raw);
    if let Some((_, query)) = before_fragment.split_once('?') {
        for marker in QUERY_MARKERS {
            if let Some(pos) = query.find(marker) {
                return query[pos + marker.len()..].to_string();
            }
        }
    }

    raw.to_string()
}

/// Attempt base64url decoding when the length suggests missing padding.
///
/// Only lengths with a remainder of 2 or 3 modulo 4 are treated as padded
/// base64 candidates. Anything that fails to decode, or decodes to invalid
/// UTF-8, is returned unchanged.
fn decode_padded_base64(candidate: &str) -> String {
    let padlen = 4 - candidate.len() % 4;
    if padlen > 2 {
        return candidate.to_string();
    }

    let padded = format!("{}{}", candidate, "=".repeat(padlen));

    INVITE_ENGINE
        .decode(padded.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| candidate.to_string())
}
