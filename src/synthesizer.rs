//! Mock response synthesis.
//!
//! Picks one response entry per operation and extracts its example, or
//! builds a placeholder so a matched operation always produces a body.
//! Statuses that forbid a body (1xx, 204, 304) are answered without one.

use crate::contract::Operation;
use serde::Serialize;
use serde_json::{json, Value};

/// A synthesized mock response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockResponse {
    /// HTTP status of the selected response entry
    pub status: u16,
    /// Response body; `None` for statuses that cannot carry one
    pub body: Option<Value>,
}

/// Build the response for a matched operation.
///
/// The numerically lowest status code is selected. Non-numeric keys
/// (`default`, `2XX`) rank after every numeric code, in declaration order.
pub fn synthesize(operation: &Operation, method: &str, path: &str) -> MockResponse {
    let responses = operation.responses();

    let selected = responses
        .iter()
        .enumerate()
        .min_by_key(|(index, (code, _))| match code.parse::<u16>() {
            Ok(numeric) => (0, numeric, *index),
            Err(_) => (1, 0, *index),
        })
        .map(|(_, entry)| entry);

    let Some((code, spec)) = selected else {
        return MockResponse {
            status: 200,
            body: Some(placeholder(method, path)),
        };
    };

    let status = status_for(code);
    if is_bodiless(status) {
        return MockResponse { status, body: None };
    }

    let body = spec
        .example()
        .or_else(|| spec.named_example())
        .cloned()
        .unwrap_or_else(|| placeholder(method, path));

    MockResponse {
        status,
        body: Some(body),
    }
}

fn is_bodiless(status: u16) -> bool {
    status < 200 || status == 204 || status == 304
}

/// Map a response key to an HTTP status.
fn status_for(code: &str) -> u16 {
    if let Ok(status) = code.parse::<u16>() {
        if (100..=599).contains(&status) {
            return status;
        }
    }
    // `4XX` style ranges
    let bytes = code.as_bytes();
    if bytes.len() == 3 && bytes[1..].eq_ignore_ascii_case(b"xx") {
        if let Some(class @ 1..=5) = (bytes[0] as char).to_digit(10) {
            return (class * 100) as u16;
        }
    }
    200
}

fn placeholder(method: &str, path: &str) -> Value {
    json!({
        "message": format!("Mock response for {} {}", method.to_uppercase(), path),
        "method": method.to_uppercase(),
        "path": path,
    })
}
