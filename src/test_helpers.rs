//! Shared fixtures for unit tests.

use crate::error::CollaboratorError;
use crate::transport::Transport;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Canned answer for one collaborator URL.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Fail(CollaboratorError),
    /// Answer after sleeping (drive with a paused clock)
    Delayed(Duration, Value),
}

/// Transport that answers from a table and records every call.
///
/// URLs without a reply fail as if the connection was refused.
#[derive(Default)]
pub struct FakeTransport {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, reply: Reply) -> Self {
        self.replies.insert(url.to_string(), reply);
        self
    }

    /// URLs called, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Payload sent to `url`, if it was called.
    pub fn payload_for(&self, url: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(called, _)| called == url)
            .map(|(_, payload)| payload.clone())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post_json(
        &self,
        url: &str,
        payload: &Value,
        _timeout: Duration,
    ) -> Result<Value, CollaboratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));

        match self.replies.get(url) {
            Some(Reply::Json(body)) => Ok(body.clone()),
            Some(Reply::Fail(err)) => Err(err.clone()),
            Some(Reply::Delayed(delay, body)) => {
                tokio::time::sleep(*delay).await;
                Ok(body.clone())
            }
            None => Err(CollaboratorError::Transport("connection refused".to_string())),
        }
    }
}
