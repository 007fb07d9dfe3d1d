//! API contract model.
//!
//! A contract is kept as the JSON document the generator produced. Key order
//! is preserved, so iteration follows declaration order.

use crate::error::MockError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path-item keys that name an operation.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A generated API contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contract(Value);

impl Contract {
    /// Wrap a contract document.
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    /// The raw document.
    pub fn document(&self) -> &Value {
        &self.0
    }

    /// True when the document carries nothing: null, false, `""` or zero.
    pub fn is_blank(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::String(s) => s.is_empty(),
            Value::Number(n) => n.as_f64() == Some(0.0),
            _ => false,
        }
    }

    /// Path templates with their operations, in declaration order.
    ///
    /// A contract without `paths` has no operations. A document that is not a
    /// mapping, or whose `paths` is not one, is rejected.
    pub fn path_items(&self) -> Result<Vec<PathItem<'_>>, MockError> {
        let Some(root) = self.0.as_object() else {
            return Err(MockError::InvalidContract(
                "contract must be a mapping".to_string(),
            ));
        };
        let paths = match root.get("paths") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(paths)) => paths,
            Some(_) => {
                return Err(MockError::InvalidContract(
                    "`paths` must be a mapping".to_string(),
                ))
            }
        };

        paths
            .iter()
            .map(|(template, item)| {
                let item = item.as_object().ok_or_else(|| {
                    MockError::InvalidContract(format!("path item `{}` must be a mapping", template))
                })?;
                let operations = item
                    .iter()
                    .filter(|(key, _)| HTTP_METHODS.contains(&key.to_lowercase().as_str()))
                    .map(|(method, op)| (method.to_uppercase(), Operation::new(op.clone())))
                    .collect();
                Ok(PathItem {
                    template: template.as_str(),
                    operations,
                })
            })
            .collect()
    }
}

/// One path template and its operations.
#[derive(Debug)]
pub struct PathItem<'a> {
    /// Path template as declared (e.g. `/users/{id}`)
    pub template: &'a str,
    /// Upper-cased method to operation, in declaration order
    pub operations: Vec<(String, Operation)>,
}

/// A single operation of a path item.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation(Value);

impl Operation {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Status code to response spec, in declaration order.
    pub fn responses(&self) -> Vec<(&str, ResponseSpec<'_>)> {
        self.0
            .get("responses")
            .and_then(Value::as_object)
            .map(|responses| {
                responses
                    .iter()
                    .map(|(code, spec)| (code.as_str(), ResponseSpec(spec)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// View over a response entry of an operation.
#[derive(Debug, Clone, Copy)]
pub struct ResponseSpec<'a>(&'a Value);

impl<'a> ResponseSpec<'a> {
    /// Literal example on the response, or on its first media type.
    pub fn example(&self) -> Option<&'a Value> {
        if let Some(example) = self.0.get("example") {
            return Some(example);
        }
        self.first_media_type()
            .and_then(|media| media.get("example"))
    }

    /// First named example, in declaration order.
    ///
    /// Media-type examples are OpenAPI example objects, so their `value` is
    /// returned when present.
    pub fn named_example(&self) -> Option<&'a Value> {
        if let Some(first) = self.0.get("examples").and_then(first_entry) {
            return Some(first);
        }
        self.first_media_type()
            .and_then(|media| media.get("examples"))
            .and_then(first_entry)
            .map(|example| example.get("value").unwrap_or(example))
    }

    fn first_media_type(&self) -> Option<&'a Map<String, Value>> {
        self.0
            .get("content")
            .and_then(first_entry)
            .and_then(Value::as_object)
    }
}

fn first_entry(value: &Value) -> Option<&Value> {
    value.as_object().and_then(|map| map.values().next())
}
