//! Request matching logic.
//!
//! Compiles a contract's path templates into anchored regexes once per
//! session start, then matches incoming requests by linear scan in
//! declaration order.

use crate::contract::{Contract, Operation};
use crate::error::MockError;
use regex::Regex;
use std::collections::HashMap;

/// A compiled path template with its operations.
#[derive(Debug)]
pub struct MockMatcher {
    /// Path template as declared in the contract
    pub path_template: String,
    /// Anchored pattern; each parameter captures one non-slash segment
    pattern: Regex,
    /// Parameter names, in capture order
    param_names: Vec<String>,
    /// Upper-cased method to operation
    methods: Vec<(String, Operation)>,
}

impl MockMatcher {
    fn compile(path_template: &str, methods: Vec<(String, Operation)>) -> Result<Self, MockError> {
        let (pattern, param_names) = template_pattern(path_template);
        let pattern = Regex::new(&pattern).map_err(|e| {
            MockError::InvalidContract(format!("path `{}`: {}", path_template, e))
        })?;

        Ok(Self {
            path_template: path_template.to_string(),
            pattern,
            param_names,
            methods,
        })
    }

    /// Extract path parameters if `path` fits this template.
    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.pattern.captures(path)?;
        Some(
            self.param_names
                .iter()
                .zip(captures.iter().skip(1))
                .filter_map(|(name, cap)| cap.map(|m| (name.clone(), m.as_str().to_string())))
                .collect(),
        )
    }

    fn operation(&self, method: &str) -> Option<&Operation> {
        self.methods
            .iter()
            .find(|(m, _)| m.eq_ignore_ascii_case(method))
            .map(|(_, op)| op)
    }

    /// Methods declared for this template.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|(m, _)| m.as_str())
    }
}

/// Result of matching a request against the table.
#[derive(Debug)]
pub struct MatchResult<'a> {
    /// The matched template
    pub matcher: &'a MockMatcher,
    /// The matched operation
    pub operation: &'a Operation,
    /// Path parameters extracted from template matching
    pub path_params: HashMap<String, String>,
}

/// Ordered matcher table for one contract.
#[derive(Debug, Default)]
pub struct MatcherTable {
    matchers: Vec<MockMatcher>,
}

impl MatcherTable {
    /// Compile every path template of `contract`, keeping declaration order.
    pub fn compile(contract: &Contract) -> Result<Self, MockError> {
        let matchers = contract
            .path_items()?
            .into_iter()
            .map(|item| MockMatcher::compile(item.template, item.operations))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { matchers })
    }

    /// Find the first matcher whose path and method both fit.
    pub fn find_match(&self, method: &str, path: &str) -> Option<MatchResult<'_>> {
        self.matchers.iter().find_map(|matcher| {
            let operation = matcher.operation(method)?;
            let path_params = matcher.match_path(path)?;
            Some(MatchResult {
                matcher,
                operation,
                path_params,
            })
        })
    }

    pub fn matchers(&self) -> &[MockMatcher] {
        &self.matchers
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

/// Turn a path template into an anchored pattern and its parameter names.
///
/// Each `{name}` becomes one capture of a non-slash run. A `{` with no
/// closing brace is kept as literal text.
fn template_pattern(template: &str) -> (String, Vec<String>) {
    let mut pattern = String::from("^");
    let mut params = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open + 1..].find('}') else {
            break;
        };
        pattern.push_str(&regex::escape(&rest[..open]));
        pattern.push_str("([^/]+)");
        params.push(rest[open + 1..open + 1 + len].to_string());
        rest = &rest[open + len + 2..];
    }

    pattern.push_str(&regex::escape(rest));
    pattern.push('$');
    (pattern, params)
}
