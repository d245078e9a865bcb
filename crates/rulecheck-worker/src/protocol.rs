//! Messages exchanged between a caller and an execution worker.
//!
//! A request is `{ id, args }` and a reply echoes the same `id` with either a
//! result or an error. Payloads travel over channels; the shared
//! [`SignalCell`](crate::signal::SignalCell) is only a wake-up signal.

use indexmap::IndexMap;
use rulecheck_common::NormalizedResult;
use rulecheck_eval::ResolvedExpression;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

/// Arguments of one rule run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallArgs {
    pub rule_name: String,
    pub rule_address: String,
    pub config: TestCaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub args: CallArgs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<NormalizedResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WorkerError>,
}

impl Reply {
    pub fn from_outcome(id: u64, outcome: Result<NormalizedResult, WorkerError>) -> Reply {
        match outcome {
            Ok(result) => Reply {
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => Reply {
                id,
                result: None,
                error: Some(error),
            },
        }
    }
}

/// An error raised inside a worker, reconstructed on the calling side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerError {
    pub message: String,
    /// Enumerable properties of the original error (`ruleId`, `filename`, ...).
    #[serde(flatten)]
    pub properties: IndexMap<String, Json>,
}

impl WorkerError {
    pub fn new(message: impl Into<String>) -> WorkerError {
        WorkerError {
            message: message.into(),
            properties: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Json>) -> WorkerError {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Json> {
        self.properties.get(key)
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WorkerError {}

/// Configuration of one test case, as handed over by the test-case scanner.
///
/// `fields` holds the properties whose values were already known as
/// literals. `ast` holds the statically resolved expression of every
/// property, consulted for the ones missing from `fields`.
/// `constructor_ast` is the config passed to the tester's constructor; its
/// value supplies defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCaseConfig {
    #[serde(flatten)]
    pub fields: IndexMap<String, Json>,
    #[serde(rename = "$$ast", default)]
    pub ast: IndexMap<String, ResolvedExpression>,
    #[serde(
        rename = "$$constructorAst",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub constructor_ast: Option<ResolvedExpression>,
}

impl TestCaseConfig {
    pub fn new(code: impl Into<String>) -> TestCaseConfig {
        TestCaseConfig::default().with_field("code", Json::String(code.into()))
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Json) -> TestCaseConfig {
        self.fields.insert(key.into(), value);
        self
    }

    /// A property whose value is only known after dynamic evaluation.
    pub fn with_deferred(mut self, key: impl Into<String>, expression: ResolvedExpression) -> TestCaseConfig {
        self.ast.insert(key.into(), expression);
        self
    }

    pub fn with_constructor(mut self, expression: ResolvedExpression) -> TestCaseConfig {
        self.constructor_ast = Some(expression);
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.fields.get("code").and_then(Json::as_str)
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
