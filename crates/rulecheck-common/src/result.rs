//! The normalized result of running a rule under test.
//!
//! Produced inside an execution worker and handed back to the synchronous
//! caller. Field names follow the camelCase shape test-case assertions use.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Diagnostics reported by the rule plus the optional whole-input fix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub diagnostics: Vec<Diagnostic>,
    /// `None`: no diagnostic carried a fix. `Some(None)`: fixes were offered
    /// but left the input unchanged. `Some(Some(text))`: the fully fixed input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Option<String>>,
    #[serde(default)]
    pub meta: RuleMetaSummary,
}

impl NormalizedResult {
    /// The fixed output text, if the rule produced a change.
    pub fn fixed_output(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// 1-based line
    pub line: u32,
    /// 1-based column (UTF-16 code units)
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
    /// `None` for fatal parse errors that no rule produced.
    pub rule_id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

/// A suggestion; `output` is always the fully fixed text, never a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub output: String,
}

/// The part of the rule's metadata that assertion checks need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMetaSummary {
    #[serde(default)]
    pub messages: IndexMap<String, String>,
}
