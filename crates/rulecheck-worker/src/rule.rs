//! The rule interface consumed by the rule runner.
//!
//! A rule exposes its metadata and, for each linted file, creates a visitor
//! that is called on entry and exit of every node. Problems are reported
//! through the [`RuleContext`], which validates them against the metadata.

use crate::linter::LintRequest;
use crate::message_template::interpolate;
use indexmap::IndexMap;
use rulecheck_common::Span;
use rulecheck_eval::Value;
use rulecheck_syntax::{NodeArena, NodeIndex, NodeKind, ParsedModule, ScopeTree};
use serde_json::Value as Json;
use std::cell::RefCell;
use thiserror::Error;

// =============================================================================
// Metadata
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixable {
    Code,
    Whitespace,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMeta {
    /// `messageId` → message template.
    pub messages: IndexMap<String, String>,
    pub fixable: Option<Fixable>,
    pub has_suggestions: bool,
    pub docs_description: Option<String>,
}

impl RuleMeta {
    pub fn new() -> RuleMeta {
        RuleMeta::default()
    }

    pub fn with_message(mut self, id: impl Into<String>, template: impl Into<String>) -> RuleMeta {
        self.messages.insert(id.into(), template.into());
        self
    }

    pub fn fixable(mut self, fixable: Fixable) -> RuleMeta {
        self.fixable = Some(fixable);
        self
    }

    pub fn with_suggestions(mut self) -> RuleMeta {
        self.has_suggestions = true;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> RuleMeta {
        self.docs_description = Some(description.into());
        self
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleError {
    #[error(
        "context.report() called with a messageId of '{0}' which is not present in the 'messages' config"
    )]
    UnknownMessageId(String),
    #[error("Fixable rules must set the `meta.fixable` property to \"code\" or \"whitespace\".")]
    FixWithoutFixable,
    #[error("Rules with suggestions must set the `meta.hasSuggestions` property to `true`.")]
    SuggestionsWithoutMeta,
    #[error("Fix objects must not be overlapped in a report.")]
    OverlappingFixes,
    #[error("Cannot find rule '{0}'")]
    RuleNotFound(String),
    #[error("Invalid test case config: {0}")]
    InvalidConfig(String),
    /// An error the rule raised itself.
    #[error("{message}")]
    Thrown {
        message: String,
        properties: IndexMap<String, Json>,
    },
}

impl RuleError {
    pub fn thrown(message: impl Into<String>) -> RuleError {
        RuleError::Thrown {
            message: message.into(),
            properties: IndexMap::new(),
        }
    }
}

// =============================================================================
// Fixes
// =============================================================================

/// Replace the byte range `range` of the input with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    pub range: Span,
    pub text: String,
}

// Fixer helpers
impl Fix {
    pub fn replace(range: Span, text: impl Into<String>) -> Fix {
        Fix {
            range,
            text: text.into(),
        }
    }

    pub fn insert_before(range: Span, text: impl Into<String>) -> Fix {
        Fix::replace(Span::empty_at(range.pos), text)
    }

    pub fn insert_after(range: Span, text: impl Into<String>) -> Fix {
        Fix::replace(Span::empty_at(range.end), text)
    }

    pub fn remove(range: Span) -> Fix {
        Fix::replace(range, "")
    }

    /// Combine several fixes of one report into a single fix spanning all of
    /// them. The text between fixes is taken from `source`.
    pub fn merge(mut fixes: Vec<Fix>, source: &str) -> Result<Fix, RuleError> {
        fixes.sort_by_key(|fix| (fix.range.pos, fix.range.end));
        let (Some(first), Some(last)) = (fixes.first(), fixes.last()) else {
            return Ok(Fix::replace(Span::empty_at(0), ""));
        };
        let start = first.range.pos;
        let end = fixes.iter().map(|fix| fix.range.end).max().unwrap_or(last.range.end);
        let mut text = String::new();
        let mut cursor = start;
        for fix in &fixes {
            if fix.range.pos < cursor {
                return Err(RuleError::OverlappingFixes);
            }
            text.push_str(source.get(cursor as usize..fix.range.pos as usize).unwrap_or(""));
            text.push_str(&fix.text);
            cursor = fix.range.end;
        }
        text.push_str(source.get(cursor as usize..end as usize).unwrap_or(""));
        Ok(Fix::replace(Span::new(start, end), text))
    }
}

// =============================================================================
// Reports
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportMessage {
    /// Key into `RuleMeta::messages`.
    Id(String),
    /// Literal message template.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionReport {
    pub message: ReportMessage,
    /// Falls back to the enclosing report's data when empty.
    pub data: IndexMap<String, String>,
    pub fix: Fix,
}

impl SuggestionReport {
    pub fn new(message: ReportMessage, fix: Fix) -> SuggestionReport {
        SuggestionReport {
            message,
            data: IndexMap::new(),
            fix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub range: Span,
    pub message: ReportMessage,
    pub data: IndexMap<String, String>,
    pub fix: Option<Fix>,
    pub suggest: Vec<SuggestionReport>,
}

impl Report {
    pub fn message_id(range: Span, id: impl Into<String>) -> Report {
        Report::new(range, ReportMessage::Id(id.into()))
    }

    pub fn message(range: Span, text: impl Into<String>) -> Report {
        Report::new(range, ReportMessage::Text(text.into()))
    }

    fn new(range: Span, message: ReportMessage) -> Report {
        Report {
            range,
            message,
            data: IndexMap::new(),
            fix: None,
            suggest: Vec::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Report {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_fix(mut self, fix: Fix) -> Report {
        self.fix = Some(fix);
        self
    }

    pub fn with_suggestion(mut self, suggestion: SuggestionReport) -> Report {
        self.suggest.push(suggestion);
        self
    }
}

/// A validated report with its message resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub range: Span,
    pub message: String,
    pub message_id: Option<String>,
    pub fix: Option<Fix>,
    pub suggestions: Vec<ResolvedSuggestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSuggestion {
    pub desc: String,
    pub message_id: Option<String>,
    pub fix: Fix,
}

// =============================================================================
// Context and visitors
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    pub index: NodeIndex,
    pub kind: &'a NodeKind,
    pub span: Span,
}

impl<'a> NodeRef<'a> {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// What a rule sees of the file being linted.
pub struct RuleContext<'a> {
    /// `<namespace>/<rule name>`
    pub id: &'a str,
    pub filename: &'a str,
    pub source: &'a str,
    pub arena: &'a NodeArena,
    pub scopes: &'a ScopeTree,
    pub options: &'a [Value],
    pub settings: &'a Value,
    /// `{ ecmaVersion, sourceType, ... }` of the test case.
    pub language_options: &'a Value,
    meta: &'a RuleMeta,
    problems: RefCell<Vec<Problem>>,
}

impl<'a> RuleContext<'a> {
    pub fn new(request: &LintRequest<'a>, module: &'a ParsedModule, meta: &'a RuleMeta) -> RuleContext<'a> {
        RuleContext {
            id: request.rule_id,
            filename: request.filename,
            source: request.source,
            arena: &module.arena,
            scopes: &module.scopes,
            options: request.options,
            settings: request.settings,
            language_options: request.language_options,
            meta,
            problems: RefCell::new(Vec::new()),
        }
    }

    pub fn node(&self, index: NodeIndex) -> Option<NodeRef<'a>> {
        let node = self.arena.get(index)?;
        Some(NodeRef {
            index,
            kind: &node.kind,
            span: node.span,
        })
    }

    /// Source text covered by `range`.
    pub fn text(&self, range: Span) -> &'a str {
        self.source
            .get(range.pos as usize..range.end as usize)
            .unwrap_or("")
    }

    pub fn report(&self, report: Report) -> Result<(), RuleError> {
        let (message, message_id) = self.resolve_message(&report.message, &report.data)?;
        if report.fix.is_some() && self.meta.fixable.is_none() {
            return Err(RuleError::FixWithoutFixable);
        }
        if !report.suggest.is_empty() && !self.meta.has_suggestions {
            return Err(RuleError::SuggestionsWithoutMeta);
        }
        let mut suggestions = Vec::with_capacity(report.suggest.len());
        for suggestion in report.suggest {
            let data = if suggestion.data.is_empty() {
                &report.data
            } else {
                &suggestion.data
            };
            let (desc, message_id) = self.resolve_message(&suggestion.message, data)?;
            suggestions.push(ResolvedSuggestion {
                desc,
                message_id,
                fix: suggestion.fix,
            });
        }
        self.problems.borrow_mut().push(Problem {
            range: report.range,
            message,
            message_id,
            fix: report.fix,
            suggestions,
        });
        Ok(())
    }

    fn resolve_message(
        &self,
        message: &ReportMessage,
        data: &IndexMap<String, String>,
    ) -> Result<(String, Option<String>), RuleError> {
        match message {
            ReportMessage::Id(id) => {
                let template = self
                    .meta
                    .messages
                    .get(id)
                    .ok_or_else(|| RuleError::UnknownMessageId(id.clone()))?;
                Ok((interpolate(template, data), Some(id.clone())))
            }
            ReportMessage::Text(text) => Ok((interpolate(text, data), None)),
        }
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems.into_inner()
    }
}

pub trait RuleVisitor {
    fn enter(&mut self, _node: NodeRef<'_>, _context: &RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }

    fn exit(&mut self, _node: NodeRef<'_>, _context: &RuleContext<'_>) -> Result<(), RuleError> {
        Ok(())
    }
}

pub trait Rule {
    fn meta(&self) -> RuleMeta;
    fn create(&self, context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError>;
}

type Handler = Box<dyn FnMut(NodeRef<'_>, &RuleContext<'_>) -> Result<(), RuleError>>;

/// A visitor built from per-kind handlers, keyed like ESTree selectors:
/// `"Identifier"` runs on entry, `"Identifier:exit"` on exit.
#[derive(Default)]
pub struct VisitorMap {
    handlers: IndexMap<String, Vec<Handler>>,
}

impl VisitorMap {
    pub fn new() -> VisitorMap {
        VisitorMap::default()
    }

    pub fn on(
        mut self,
        selector: impl Into<String>,
        handler: impl FnMut(NodeRef<'_>, &RuleContext<'_>) -> Result<(), RuleError> + 'static,
    ) -> VisitorMap {
        self.handlers
            .entry(selector.into())
            .or_default()
            .push(Box::new(handler));
        self
    }

    fn dispatch(
        &mut self,
        selector: &str,
        node: NodeRef<'_>,
        context: &RuleContext<'_>,
    ) -> Result<(), RuleError> {
        if let Some(handlers) = self.handlers.get_mut(selector) {
            for handler in handlers {
                handler(node, context)?;
            }
        }
        Ok(())
    }
}

impl RuleVisitor for VisitorMap {
    fn enter(&mut self, node: NodeRef<'_>, context: &RuleContext<'_>) -> Result<(), RuleError> {
        self.dispatch(node.name(), node, context)
    }

    fn exit(&mut self, node: NodeRef<'_>, context: &RuleContext<'_>) -> Result<(), RuleError> {
        let selector = format!("{}:exit", node.name());
        self.dispatch(&selector, node, context)
    }
}
