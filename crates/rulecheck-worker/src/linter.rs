//! Single-rule linting.
//!
//! Parses the input, walks it with the rule's visitor and turns the reported
//! problems into a [`NormalizedResult`]: positioned diagnostics, suggestions
//! with their fully fixed output, and the whole-input fix.

use crate::rule::{Fix, Problem, Rule, RuleContext, RuleError};
use rulecheck_common::{Diagnostic, LineMap, NormalizedResult, RuleMetaSummary, Span, Suggestion};
use rulecheck_eval::Value;
use rulecheck_syntax::{NodeIndex, ParsedModule};
use tracing::{debug, trace};

/// Everything needed to run one rule over one input.
pub struct LintRequest<'a> {
    /// Fully qualified rule id, e.g. `test/no-foo`.
    pub rule_id: &'a str,
    pub source: &'a str,
    pub filename: &'a str,
    pub options: &'a [Value],
    pub settings: &'a Value,
    pub language_options: &'a Value,
}

/// A rule error together with where it happened.
#[derive(Debug, Clone)]
pub struct RuleFailure {
    pub error: RuleError,
    pub rule_id: String,
    pub filename: String,
    /// 1-based line of the node being visited, if any.
    pub line: Option<u32>,
}

/// A problem with its fixes, before conversion to a diagnostic.
#[derive(Debug, Clone)]
pub struct LintMessage {
    pub diagnostic: Diagnostic,
    pub fix: Option<Fix>,
}

/// Run `rule` over the input and collect its messages sorted by position.
pub fn verify(rule: &dyn Rule, request: &LintRequest<'_>) -> Result<Vec<LintMessage>, RuleFailure> {
    let line_map = LineMap::build(request.source);
    let module = match ParsedModule::parse(request.filename, request.source) {
        Ok(module) => module,
        Err(err) => {
            debug!(filename = request.filename, %err, "input failed to parse");
            let (line, column) = line_map
                .offset_to_position(err.span.pos, request.source)
                .one_based();
            return Ok(vec![LintMessage {
                diagnostic: Diagnostic {
                    line,
                    column,
                    end_line: None,
                    end_column: None,
                    rule_id: None,
                    message: format!("Parsing error: {}", err.message),
                    message_id: None,
                    suggestions: Vec::new(),
                },
                fix: None,
            }]);
        }
    };

    let meta = rule.meta();
    let context = RuleContext::new(request, &module, &meta);
    let fail = |error: RuleError, at: Option<NodeIndex>| RuleFailure {
        error,
        rule_id: request.rule_id.to_string(),
        filename: request.filename.to_string(),
        line: at.map(|node| {
            line_map
                .offset_to_position(module.arena.span(node).pos, request.source)
                .one_based()
                .0
        }),
    };

    let mut visitor = rule.create(&context).map_err(|err| fail(err, None))?;

    // Depth-first walk; the flag marks the exit visit.
    let mut stack = vec![(module.root, false)];
    while let Some((index, exiting)) = stack.pop() {
        let Some(node) = context.node(index) else {
            continue;
        };
        if exiting {
            visitor
                .exit(node, &context)
                .map_err(|err| fail(err, Some(index)))?;
            continue;
        }
        visitor
            .enter(node, &context)
            .map_err(|err| fail(err, Some(index)))?;
        stack.push((index, true));
        let children = module.arena.children(index);
        stack.extend(children.into_iter().rev().map(|child| (child, false)));
    }

    let problems = context.into_problems();
    trace!(rule = request.rule_id, problems = problems.len(), "rule finished");
    let mut messages: Vec<LintMessage> = problems
        .into_iter()
        .map(|problem| to_message(problem, request, &line_map))
        .collect();
    messages.sort_by_key(|m| (m.diagnostic.line, m.diagnostic.column));
    Ok(messages)
}

fn to_message(problem: Problem, request: &LintRequest<'_>, line_map: &LineMap) -> LintMessage {
    let (line, column) = line_map
        .offset_to_position(problem.range.pos, request.source)
        .one_based();
    let (end_line, end_column) = line_map
        .offset_to_position(problem.range.end, request.source)
        .one_based();
    let suggestions = problem
        .suggestions
        .iter()
        .map(|suggestion| Suggestion {
            desc: suggestion.desc.clone(),
            message_id: suggestion.message_id.clone(),
            output: apply_suggestion(request.source, &suggestion.fix),
        })
        .collect();
    LintMessage {
        diagnostic: Diagnostic {
            line,
            column,
            end_line: Some(end_line),
            end_column: Some(end_column),
            rule_id: Some(request.rule_id.to_string()),
            message: problem.message,
            message_id: problem.message_id,
            suggestions,
        },
        fix: problem.fix,
    }
}

/// The input with a single fix applied.
pub fn apply_suggestion(source: &str, fix: &Fix) -> String {
    let (start, end) = clamp(source, fix.range);
    format!("{}{}{}", &source[..start], fix.text, &source[end..])
}

/// Apply every message's fix in range order. A fix that starts at or before
/// the end of the previously applied one is skipped.
pub fn apply_fixes(source: &str, messages: &[LintMessage]) -> String {
    let mut fixes: Vec<&Fix> = messages.iter().filter_map(|m| m.fix.as_ref()).collect();
    fixes.sort_by_key(|fix| (fix.range.pos, fix.range.end));
    let mut output = String::with_capacity(source.len());
    let mut last: Option<usize> = None;
    for fix in fixes {
        let (start, end) = clamp(source, fix.range);
        if last.is_some_and(|last| last >= start) || start > end {
            trace!(start, end, "skipping overlapping fix");
            continue;
        }
        output.push_str(&source[last.unwrap_or(0)..start]);
        output.push_str(&fix.text);
        last = Some(end);
    }
    output.push_str(&source[last.unwrap_or(0)..]);
    output
}

/// Byte range of `span` inside `source`, snapped to char boundaries.
fn clamp(source: &str, span: Span) -> (usize, usize) {
    let snap = |offset: u32| {
        let mut offset = (offset as usize).min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    };
    (snap(span.pos), snap(span.end))
}

/// Run the rule and build the normalized result.
pub fn lint(rule: &dyn Rule, request: &LintRequest<'_>) -> Result<NormalizedResult, RuleFailure> {
    let messages = verify(rule, request)?;
    let output = messages.iter().any(|m| m.fix.is_some()).then(|| {
        let fixed = apply_fixes(request.source, &messages);
        (fixed != request.source).then_some(fixed)
    });
    Ok(NormalizedResult {
        diagnostics: messages.into_iter().map(|m| m.diagnostic).collect(),
        output,
        meta: RuleMetaSummary {
            messages: rule.meta().messages,
        },
    })
}

#[cfg(test)]
#[path = "tests/linter_tests.rs"]
mod tests;
