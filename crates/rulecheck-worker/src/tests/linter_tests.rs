use super::*;
use crate::rule::{Fixable, Report, ReportMessage, RuleMeta, RuleVisitor, SuggestionReport, VisitorMap};
use rulecheck_syntax::NodeKind;

/// Reports every `foo` identifier.
struct NoFoo {
    meta: RuleMeta,
    fix: Option<&'static str>,
    suggest: bool,
}

impl NoFoo {
    fn new() -> NoFoo {
        NoFoo {
            meta: RuleMeta::new()
                .with_message("unexpected", "Unexpected '{{ name }}'.")
                .with_message("rename", "Rename to '{{ to }}'.")
                .fixable(Fixable::Code)
                .with_suggestions(),
            fix: Some("bar"),
            suggest: true,
        }
    }
}

impl Rule for NoFoo {
    fn meta(&self) -> RuleMeta {
        self.meta.clone()
    }

    fn create(&self, _context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError> {
        let fix = self.fix;
        let suggest = self.suggest;
        Ok(Box::new(VisitorMap::new().on("Identifier", move |node, context| {
            let NodeKind::Identifier { name } = node.kind else {
                return Ok(());
            };
            if name != "foo" {
                return Ok(());
            }
            let mut report = Report::message_id(node.span, "unexpected").with_data("name", name.clone());
            if let Some(text) = fix {
                report = report.with_fix(Fix::replace(node.span, text));
            }
            if suggest {
                let mut suggestion = SuggestionReport::new(
                    ReportMessage::Id("rename".to_string()),
                    Fix::replace(node.span, "baz"),
                );
                suggestion.data.insert("to".to_string(), "baz".to_string());
                report = report.with_suggestion(suggestion);
            }
            context.report(report)
        })))
    }
}

fn request<'a>(source: &'a str, settings: &'a Value) -> LintRequest<'a> {
    LintRequest {
        rule_id: "test/no-foo",
        source,
        filename: "input.js",
        options: &[],
        settings,
        language_options: settings,
    }
}

#[test]
fn reports_fixes_and_suggestions() {
    let settings = Value::Undefined;
    let source = "foo();\nconst x = foo;\n";
    let result = lint(&NoFoo::new(), &request(source, &settings)).unwrap();

    assert_eq!(result.diagnostics.len(), 2);
    let first = &result.diagnostics[0];
    assert_eq!((first.line, first.column), (1, 1));
    assert_eq!((first.end_line, first.end_column), (Some(1), Some(4)));
    assert_eq!(first.rule_id.as_deref(), Some("test/no-foo"));
    assert_eq!(first.message, "Unexpected 'foo'.");
    assert_eq!(first.message_id.as_deref(), Some("unexpected"));
    assert_eq!(first.suggestions.len(), 1);
    assert_eq!(first.suggestions[0].desc, "Rename to 'baz'.");
    assert_eq!(first.suggestions[0].output, "baz();\nconst x = foo;\n");

    let second = &result.diagnostics[1];
    assert_eq!((second.line, second.column), (2, 11));

    assert_eq!(result.fixed_output(), Some("bar();\nconst x = bar;\n"));
    assert_eq!(
        result.meta.messages.get("unexpected").map(String::as_str),
        Some("Unexpected '{{ name }}'.")
    );
}

#[test]
fn output_is_absent_without_fixes_and_null_when_unchanged() {
    let settings = Value::Undefined;
    let mut rule = NoFoo::new();
    rule.fix = None;
    let result = lint(&rule, &request("foo;", &settings)).unwrap();
    assert_eq!(result.output, None);

    rule.fix = Some("foo");
    let result = lint(&rule, &request("foo;", &settings)).unwrap();
    assert_eq!(result.output, Some(None));
}

#[test]
fn parse_errors_become_a_single_fatal_diagnostic() {
    let settings = Value::Undefined;
    let result = lint(&NoFoo::new(), &request("const = ;", &settings)).unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.rule_id, None);
    assert!(diagnostic.message.starts_with("Parsing error: "));
    assert_eq!(result.output, None);
}

#[test]
fn fix_without_fixable_meta_is_a_rule_error() {
    let settings = Value::Undefined;
    let mut rule = NoFoo::new();
    rule.meta.fixable = None;
    let failure = lint(&rule, &request("\nfoo;", &settings)).unwrap_err();
    assert_eq!(failure.error, RuleError::FixWithoutFixable);
    assert_eq!(failure.rule_id, "test/no-foo");
    assert_eq!(failure.line, Some(2));
}

#[test]
fn suggestions_without_meta_flag_are_a_rule_error() {
    let settings = Value::Undefined;
    let mut rule = NoFoo::new();
    rule.meta.has_suggestions = false;
    let failure = lint(&rule, &request("foo;", &settings)).unwrap_err();
    assert_eq!(failure.error, RuleError::SuggestionsWithoutMeta);
}

#[test]
fn unknown_message_id_is_a_rule_error() {
    let settings = Value::Undefined;
    let mut rule = NoFoo::new();
    rule.meta.messages.shift_remove("unexpected");
    let failure = lint(&rule, &request("foo;", &settings)).unwrap_err();
    assert_eq!(failure.error, RuleError::UnknownMessageId("unexpected".to_string()));
}

#[test]
fn overlapping_fixes_are_skipped() {
    let message = |pos, end, text: &str| LintMessage {
        diagnostic: Diagnostic {
            line: 1,
            column: pos + 1,
            end_line: None,
            end_column: None,
            rule_id: None,
            message: String::new(),
            message_id: None,
            suggestions: Vec::new(),
        },
        fix: Some(Fix::replace(Span::new(pos, end), text)),
    };
    let messages = vec![
        message(4, 8, "B"),
        message(0, 3, "A"),
        message(2, 5, "X"),
        message(3, 3, "Y"),
    ];
    // `3..3` starts where `0..3` ended, so it is skipped as well.
    assert_eq!(apply_fixes("aaa bbbb ccc", &messages), "A B ccc");
}

#[test]
fn exit_handlers_run_after_children() {
    struct CountOnExit;
    impl Rule for CountOnExit {
        fn meta(&self) -> RuleMeta {
            RuleMeta::new()
        }
        fn create(&self, _context: &RuleContext<'_>) -> Result<Box<dyn RuleVisitor>, RuleError> {
            let seen = std::rc::Rc::new(std::cell::Cell::new(0));
            let counter = seen.clone();
            Ok(Box::new(
                VisitorMap::new()
                    .on("Identifier", move |_, _| {
                        counter.set(counter.get() + 1);
                        Ok(())
                    })
                    .on("Program:exit", move |node, context| {
                        context.report(Report::message(
                            Span::empty_at(node.span.pos),
                            format!("{} identifiers", seen.get()),
                        ))
                    }),
            ))
        }
    }
    let settings = Value::Undefined;
    let result = lint(&CountOnExit, &request("a; b(c);", &settings)).unwrap();
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "3 identifiers");
    assert_eq!(result.diagnostics[0].message_id, None);
}

#[test]
fn merged_fixes_keep_the_text_between_them() {
    let source = "let a = 1;";
    let merged = Fix::merge(
        vec![
            Fix::replace(Span::new(8, 9), "2"),
            Fix::insert_before(Span::new(4, 5), "_"),
        ],
        source,
    )
    .unwrap();
    assert_eq!(merged.range, Span::new(4, 9));
    assert_eq!(merged.text, "_a = 2");
    assert_eq!(apply_suggestion(source, &merged), "let _a = 2;");

    let overlapping = Fix::merge(
        vec![Fix::replace(Span::new(0, 5), ""), Fix::remove(Span::new(3, 6))],
        source,
    );
    assert_eq!(overlapping.unwrap_err(), RuleError::OverlappingFixes);
}
