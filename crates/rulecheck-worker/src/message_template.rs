//! `{{ key }}` message templates.

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart<'a> {
    Quasi(&'a str),
    Interpolation {
        /// Key with surrounding whitespace trimmed.
        name: &'a str,
        /// The placeholder as written, braces included.
        raw: &'a str,
    },
}

/// Split a message template into literal text and `{{ key }}` placeholders.
///
/// A placeholder is `{{`, at least one character other than a brace, then
/// `}}`. Anything else is literal text.
pub fn parse_message_template(text: &str) -> Vec<TemplatePart<'_>> {
    let mut parts = Vec::new();
    let mut literal_start = 0;
    let mut search = 0;
    while let Some(open) = text[search..].find("{{").map(|i| search + i) {
        let body_start = open + 2;
        let body_len = text[body_start..]
            .find(|c| c == '{' || c == '}')
            .unwrap_or(text.len() - body_start);
        let body_end = body_start + body_len;
        if body_len > 0 && text[body_end..].starts_with("}}") {
            if literal_start < open {
                parts.push(TemplatePart::Quasi(&text[literal_start..open]));
            }
            let end = body_end + 2;
            parts.push(TemplatePart::Interpolation {
                name: text[body_start..body_end].trim(),
                raw: &text[open..end],
            });
            literal_start = end;
            search = end;
        } else {
            search = open + 1;
        }
    }
    if literal_start < text.len() {
        parts.push(TemplatePart::Quasi(&text[literal_start..]));
    }
    parts
}

/// Substitute placeholders from `data`. Unknown keys stay verbatim.
pub fn interpolate(text: &str, data: &IndexMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    for part in parse_message_template(text) {
        match part {
            TemplatePart::Quasi(literal) => out.push_str(literal),
            TemplatePart::Interpolation { name, raw } => match data.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(raw),
            },
        }
    }
    out
}

#[cfg(test)]
#[path = "tests/message_template_tests.rs"]
mod tests;
