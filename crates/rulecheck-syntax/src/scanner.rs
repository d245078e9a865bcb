//! Tokenizer.
//!
//! The whole source is tokenized up front. Template literals are split into
//! chunk tokens with a brace stack so `${ ... }` substitutions can nest, and
//! `/` is classified as division or regular expression from the previous
//! significant token.

use crate::numeric::{NumericValue, parse_numeric_literal};
use crate::parser::ParseError;
use rulecheck_common::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct TemplateChunk {
    pub cooked: Option<String>,
    pub raw: String,
    /// Chunk starts at the opening backtick rather than after a `}`.
    pub head: bool,
    /// Chunk ends at the closing backtick rather than at `${`.
    pub tail: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// Identifiers and keywords alike; the parser decides.
    Identifier(String),
    PrivateName(String),
    Number(f64),
    BigInt(i128),
    String(String),
    Template(TemplateChunk),
    RegExp { pattern: String, flags: String },
    Punct(&'static str),
    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn is_punct(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(p) if p == text)
    }

    pub fn is_ident(&self, text: &str) -> bool {
        matches!(&self.kind, TokenKind::Identifier(name) if name == text)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// Longest first, so a greedy prefix match picks the right token.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "<<", ">>", "**", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

pub fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub fn is_identifier_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_ascii_alphabetic() || (!ch.is_ascii() && ch.is_alphabetic())
}

pub fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_ascii_digit() || ch == '\u{200c}' || ch == '\u{200d}'
}

fn is_whitespace(ch: char) -> bool {
    matches!(
        ch,
        ' ' | '\t' | '\u{000b}' | '\u{000c}' | '\u{00a0}' | '\u{feff}'
    ) || (!ch.is_ascii() && ch.is_whitespace() && !is_line_terminator(ch))
}

pub struct ScannerState<'a> {
    source: &'a str,
    pos: usize,
    /// One entry per open `{`; `true` when it opened a template substitution.
    brace_stack: Vec<bool>,
    tokens: Vec<Token>,
}

impl<'a> ScannerState<'a> {
    pub fn new(source: &'a str) -> Self {
        ScannerState {
            source,
            pos: 0,
            brace_stack: Vec::new(),
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire source. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        if self.source.starts_with("#!") {
            self.skip_line();
        }
        loop {
            let newline_before = self.skip_trivia()?;
            let start = self.pos;
            let Some(ch) = self.peek_char() else {
                self.push(TokenKind::Eof, start, newline_before);
                return Ok(self.tokens);
            };
            let kind = self.scan_token(ch)?;
            self.push(kind, start, newline_before);
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize, newline_before: bool) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start as u32, self.pos as u32),
            newline_before,
        });
    }

    fn error(&self, message: impl Into<String>, start: usize) -> ParseError {
        ParseError::new(message, Span::new(start as u32, self.pos.max(start) as u32))
    }

    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    #[inline]
    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_line(&mut self) {
        let rest = &self.source.as_bytes()[self.pos..];
        match memchr::memchr2(b'\n', b'\r', rest) {
            Some(offset) => self.pos += offset,
            None => self.pos = self.source.len(),
        }
    }

    /// Skip whitespace and comments; report whether a line break was crossed.
    fn skip_trivia(&mut self) -> Result<bool, ParseError> {
        let mut newline = false;
        while let Some(ch) = self.peek_char() {
            if is_line_terminator(ch) {
                newline = true;
                self.bump();
            } else if is_whitespace(ch) {
                self.bump();
            } else if self.source[self.pos..].starts_with("//") {
                self.skip_line();
            } else if self.source[self.pos..].starts_with("/*") {
                let start = self.pos;
                let Some(close) = self.source[self.pos + 2..].find("*/") else {
                    self.pos = self.source.len();
                    return Err(self.error("Unterminated comment", start));
                };
                let body = &self.source[self.pos + 2..self.pos + 2 + close];
                if body.chars().any(is_line_terminator) {
                    newline = true;
                }
                self.pos += close + 4;
            } else {
                break;
            }
        }
        Ok(newline)
    }

    fn scan_token(&mut self, ch: char) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        if is_identifier_start(ch) {
            return Ok(TokenKind::Identifier(self.scan_identifier_name()));
        }
        if ch == '\\' {
            return Err(self.error("Unicode escapes in identifiers are not supported", start));
        }
        if ch == '#' {
            self.bump();
            if !self.peek_char().is_some_and(is_identifier_start) {
                return Err(self.error("Invalid character '#'", start));
            }
            return Ok(TokenKind::PrivateName(self.scan_identifier_name()));
        }
        if ch.is_ascii_digit() || (ch == '.' && self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit())) {
            return self.scan_number();
        }
        if ch == '"' || ch == '\'' {
            return self.scan_string(ch);
        }
        if ch == '`' {
            self.bump();
            return self.scan_template(true);
        }
        if ch == '}' && self.brace_stack.last() == Some(&true) {
            self.brace_stack.pop();
            self.bump();
            return self.scan_template(false);
        }
        if ch == '/' && self.regex_allowed() {
            return self.scan_regex();
        }
        let rest = &self.source[self.pos..];
        let Some(punct) = PUNCTUATORS.iter().copied().find(|p| rest.starts_with(p)) else {
            self.bump();
            return Err(self.error(format!("Invalid character '{ch}'"), start));
        };
        // `a?.5:b` is a conditional, not an optional chain.
        let punct = if punct == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
            "?"
        } else {
            punct
        };
        self.pos += punct.len();
        match punct {
            "{" => self.brace_stack.push(false),
            "}" => {
                self.brace_stack.pop();
            }
            _ => {}
        }
        Ok(TokenKind::Punct(punct))
    }

    fn scan_identifier_name(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if !is_identifier_part(ch) {
                break;
            }
            self.bump();
        }
        self.source[start..self.pos].to_string()
    }

    fn scan_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let bytes = self.source.as_bytes();
        let is_radix = bytes[start] == b'0'
            && matches!(bytes.get(start + 1), Some(b'x' | b'X' | b'o' | b'O' | b'b' | b'B'));
        if is_radix {
            self.pos += 2;
            while self
                .peek_char()
                .is_some_and(|c| c.is_ascii_hexdigit() || c == '_')
            {
                self.bump();
            }
        } else {
            while self
                .peek_char()
                .is_some_and(|c| c.is_ascii_digit() || c == '_')
            {
                self.bump();
            }
            if self.peek_char() == Some('.') {
                self.bump();
                while self
                    .peek_char()
                    .is_some_and(|c| c.is_ascii_digit() || c == '_')
                {
                    self.bump();
                }
            }
            if matches!(self.peek_char(), Some('e' | 'E')) {
                let sign = self.peek_char_at(1);
                let digit_at = if matches!(sign, Some('+' | '-')) { 2 } else { 1 };
                if self
                    .peek_char_at(digit_at)
                    .is_some_and(|c| c.is_ascii_digit())
                {
                    for _ in 0..digit_at {
                        self.bump();
                    }
                    while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                        self.bump();
                    }
                }
            }
        }
        if self.peek_char() == Some('n') {
            self.bump();
        }
        if self.peek_char().is_some_and(is_identifier_start) {
            self.bump();
            return Err(self.error("An identifier cannot follow a numeric literal", start));
        }
        match parse_numeric_literal(&self.source[start..self.pos]) {
            Some(NumericValue::Number(n)) => Ok(TokenKind::Number(n)),
            Some(NumericValue::BigInt(n)) => Ok(TokenKind::BigInt(n)),
            None => Err(self.error("Invalid numeric literal", start)),
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated string literal", start)),
                Some(ch) if ch == quote => return Ok(TokenKind::String(value)),
                Some('\n' | '\r') => return Err(self.error("Unterminated string literal", start)),
                Some('\\') => {
                    if let Some(ch) = self.scan_escape(start)? {
                        value.push(ch);
                    }
                }
                Some(ch) => value.push(ch),
            }
        }
    }

    /// Decode the escape after a backslash. `Ok(None)` is a line continuation.
    fn scan_escape(&mut self, start: usize) -> Result<Option<char>, ParseError> {
        let Some(ch) = self.bump() else {
            return Err(self.error("Unterminated escape sequence", start));
        };
        let decoded = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{0008}',
            'f' => '\u{000c}',
            'v' => '\u{000b}',
            '0' if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) => '\0',
            'x' => {
                let code = self.scan_hex_digits(2, start)?;
                char::from_u32(code).ok_or_else(|| self.error("Invalid escape", start))?
            }
            'u' => self.scan_unicode_escape(start)?,
            '\r' => {
                if self.peek_char() == Some('\n') {
                    self.bump();
                }
                return Ok(None);
            }
            '\n' | '\u{2028}' | '\u{2029}' => return Ok(None),
            other => other,
        };
        Ok(Some(decoded))
    }

    fn scan_hex_digits(&mut self, count: usize, start: usize) -> Result<u32, ParseError> {
        let mut code = 0u32;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("Invalid hexadecimal escape sequence", start))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn scan_unicode_escape(&mut self, start: usize) -> Result<char, ParseError> {
        let code = if self.peek_char() == Some('{') {
            self.bump();
            let mut code = 0u32;
            let mut any = false;
            while let Some(digit) = self.peek_char().and_then(|c| c.to_digit(16)) {
                self.bump();
                any = true;
                code = code.saturating_mul(16).saturating_add(digit);
            }
            if !any || self.bump() != Some('}') {
                return Err(self.error("Invalid Unicode escape sequence", start));
            }
            code
        } else {
            let high = self.scan_hex_digits(4, start)?;
            // Surrogate pair written as two escapes.
            if (0xD800..0xDC00).contains(&high) && self.source[self.pos..].starts_with("\\u") {
                let save = self.pos;
                self.pos += 2;
                match self.scan_hex_digits(4, start) {
                    Ok(low) if (0xDC00..0xE000).contains(&low) => {
                        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                    }
                    _ => {
                        self.pos = save;
                        high
                    }
                }
            } else {
                high
            }
        };
        // Lone surrogates cannot live in a Rust string.
        Ok(char::from_u32(code).unwrap_or('\u{fffd}'))
    }

    /// Scan one template chunk. The opening backtick or `}` is already consumed.
    fn scan_template(&mut self, head: bool) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let mut cooked = Some(String::new());
        let mut raw = String::new();
        loop {
            let chunk_start = self.pos;
            match self.bump() {
                None => return Err(self.error("Unterminated template literal", start)),
                Some('`') => {
                    return Ok(TokenKind::Template(TemplateChunk {
                        cooked,
                        raw,
                        head,
                        tail: true,
                    }));
                }
                Some('$') if self.peek_char() == Some('{') => {
                    self.bump();
                    self.brace_stack.push(true);
                    return Ok(TokenKind::Template(TemplateChunk {
                        cooked,
                        raw,
                        head,
                        tail: false,
                    }));
                }
                Some('\\') => {
                    let escape_result = self.scan_escape(start);
                    raw.push_str(&self.source[chunk_start..self.pos].replace("\r\n", "\n"));
                    match escape_result {
                        Ok(Some(ch)) => {
                            if let Some(cooked) = cooked.as_mut() {
                                cooked.push(ch);
                            }
                        }
                        Ok(None) => {}
                        // Invalid escapes are legal in tagged templates; they
                        // only lose their cooked value.
                        Err(_) => cooked = None,
                    }
                }
                Some('\r') => {
                    if self.peek_char() == Some('\n') {
                        self.bump();
                    }
                    raw.push('\n');
                    if let Some(cooked) = cooked.as_mut() {
                        cooked.push('\n');
                    }
                }
                Some(ch) => {
                    raw.push(ch);
                    if let Some(cooked) = cooked.as_mut() {
                        cooked.push(ch);
                    }
                }
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.tokens.last() else {
            return true;
        };
        match &prev.kind {
            TokenKind::Punct(p) => !matches!(*p, ")" | "]" | "}" | "++" | "--"),
            TokenKind::Identifier(name) => REGEX_PRECEDING_KEYWORDS.contains(&name.as_str()),
            TokenKind::Template(chunk) => !chunk.tail,
            _ => false,
        }
    }

    fn scan_regex(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated regular expression literal", start)),
                Some(ch) if is_line_terminator(ch) => {
                    return Err(self.error("Unterminated regular expression literal", start));
                }
                Some('\\') => {
                    if self.bump().is_none_or(is_line_terminator) {
                        return Err(self.error("Unterminated regular expression literal", start));
                    }
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        let pattern = self.source[start + 1..self.pos - 1].to_string();
        let flags_start = self.pos;
        while self.peek_char().is_some_and(is_identifier_part) {
            self.bump();
        }
        let flags = self.source[flags_start..self.pos].to_string();
        Ok(TokenKind::RegExp { pattern, flags })
    }
}

/// Convenience wrapper around [`ScannerState::tokenize`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    ScannerState::new(source).tokenize()
}
