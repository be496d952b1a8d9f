// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tokenizer for Lua 5.1 source text.
//!
//! Comments and whitespace are skipped. String literals are unescaped;
//! numeric literals are kept as written.

use luadts_core::span::Span;

use crate::errors::TokError;

/// Reserved words of Lua 5.1.
pub const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Punctuation, longest first so the scanner can take the first match.
const SYMBOLS: &[&str] = &[
    "...", "..", "==", "~=", "<=", ">=", "+", "-", "*", "/", "%", "^", "#", "<", ">", "=", "(",
    ")", "{", "}", "[", "]", ";", ":", ",", ".",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Name(String),
    Number(String),
    Str(String),
    Kw(&'static str),
    Sym(&'static str),
    Eof,
}

impl Tok {
    /// Short human-readable description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Tok::Name(name) => format!("name '{}'", name),
            Tok::Number(text) => format!("number {}", text),
            Tok::Str(_) => "string".to_string(),
            Tok::Kw(kw) => format!("'{}'", kw),
            Tok::Sym(sym) => format!("'{}'", sym),
            Tok::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub span: Span,
}

/// Split `source` into tokens, ending with a single [`Tok::Eof`].
///
/// A leading byte order mark is skipped; spans still count its bytes.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokError> {
    let origin = if source.starts_with('\u{FEFF}') {
        '\u{FEFF}'.len_utf8()
    } else {
        0
    };
    let mut tokenizer = Tokenizer {
        src: source.as_bytes(),
        pos: origin,
        origin,
    };
    let mut tokens = Vec::new();
    loop {
        let token = tokenizer.next_token()?;
        let done = token.tok == Tok::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Tokenizer<'a> {
    src: &'a [u8],
    pos: usize,
    /// First byte after the byte order mark.
    origin: usize,
}

impl<'a> Tokenizer<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.src[start..end]).into_owned()
    }

    fn next_token(&mut self) -> Result<Token, TokError> {
        self.skip_trivia()?;
        let start = self.pos;
        let c = match self.peek() {
            Some(c) => c,
            None => {
                return Ok(Token {
                    tok: Tok::Eof,
                    span: Span::new(start, start),
                })
            }
        };

        let tok = if c.is_ascii_alphabetic() || c == b'_' {
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
            {
                self.pos += 1;
            }
            let word = self.text(start, self.pos);
            match KEYWORDS.iter().find(|kw| **kw == word) {
                Some(kw) => Tok::Kw(*kw),
                None => Tok::Name(word),
            }
        } else if c.is_ascii_digit() || (c == b'.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
        {
            self.scan_number();
            Tok::Number(self.text(start, self.pos))
        } else if c == b'"' || c == b'\'' {
            Tok::Str(self.scan_quoted(c)?)
        } else if c == b'[' && matches!(self.peek_at(1), Some(b'[') | Some(b'=')) {
            match self.long_bracket_level() {
                Some(level) => Tok::Str(self.scan_long_bracket(level)?),
                None => {
                    self.pos += 1;
                    Tok::Sym("[")
                }
            }
        } else {
            let rest = &self.src[self.pos..];
            match SYMBOLS.iter().find(|sym| rest.starts_with(sym.as_bytes())) {
                Some(sym) => {
                    self.pos += sym.len();
                    Tok::Sym(*sym)
                }
                None => {
                    let ch = std::str::from_utf8(rest)
                        .ok()
                        .and_then(|s| s.chars().next());
                    let width = ch.map_or(1, char::len_utf8);
                    return Err(TokError::new(
                        format!(
                            "unexpected character '{}'",
                            ch.unwrap_or(char::REPLACEMENT_CHARACTER)
                        ),
                        Span::new(start, start + width),
                    ));
                }
            }
        };

        Ok(Token {
            tok,
            span: Span::new(start, self.pos),
        })
    }

    fn skip_trivia(&mut self) -> Result<(), TokError> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => self.pos += 1,
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    let start = self.pos;
                    self.pos += 2;
                    if self.peek() == Some(b'[') {
                        if let Some(level) = self.long_bracket_level() {
                            self.scan_long_bracket(level).map_err(|e| {
                                TokError::new("unfinished long comment", Span::new(start, e.span.end))
                            })?;
                            continue;
                        }
                    }
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                // Shebang line.
                Some(b'#') if self.pos == self.origin && self.peek_at(1) == Some(b'!') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_number(&mut self) {
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.pos += 2;
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_hexdigit() || c == b'.')
            {
                self.pos += 1;
            }
            return;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'.') {
            // `1..2` is a concat, not a number
            if self.peek() == Some(b'.') && self.peek_at(1) == Some(b'.') {
                return;
            }
            self.pos += 1;
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let sign = matches!(self.peek_at(1), Some(b'+') | Some(b'-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += digit_at;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
    }

    fn scan_quoted(&mut self, quote: u8) -> Result<String, TokError> {
        let start = self.pos;
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let c = match self.peek() {
                Some(c) => c,
                None => {
                    return Err(TokError::new(
                        "unfinished string",
                        Span::new(start, self.pos),
                    ))
                }
            };
            match c {
                b'\n' => {
                    return Err(TokError::new(
                        "unfinished string",
                        Span::new(start, self.pos),
                    ))
                }
                c if c == quote => {
                    self.pos += 1;
                    return Ok(String::from_utf8_lossy(&out).into_owned());
                }
                b'\\' => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| {
                        TokError::new("unfinished string", Span::new(start, self.pos))
                    })?;
                    self.pos += 1;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'a' => out.push(0x07),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0c),
                        b'v' => out.push(0x0b),
                        b'\n' => out.push(b'\n'),
                        b'x' => {
                            let digits = self.take_while_max(2, |c| c.is_ascii_hexdigit());
                            let value = u8::from_str_radix(&digits, 16).map_err(|_| {
                                TokError::new("invalid hex escape", Span::new(start, self.pos))
                            })?;
                            out.push(value);
                        }
                        d if d.is_ascii_digit() => {
                            self.pos -= 1;
                            let digits = self.take_while_max(3, |c| c.is_ascii_digit());
                            let value: u32 = digits.parse().unwrap_or(256);
                            let byte = u8::try_from(value).map_err(|_| {
                                TokError::new("decimal escape too large", Span::new(start, self.pos))
                            })?;
                            out.push(byte);
                        }
                        other => out.push(other),
                    }
                }
                other => {
                    out.push(other);
                    self.pos += 1;
                }
            }
        }
    }

    fn take_while_max(&mut self, max: usize, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.pos - start < max && self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.text(start, self.pos)
    }

    /// Level of a long bracket opening at the current position (`[==[` is 2).
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some(b'[')).then_some(level)
    }

    fn scan_long_bracket(&mut self, level: usize) -> Result<String, TokError> {
        let start = self.pos;
        self.pos += level + 2;
        // A newline directly after the opening bracket is skipped.
        if self.peek() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek() == Some(b'\n') {
            self.pos += 1;
        }
        let content_start = self.pos;
        let mut close = Vec::with_capacity(level + 2);
        close.push(b']');
        close.extend(std::iter::repeat_n(b'=', level));
        close.push(b']');
        while self.pos < self.src.len() {
            if self.src[self.pos..].starts_with(&close) {
                let content = self.text(content_start, self.pos);
                self.pos += close.len();
                return Ok(content);
            }
            self.pos += 1;
        }
        Err(TokError::new(
            "unfinished long string",
            Span::new(start, self.pos),
        ))
    }
}
