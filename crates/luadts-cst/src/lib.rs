// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A Lua 5.1 parser and syntax tree library.
//!
//! The accepted language is the Kahlua dialect used by game scripts: plain
//! Lua 5.1 plus a couple of Java-isms that [`apply_dialect_fixes`] rewrites
//! before tokenizing.
//!
//! # Quick Start
//!
//! ```
//! use luadts_cst::{parse_chunk, StatKind};
//!
//! let chunk = parse_chunk("ISButton = ISPanel:derive(\"ISButton\")").unwrap();
//! assert!(matches!(chunk.block.stats[0].kind, StatKind::Assign { .. }));
//! ```

use std::borrow::Cow;
use std::cmp::min;
use std::sync::LazyLock;

use regex::Regex;

// ============================================================================
// Public modules and re-exports
// ============================================================================

mod errors;
pub use errors::{ParserError, TokError};

pub mod nodes;
pub use nodes::{
    BinOp, Block, CallExpr, Chunk, Expr, FuncBody, FuncName, Stat, StatKind, TableField, UnOp,
};

pub mod parser;
pub mod tokenizer;
pub mod visitor;

pub use luadts_core::span::Span;

// ============================================================================
// Dialect fixes
// ============================================================================

/// Numeric literal with a Java-style type suffix, followed by a delimiter.
static NUMERIC_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+(?:\.\d+)?)[fFdDlL]([\s,;)\]}])").expect("valid numeric suffix regex")
});

/// `break;` is legal in Kahlua but not in Lua 5.1.
static BREAK_SEMICOLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbreak\s*;").expect("valid break regex"));

/// Rewrite dialect constructs the parser does not accept.
///
/// - `1.5f,` becomes `1.5,` (suffix stripped only before a delimiter)
/// - `break;` becomes `break`
///
/// Returns the input unchanged (borrowed) when nothing matches.
pub fn apply_dialect_fixes(source: &str) -> Cow<'_, str> {
    let stripped = NUMERIC_SUFFIX.replace_all(source, "${1}${2}");
    let fixed = match BREAK_SEMICOLON.replace_all(&stripped, "break") {
        Cow::Borrowed(_) => None,
        Cow::Owned(fixed) => Some(fixed),
    };
    match fixed {
        Some(fixed) => Cow::Owned(fixed),
        None => stripped,
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse Lua source text into a [`Chunk`].
///
/// Dialect fixes are applied first. Spans in the returned tree and in any
/// error refer to the fixed text, which is what [`prettify_error`] expects.
pub fn parse_chunk(source: &str) -> Result<Chunk, ParserError> {
    let fixed = apply_dialect_fixes(source);
    let tokens = tokenizer::tokenize(&fixed)?;
    parser::parse_tokens(tokens)
}

// ============================================================================
// Error rendering
// ============================================================================

/// Byte offset of the start of 1-based line `n`, or the end of the text.
fn bol_offset(source: &str, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    memchr::memchr_iter(b'\n', source.as_bytes())
        .nth(n - 2)
        .map(|index| index + 1)
        .unwrap_or(source.len())
}

/// Largest char boundary of `text` at or before `index`.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = min(index, text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest char boundary of `text` at or after `index`.
fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut index = min(index, text.len());
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Formats a parser error into a human-readable string with source context.
///
/// `source` must be the text the error was produced from (after
/// [`apply_dialect_fixes`]); `label` is usually the file path. Offsets that
/// fall inside a multi-byte character are widened to cover it.
pub fn prettify_error(err: &ParserError, source: &str, label: &str) -> String {
    use annotate_snippets::{Level, Renderer, Snippet};

    let span = err.span();
    let offset = floor_char_boundary(source, span.start);
    let (line, _) = luadts_core::text::byte_offset_to_position(source, offset);
    let line = line as usize;
    let context = 1;
    let line_start = line.saturating_sub(context).max(1);
    let start_offset = bol_offset(source, line_start);
    let end_offset = bol_offset(source, line + context + 1);
    let snippet = &source[start_offset..end_offset];
    let start = offset - start_offset;
    let end = ceil_char_boundary(
        snippet,
        min(span.end, end_offset).saturating_sub(start_offset),
    );
    let end = if end <= start {
        ceil_char_boundary(snippet, start + 1)
    } else {
        end
    };
    let message = err.to_string();
    let rendered = Renderer::plain()
        .render(
            Level::Error.title(label).snippet(
                Snippet::source(snippet)
                    .line_start(line_start)
                    .fold(false)
                    .annotation(Level::Error.span(start..end).label(&message)),
            ),
        )
        .to_string();
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_strips_numeric_suffix() {
        assert_eq!(apply_dialect_fixes("x = 1.5f;"), "x = 1.5;");
        assert_eq!(apply_dialect_fixes("f(10d, 2L)"), "f(10, 2)");
        assert_eq!(apply_dialect_fixes("t = {0.5F}"), "t = {0.5}");
    }

    #[test]
    fn test_dialect_leaves_identifiers_alone() {
        assert_eq!(apply_dialect_fixes("local x1f = 2"), "local x1f = 2");
        assert_eq!(apply_dialect_fixes("x = 0x1f"), "x = 0x1f");
        assert!(matches!(apply_dialect_fixes("return 1"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_dialect_break_semicolon() {
        assert_eq!(
            apply_dialect_fixes("while true do break; end"),
            "while true do break end"
        );
    }

    #[test]
    fn test_parse_chunk_with_dialect() {
        let chunk = parse_chunk("for i = 1, 10 do\n  x = i * 2.0f\n  break;\nend\n").unwrap();
        assert_eq!(chunk.block.stats.len(), 1);
    }

    #[test]
    fn test_parse_chunk_error() {
        let err = parse_chunk("function (").unwrap_err();
        assert!(matches!(err, ParserError::ParserError { .. }));
    }

    #[test]
    fn bol_offset_first_line() {
        assert_eq!(0, bol_offset("hello", 1));
        assert_eq!(0, bol_offset("hello", 0));
        assert_eq!(0, bol_offset("hello\nhello", 1));
    }

    #[test]
    fn bol_offset_second_line() {
        assert_eq!(5, bol_offset("hello", 2));
        assert_eq!(6, bol_offset("hello\nhello", 2));
        assert_eq!(6, bol_offset("hello\nhello\nhello", 2));
    }

    #[test]
    fn bol_offset_last_line() {
        assert_eq!(5, bol_offset("hello", 3));
        assert_eq!(11, bol_offset("hello\nhello", 3));
    }

    #[test]
    fn test_prettify_error_mentions_label_and_line() {
        let source = "local a = 1\nlocal b = = 2\nreturn b\n";
        let err = parse_chunk(source).unwrap_err();
        let rendered = prettify_error(&err, source, "client/Broken.lua");
        assert!(rendered.contains("client/Broken.lua"));
        assert!(rendered.contains("local b = = 2"));
    }

    #[test]
    fn test_prettify_error_on_multibyte_character() {
        let source = "x = 1 € 2\n";
        let err = parse_chunk(source).unwrap_err();
        let rendered = prettify_error(&err, source, "client/A.lua");
        assert!(rendered.contains("client/A.lua"));
        assert!(rendered.contains("x = 1 € 2"));
    }

    #[test]
    fn test_prettify_error_widens_split_span() {
        let source = "a = 'é'\nb = = 1\n";
        let err = ParserError::ParserError {
            expected: "expression".to_string(),
            found: "string".to_string(),
            span: Span::new(6, 7),
        };
        let rendered = prettify_error(&err, source, "split.lua");
        assert!(rendered.contains("a = 'é'"));
    }

    #[test]
    fn test_char_boundaries() {
        let text = "a€b";
        assert_eq!(floor_char_boundary(text, 2), 1);
        assert_eq!(ceil_char_boundary(text, 2), 4);
        assert_eq!(ceil_char_boundary(text, 99), text.len());
    }

    #[test]
    fn test_prettify_error_at_eof() {
        let source = "function f()";
        let err = parse_chunk(source).unwrap_err();
        let rendered = prettify_error(&err, source, "eof.lua");
        assert!(rendered.contains("eof.lua"));
    }
}
