//! Text position utilities for byte offset and line:column conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count Unicode scalar values, not bytes

use crate::span::Span;

/// Convert a byte offset to 1-indexed line and column.
///
/// If `offset` exceeds the content length, returns the position at the end
/// of the content.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;

    for (i, ch) in content.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Byte offset of the first character of a 1-indexed line.
///
/// Returns `None` if the line does not exist.
pub fn line_start_offset(content: &str, line: u32) -> Option<usize> {
    if line <= 1 {
        return Some(0);
    }
    let mut current = 1u32;
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            current += 1;
            if current == line {
                return Some(i + 1);
            }
        }
    }
    None
}

/// Start and end lines (1-indexed, inclusive) covered by a span.
pub fn span_to_line_range(content: &str, span: &Span) -> (u32, u32) {
    let (start, _) = byte_offset_to_position(content, span.start);
    let (end, _) = byte_offset_to_position(content, span.end.saturating_sub(1).max(span.start));
    (start, end)
}

/// Format a location as `path:line:col`.
pub fn format_location(path: &str, content: &str, offset: usize) -> String {
    let (line, col) = byte_offset_to_position(content, offset);
    format!("{}:{}:{}", path, line, col)
}
