//! Name sanitization for the generated TypeScript surfaces.
//!
//! Lua allows identifiers that are reserved in TypeScript (`new`, `class`,
//! `default`, ...). Every output surface renders such a name as `_<name>_`.
//! Overlay JSON documents are keyed by the raw Lua name and never see the
//! rendered form.
//!
//! | Lua name | Rendered |
//! |----------|----------|
//! | `render` | `render` |
//! | `new` | `_new_` |
//! | `default` | `_default_` |

use std::borrow::Cow;

/// Names that cannot be emitted verbatim as TypeScript identifiers.
pub const RESERVED_WORDS: &[&str] = &[
    "any", "arguments", "as", "boolean", "break", "case", "catch", "class", "const", "constructor",
    "continue", "debugger", "declare", "default", "delete", "do", "else", "enum", "eval", "export",
    "extends", "false", "finally", "for", "function", "if", "implements", "import", "in",
    "instanceof", "interface", "let", "module", "namespace", "never", "new", "null", "number",
    "object", "package", "private", "protected", "public", "return", "static", "string", "super",
    "switch", "symbol", "this", "throw", "true", "try", "type", "typeof", "undefined", "unknown",
    "var", "void", "while", "with", "yield",
];

/// Check whether a name is in the reserved set.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Render a name for the output surfaces.
pub fn sanitize_name(name: &str) -> Cow<'_, str> {
    if is_reserved(name) {
        Cow::Owned(format!("_{}_", name))
    } else {
        Cow::Borrowed(name)
    }
}

/// Check whether `name` is a valid Lua identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Module key for a relative source path: forward slashes, no extension.
///
/// `client\ISUI\ISButton.lua` → `client/ISUI/ISButton`
pub fn module_key(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    match normalized.rfind('.') {
        Some(dot) if dot > normalized.rfind('/').map_or(0, |s| s + 1) => {
            normalized[..dot].to_string()
        }
        _ => normalized,
    }
}

/// Path-derived namespace segments for a relative source path.
///
/// Each segment is made a valid identifier: invalid characters become `_`,
/// a leading digit gets a `_` prefix, and reserved words are sanitized.
pub fn path_segments(rel_path: &str) -> Vec<String> {
    module_key(rel_path)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(segment_identifier)
        .collect()
}

/// Dotted namespace path for a relative source path.
pub fn namespace_path(rel_path: &str) -> String {
    path_segments(rel_path).join(".")
}

fn segment_identifier(segment: &str) -> String {
    let mut ident: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    sanitize_name(&ident).into_owned()
}
