//! Shared TypeScript rendering helpers.
//!
//! Containers, units and the library all render through these so that
//! documentation blocks, parameter lists and the wildcard wrapping look the
//! same on every surface.

use std::fmt::Write as _;

use luadts_core::naming::sanitize_name;

use crate::container::Signature;
use crate::overlay::{CallableModel, Documentation, FieldModel};
use crate::params::{VARARG_ID, VARARG_NAME};

/// The universal type.
pub const UNKNOWN: &str = "unknown";

/// One level of indentation in generated declarations.
pub const INDENT: &str = "  ";

/// Index signature used by containers with nothing to declare.
pub const INDEX_SIGNATURE: &str = "[id: string]: unknown;";

/// Join types with `|`, first occurrence wins; empty renders as `unknown`.
pub fn join_types(types: &[String]) -> String {
    let mut seen: Vec<&str> = Vec::with_capacity(types.len());
    for ty in types {
        let ty = ty.trim();
        if !ty.is_empty() && !seen.contains(&ty) {
            seen.push(ty);
        }
    }
    if seen.is_empty() {
        UNKNOWN.to_string()
    } else {
        seen.join(" | ")
    }
}

// ============================================================================
// Documentation
// ============================================================================

/// Collected documentation for one declaration.
#[derive(Debug, Default)]
pub struct DocBlock<'a> {
    pub description: &'a [String],
    pub authors: &'a [String],
    pub params: Vec<(String, String)>,
    pub returns: Option<&'a str>,
}

impl<'a> DocBlock<'a> {
    pub fn from_documentation(doc: &'a Documentation) -> Self {
        DocBlock {
            description: &doc.description,
            authors: &doc.authors,
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.authors.is_empty()
            && self.params.is_empty()
            && self.returns.is_none()
    }

    /// Append the `/** ... */` block, or nothing when there is no content.
    pub fn render(&self, out: &mut String, prefix: &str) {
        if self.is_empty() {
            return;
        }
        let _ = writeln!(out, "{}/**", prefix);
        for line in self.description {
            push_doc_line(out, prefix, line);
        }
        let has_tags = !self.authors.is_empty() || !self.params.is_empty() || self.returns.is_some();
        if !self.description.is_empty() && has_tags {
            let _ = writeln!(out, "{} *", prefix);
        }
        for author in self.authors {
            push_doc_line(out, prefix, &format!("@author {}", author));
        }
        for (name, text) in &self.params {
            push_doc_line(out, prefix, &format!("@param {} {}", name, text));
        }
        if let Some(returns) = self.returns {
            push_doc_line(out, prefix, &format!("@returns {}", returns));
        }
        let _ = writeln!(out, "{} */", prefix);
    }
}

fn push_doc_line(out: &mut String, prefix: &str, line: &str) {
    // `*/` inside a comment would end it early
    let line = line.replace("*/", "*\\/");
    let line = line.trim_end();
    if line.is_empty() {
        let _ = writeln!(out, "{} *", prefix);
    } else {
        let _ = writeln!(out, "{} * {}", prefix, line);
    }
}

// ============================================================================
// Fields
// ============================================================================

/// Append a field declaration: `[keyword ]name: T;`.
pub fn render_field(
    out: &mut String,
    prefix: &str,
    keyword: &str,
    name: &str,
    model: Option<&FieldModel>,
) {
    let types = match model {
        Some(model) => {
            DocBlock::from_documentation(&model.documentation).render(out, prefix);
            join_types(&model.types)
        }
        None => UNKNOWN.to_string(),
    };
    let _ = writeln!(out, "{}{}{}: {};", prefix, keyword, sanitize_name(name), types);
}

// ============================================================================
// Callables
// ============================================================================

/// A callable with its overlay applied.
#[derive(Debug)]
pub struct ResolvedCallable<'a> {
    pub params: String,
    pub returns: String,
    pub wrap: bool,
    pub doc: DocBlock<'a>,
}

/// Resolve parameter names and types, return types and docs.
///
/// `model` must already have passed the signature check; without one every
/// parameter and the return are `unknown` and the callable is wrapped.
pub fn resolve_callable<'a>(
    signature: &Signature,
    model: Option<&'a CallableModel>,
) -> ResolvedCallable<'a> {
    let mut params = Vec::with_capacity(signature.params.len());
    let mut doc = DocBlock::default();

    for (i, id) in signature.params.iter().enumerate() {
        let param = model.and_then(|m| m.parameters.get(i));
        let types = param.map_or_else(|| UNKNOWN.to_string(), |p| join_types(&p.types));
        let is_rest = id == VARARG_ID;
        let name = match param.and_then(|p| p.rename.as_deref()) {
            Some(rename) if !rename.is_empty() => sanitize_name(rename).into_owned(),
            _ if is_rest => VARARG_NAME.to_string(),
            _ => id.clone(),
        };
        if let Some(param) = param {
            if !param.documentation.description.is_empty() {
                doc.params
                    .push((name.clone(), param.documentation.description.join(" ")));
            }
        }
        if is_rest {
            let element = if types.contains('|') {
                format!("({})", types)
            } else {
                types
            };
            params.push(format!("...{}: {}[]", name, element));
        } else {
            params.push(format!("{}: {}", name, types));
        }
    }

    let (returns, wrap) = match model {
        Some(model) => {
            doc.description = &model.documentation.description;
            doc.authors = &model.documentation.authors;
            if !model.returns.description.is_empty() {
                doc.returns = Some(model.returns.description.as_str());
            }
            (
                join_types(&model.returns.types),
                model.returns.wrap_wildcard_type,
            )
        }
        None => (UNKNOWN.to_string(), true),
    };

    ResolvedCallable {
        params: params.join(", "),
        returns,
        wrap,
        doc,
    }
}

/// Append a callable declared as a member: `name: ((..) => T) | unknown;`
/// when wrapped, `name(..): T;` otherwise. `keyword` is `"static "` or
/// empty.
pub fn render_member_callable(
    out: &mut String,
    prefix: &str,
    keyword: &str,
    signature: &Signature,
    model: Option<&CallableModel>,
) {
    let resolved = resolve_callable(signature, model);
    resolved.doc.render(out, prefix);
    let name = sanitize_name(&signature.name);
    if resolved.wrap {
        let _ = writeln!(
            out,
            "{}{}{}: (({}) => {}) | {};",
            prefix, keyword, name, resolved.params, resolved.returns, UNKNOWN
        );
    } else {
        let _ = writeln!(
            out,
            "{}{}{}({}): {};",
            prefix, keyword, name, resolved.params, resolved.returns
        );
    }
}

/// Append a namespace-level function: `export const f: ((..) => T) | unknown;`
/// when wrapped, `export function f(..): T;` otherwise.
pub fn render_namespace_function(
    out: &mut String,
    prefix: &str,
    signature: &Signature,
    model: Option<&CallableModel>,
) {
    let resolved = resolve_callable(signature, model);
    resolved.doc.render(out, prefix);
    let name = sanitize_name(&signature.name);
    if resolved.wrap {
        let _ = writeln!(
            out,
            "{}export const {}: (({}) => {}) | {};",
            prefix, name, resolved.params, resolved.returns, UNKNOWN
        );
    } else {
        let _ = writeln!(
            out,
            "{}export function {}({}): {};",
            prefix, name, resolved.params, resolved.returns
        );
    }
}

/// Append a class constructor: `constructor(..);`.
pub fn render_constructor(
    out: &mut String,
    prefix: &str,
    signature: &Signature,
    model: Option<&CallableModel>,
) {
    let resolved = resolve_callable(signature, model);
    resolved.doc.render(out, prefix);
    let _ = writeln!(out, "{}constructor({});", prefix, resolved.params);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::ParamModel;

    fn sig(name: &str, params: &[&str]) -> Signature {
        Signature {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_join_types_dedup_first_seen() {
        assert_eq!(join_types(&[]), "unknown");
        assert_eq!(
            join_types(&["number".into(), "string".into(), "number".into()]),
            "number | string"
        );
    }

    #[test]
    fn test_member_callable_wrapped_default() {
        let mut out = String::new();
        render_member_callable(&mut out, "", "", &sig("bar", &["a", "b"]), None);
        assert_eq!(out, "bar: ((a: unknown, b: unknown) => unknown) | unknown;\n");
    }

    #[test]
    fn test_member_callable_plain_with_overlay() {
        let mut model = CallableModel::for_params(&["a", "..."]);
        model.parameters[0].types = vec!["number".into()];
        model.parameters[0].rename = Some("amount".into());
        model.parameters[1].types = vec!["string".into(), "number".into()];
        model.returns.types = vec!["boolean".into()];
        model.returns.wrap_wildcard_type = false;
        let mut out = String::new();
        render_member_callable(&mut out, "  ", "static ", &sig("f", &["a", "..."]), Some(&model));
        assert_eq!(
            out,
            "  static f(amount: number, ...args: (string | number)[]): boolean;\n"
        );
    }

    #[test]
    fn test_doc_block_rendering() {
        let mut model = CallableModel::for_params(&["a"]);
        model.documentation.description = vec!["Does things.".into()];
        model.documentation.authors = vec!["someone".into()];
        model.parameters[0] = ParamModel {
            id: "a".into(),
            documentation: Documentation {
                description: vec!["the input".into()],
                authors: vec![],
            },
            ..Default::default()
        };
        model.returns.description = "nothing".into();
        let mut out = String::new();
        render_constructor(&mut out, "", &sig("new", &["a"]), Some(&model));
        assert_eq!(
            out,
            "/**\n * Does things.\n *\n * @author someone\n * @param a the input\n * @returns nothing\n */\nconstructor(a: unknown);\n"
        );
    }

    #[test]
    fn test_namespace_function_forms() {
        let mut out = String::new();
        render_namespace_function(&mut out, "", &sig("new", &[]), None);
        assert_eq!(out, "export const _new_: (() => unknown) | unknown;\n");

        let mut model = CallableModel::default();
        model.returns.wrap_wildcard_type = false;
        let mut out = String::new();
        render_namespace_function(&mut out, "", &sig("f", &[]), Some(&model));
        assert_eq!(out, "export function f(): unknown;\n");
    }

    #[test]
    fn test_field_rendering() {
        let mut out = String::new();
        render_field(&mut out, "", "static ", "x", None);
        let field = FieldModel {
            types: vec!["number".into()],
            ..Default::default()
        };
        render_field(&mut out, "", "", "y", Some(&field));
        assert_eq!(out, "static x: unknown;\ny: number;\n");
    }
}
