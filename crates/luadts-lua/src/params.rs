//! Parameter normalization.
//!
//! Lua happily accepts `function f(_, _, default)`; a TypeScript signature
//! does not. Every parameter list is rewritten so that ids are unique, valid
//! and stable across runs:
//!
//! - the wildcard `_`, a repeated name, or a reserved word becomes `arg{i}`
//!   (`i` is the zero-based position), suffixed with `_` until unique
//! - a trailing `...` becomes the rest parameter with id [`VARARG_ID`]
//!
//! The normalized ids are what overlay documents store and what signature
//! matching compares.

use std::collections::BTreeSet;

use luadts_core::naming::is_reserved;
use luadts_cst::FuncBody;

/// Parameter id used for a trailing vararg.
pub const VARARG_ID: &str = "...";

/// Name a vararg renders under when no overlay renames it.
pub const VARARG_NAME: &str = "args";

/// Normalize a raw parameter list.
pub fn normalize_params<S: AsRef<str>>(raw: &[S], is_vararg: bool) -> Vec<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut params = Vec::with_capacity(raw.len() + usize::from(is_vararg));

    // Names that survive as-is are claimed first so a placeholder never
    // steals a real parameter name that appears later in the list.
    let mut names: BTreeSet<&str> = BTreeSet::new();
    let mut duplicated: BTreeSet<&str> = BTreeSet::new();
    for name in raw {
        if !names.insert(name.as_ref()) {
            duplicated.insert(name.as_ref());
        }
    }
    for name in raw {
        let name = name.as_ref();
        if !needs_placeholder(name) && !duplicated.contains(name) {
            seen.insert(name.to_string());
        }
    }

    for (i, name) in raw.iter().enumerate() {
        let name = name.as_ref();
        if !needs_placeholder(name) && !duplicated.contains(name) {
            params.push(name.to_string());
            continue;
        }
        let mut candidate = format!("arg{}", i);
        while seen.contains(&candidate) {
            candidate.push('_');
        }
        seen.insert(candidate.clone());
        params.push(candidate);
    }

    if is_vararg {
        params.push(VARARG_ID.to_string());
    }
    params
}

/// Normalized parameter ids of a function body.
pub fn body_params(body: &FuncBody) -> Vec<String> {
    normalize_params(&body.params, body.is_vararg)
}

fn needs_placeholder(name: &str) -> bool {
    name == "_" || is_reserved(name)
}
