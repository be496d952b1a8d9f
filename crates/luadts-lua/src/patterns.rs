//! Statement pattern matchers.
//!
//! Each matcher looks at one statement and returns `Some(..)` when the
//! statement has the recognized shape. A non-match is never an error; the
//! caller just moves on to the next statement.
//!
//! | Pattern | Example |
//! |---------|---------|
//! | require | `require "ISUI/ISPanel"` |
//! | derive | `ISButton = ISPanel:derive("ISButton")` |
//! | table literal | `ISContextMenu = {}` |
//! | proxy alias | `local Panel = ISPanel` |
//! | function/method | `function ISButton:render()`, `ISButton.create = function() end` |
//! | field assignment | `ISButton.DEFAULT_HEIGHT = 20`, `MAX_ZOOM = 4` |
//!
//! [`FieldScanner`] walks function bodies for `self.<f> = ...` and
//! `<Container>.<f> = ...` assignments.

use std::collections::BTreeSet;

use luadts_cst::visitor::{walk_block, walk_chunk, VisitResult, Visitor};
use luadts_cst::{Block, CallExpr, Chunk, Expr, FuncBody, Stat, StatKind};

// ============================================================================
// Require
// ============================================================================

/// Module path of a `require` call, with `.` separators turned into `/`.
pub fn match_require_call(call: &CallExpr) -> Option<String> {
    if call.method.is_some() || call.callee.as_name() != Some("require") {
        return None;
    }
    match call.args.as_slice() {
        [Expr::Str(path)] => Some(normalize_module_path(path)),
        _ => None,
    }
}

/// Module path of a top-level `require` statement.
pub fn match_require(stat: &Stat) -> Option<String> {
    match &stat.kind {
        StatKind::Call(call) => match_require_call(call),
        StatKind::Local { exprs, .. } | StatKind::Assign { exprs, .. } => match exprs.as_slice() {
            [Expr::Call(call)] => match_require_call(call),
            _ => None,
        },
        _ => None,
    }
}

fn normalize_module_path(path: &str) -> String {
    if path.contains('/') {
        path.to_string()
    } else {
        path.replace('.', "/")
    }
}

/// Collects every `require` in a chunk, nested ones included.
#[derive(Debug, Default)]
pub struct RequireCollector {
    requires: Vec<String>,
}

impl RequireCollector {
    /// Require paths in source order, first occurrence only.
    pub fn collect(chunk: &Chunk) -> Vec<String> {
        let mut collector = RequireCollector::default();
        walk_chunk(&mut collector, chunk);
        collector.requires
    }

    fn push(&mut self, path: String) {
        if !self.requires.contains(&path) {
            self.requires.push(path);
        }
    }
}

impl Visitor for RequireCollector {
    fn visit_stat(&mut self, node: &Stat) -> VisitResult {
        if let Some(path) = match_require(node) {
            self.push(path);
        }
        VisitResult::Continue
    }

    fn visit_expr(&mut self, node: &Expr) -> VisitResult {
        if let Expr::Call(call) = node {
            if let Some(path) = match_require_call(call) {
                self.push(path);
            }
        }
        VisitResult::Continue
    }
}

// ============================================================================
// Derive and table literals
// ============================================================================

/// A `Sub = Super:derive("Sub")` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derive {
    /// The assignment target; this is the class name.
    pub class_name: String,
    pub super_name: String,
    /// The string passed to `derive`, informational only.
    pub type_name: Option<String>,
    pub is_local: bool,
}

/// The single `name = value` binding of a one-target statement.
fn single_binding(stat: &Stat) -> Option<(&str, &Expr, bool)> {
    match &stat.kind {
        StatKind::Local { names, exprs } if names.len() == 1 && exprs.len() == 1 => {
            Some((names[0].as_str(), &exprs[0], true))
        }
        StatKind::Assign { targets, exprs } if targets.len() == 1 && exprs.len() == 1 => {
            Some((targets[0].as_name()?, &exprs[0], false))
        }
        _ => None,
    }
}

pub fn match_derive(stat: &Stat) -> Option<Derive> {
    let (name, value, is_local) = single_binding(stat)?;
    let Expr::Call(call) = value else {
        return None;
    };
    if call.method.as_deref() != Some("derive") {
        return None;
    }
    let super_name = call.callee.as_name()?;
    Some(Derive {
        class_name: name.to_string(),
        super_name: super_name.to_string(),
        type_name: call.args.first().and_then(Expr::as_str).map(str::to_string),
        is_local,
    })
}

/// `Name = {}` or `local Name = {}`; returns the name and local flag.
///
/// Callers must still reject names in [`top_level_reassignments`].
pub fn match_table_literal(stat: &Stat) -> Option<(String, bool)> {
    let (name, value, is_local) = single_binding(stat)?;
    value
        .is_empty_table()
        .then(|| (name.to_string(), is_local))
}

/// Names assigned a value other than `{}` anywhere at file top level.
///
/// `local x = {}` followed by `x = getThing()` means `x` is not a table
/// container.
pub fn top_level_reassignments(chunk: &Chunk) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for stat in &chunk.block.stats {
        match &stat.kind {
            StatKind::Local { names: locals, exprs } => {
                for (i, local) in locals.iter().enumerate() {
                    if !exprs.get(i).is_some_and(Expr::is_empty_table) && !exprs.is_empty() {
                        names.insert(local.clone());
                    }
                }
            }
            StatKind::Assign { targets, exprs } => {
                for (i, target) in targets.iter().enumerate() {
                    if let Some(name) = target.as_name() {
                        if !exprs.get(i).is_some_and(Expr::is_empty_table) {
                            names.insert(name.to_string());
                        }
                    }
                }
            }
            StatKind::Function { name, .. } if name.fields.is_empty() && name.method.is_none() => {
                names.insert(name.base.clone());
            }
            StatKind::LocalFunction { name, .. } => {
                names.insert(name.clone());
            }
            _ => {}
        }
    }
    names
}

/// `local alias = Target`; returns `(alias, target)` when `is_container`
/// accepts the target name.
pub fn match_proxy(stat: &Stat, is_container: impl Fn(&str) -> bool) -> Option<(String, String)> {
    let StatKind::Local { names, exprs } = &stat.kind else {
        return None;
    };
    if names.len() != 1 || exprs.len() != 1 {
        return None;
    }
    let target = exprs[0].as_name()?;
    if names[0] == target || !is_container(target) {
        return None;
    }
    Some((names[0].clone(), target.to_string()))
}

// ============================================================================
// Functions and fields
// ============================================================================

/// Where a function declaration attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclTarget {
    /// `function A:b()` (instance) or `function A.b()` / `A.b = function`
    /// (static). `container` is the name as written, before proxy lookup.
    Member {
        container: String,
        name: String,
        is_static: bool,
    },
    /// `function f()`, `local function f()`, `f = function() end`.
    Free { name: String, is_local: bool },
}

/// Match a function declaration; returns its target and body.
pub fn match_function_decl(stat: &Stat) -> Option<(DeclTarget, &FuncBody)> {
    match &stat.kind {
        StatKind::Function { name, body } => {
            let target = match (name.fields.as_slice(), &name.method) {
                ([], None) => DeclTarget::Free {
                    name: name.base.clone(),
                    is_local: false,
                },
                ([], Some(method)) => DeclTarget::Member {
                    container: name.base.clone(),
                    name: method.clone(),
                    is_static: false,
                },
                ([field], None) => DeclTarget::Member {
                    container: name.base.clone(),
                    name: field.clone(),
                    is_static: true,
                },
                // a.b.c() and a.b:c() hang off nested tables, not containers
                _ => return None,
            };
            Some((target, body))
        }
        StatKind::LocalFunction { name, body } => Some((
            DeclTarget::Free {
                name: name.clone(),
                is_local: true,
            },
            body,
        )),
        StatKind::Local { names, exprs } if names.len() == 1 && exprs.len() == 1 => {
            let Expr::Function(body) = &exprs[0] else {
                return None;
            };
            Some((
                DeclTarget::Free {
                    name: names[0].clone(),
                    is_local: true,
                },
                body,
            ))
        }
        StatKind::Assign { targets, exprs } if targets.len() == 1 && exprs.len() == 1 => {
            let Expr::Function(body) = &exprs[0] else {
                return None;
            };
            match &targets[0] {
                Expr::Name(name) => Some((
                    DeclTarget::Free {
                        name: name.clone(),
                        is_local: false,
                    },
                    body,
                )),
                Expr::Member { obj, name } => Some((
                    DeclTarget::Member {
                        container: obj.as_name()?.to_string(),
                        name: name.clone(),
                        is_static: true,
                    },
                    body,
                )),
                _ => None,
            }
        }
        _ => None,
    }
}

/// A top-level non-function assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAssign {
    /// `A.b = value`
    Static { container: String, field: String },
    /// `X = value`
    Global { name: String },
}

/// Every non-function assignment target of a top-level statement.
pub fn match_field_assigns(stat: &Stat) -> Vec<FieldAssign> {
    let StatKind::Assign { targets, exprs } = &stat.kind else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (i, target) in targets.iter().enumerate() {
        if matches!(exprs.get(i), Some(Expr::Function(_))) {
            continue;
        }
        match target {
            Expr::Name(name) => out.push(FieldAssign::Global { name: name.clone() }),
            Expr::Member { obj, name } => {
                if let Some(container) = obj.as_name() {
                    out.push(FieldAssign::Static {
                        container: container.to_string(),
                        field: name.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    out
}

// ============================================================================
// Field reference scan
// ============================================================================

/// A field discovered inside a function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub name: String,
    pub is_static: bool,
}

/// Collects `receiver.<f> = ...` (instance) and `container.<f> = ...`
/// (static) assignments from a function body.
///
/// Nested blocks are walked; nested function bodies are not. A base name
/// declared `local`, as a loop variable, or as a parameter in an enclosing
/// scope is shadowed and ignored, except for the receiver itself.
pub struct FieldScanner<'a> {
    receiver: &'a str,
    container: &'a str,
    scopes: Vec<BTreeSet<String>>,
    pending: Vec<String>,
    seen: BTreeSet<(String, bool)>,
    fields: Vec<FieldRef>,
}

impl<'a> FieldScanner<'a> {
    /// Scan `body` with the given instance receiver and static container name.
    pub fn collect(body: &FuncBody, receiver: &'a str, container: &'a str) -> Vec<FieldRef> {
        let mut scanner = FieldScanner {
            receiver,
            container,
            scopes: Vec::new(),
            pending: body.params.clone(),
            seen: BTreeSet::new(),
            fields: Vec::new(),
        };
        walk_block(&mut scanner, &body.block);
        scanner.fields
    }

    fn is_shadowed(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn record(&mut self, target: &Expr) {
        let Expr::Member { obj, name } = target else {
            return;
        };
        let Some(base) = obj.as_name() else {
            return;
        };
        let is_static = if base == self.receiver {
            false
        } else if base == self.container && !self.is_shadowed(base) {
            true
        } else {
            return;
        };
        if self.seen.insert((name.clone(), is_static)) {
            self.fields.push(FieldRef {
                name: name.clone(),
                is_static,
            });
        }
    }
}

impl Visitor for FieldScanner<'_> {
    fn visit_block(&mut self, _node: &Block) -> VisitResult {
        let scope = std::mem::take(&mut self.pending).into_iter().collect();
        self.scopes.push(scope);
        VisitResult::Continue
    }

    fn leave_block(&mut self, _node: &Block) {
        self.scopes.pop();
    }

    fn visit_stat(&mut self, node: &Stat) -> VisitResult {
        match &node.kind {
            StatKind::Local { names, .. } => {
                for name in names {
                    self.declare(name);
                }
            }
            StatKind::LocalFunction { name, .. } => {
                self.declare(name);
                return VisitResult::SkipChildren;
            }
            StatKind::Function { .. } => return VisitResult::SkipChildren,
            StatKind::Assign { targets, .. } => {
                for target in targets {
                    self.record(target);
                }
            }
            StatKind::NumericFor { var, .. } => self.pending = vec![var.clone()],
            StatKind::GenericFor { names, .. } => self.pending = names.clone(),
            _ => {}
        }
        VisitResult::Continue
    }

    fn visit_func_body(&mut self, _node: &FuncBody) -> VisitResult {
        VisitResult::SkipChildren
    }
}

/// Receiver of a constructor: the local named by the last top-level
/// `return <name>`, or `self` when there is none.
pub fn constructor_receiver(body: &FuncBody) -> &str {
    body.block
        .stats
        .iter()
        .rev()
        .find_map(|stat| match &stat.kind {
            StatKind::Return(exprs) => exprs.first().and_then(Expr::as_name),
            _ => None,
        })
        .unwrap_or("self")
}

#[cfg(test)]
mod tests {
    use super::*;
    use luadts_cst::parse_chunk;

    fn first_stat(source: &str) -> Stat {
        parse_chunk(source).unwrap().block.stats.remove(0)
    }

    fn body_of(source: &str) -> FuncBody {
        match first_stat(source).kind {
            StatKind::Function { body, .. } => body,
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_require_forms() {
        assert_eq!(
            match_require(&first_stat("require \"ISUI/ISPanel\"")),
            Some("ISUI/ISPanel".to_string())
        );
        assert_eq!(
            match_require(&first_stat("require('TimedActions.ISBaseTimedAction')")),
            Some("TimedActions/ISBaseTimedAction".to_string())
        );
        assert_eq!(match_require(&first_stat("print('x')")), None);
        assert_eq!(match_require(&first_stat("require(path)")), None);
    }

    #[test]
    fn test_require_collector_finds_nested() {
        let chunk = parse_chunk(
            "require 'a'\nif x then require 'b' end\nlocal m = require('c')\nrequire 'a'",
        )
        .unwrap();
        assert_eq!(RequireCollector::collect(&chunk), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_derive_global_and_local() {
        let derive = match_derive(&first_stat("ISButton = ISPanel:derive(\"ISButton\")")).unwrap();
        assert_eq!(derive.class_name, "ISButton");
        assert_eq!(derive.super_name, "ISPanel");
        assert_eq!(derive.type_name.as_deref(), Some("ISButton"));
        assert!(!derive.is_local);

        let derive = match_derive(&first_stat("local Foo = Base:derive('Other')")).unwrap();
        assert_eq!(derive.class_name, "Foo");
        assert!(derive.is_local);
    }

    #[test]
    fn test_derive_rejects_other_calls() {
        assert!(match_derive(&first_stat("x = Base.derive('x')")).is_none());
        assert!(match_derive(&first_stat("x = Base:new()")).is_none());
        assert!(match_derive(&first_stat("a.b = Base:derive('x')")).is_none());
    }

    #[test]
    fn test_table_literal() {
        assert_eq!(
            match_table_literal(&first_stat("Bar = {}")),
            Some(("Bar".to_string(), false))
        );
        assert_eq!(
            match_table_literal(&first_stat("local Bar = {}")),
            Some(("Bar".to_string(), true))
        );
        assert!(match_table_literal(&first_stat("Bar = { 1 }")).is_none());
        assert!(match_table_literal(&first_stat("a, b = {}, {}")).is_none());
    }

    #[test]
    fn test_top_level_reassignments() {
        let chunk = parse_chunk("local x = {}\nx = getThing()\ny = {}\nlocal z\nfunction w() end")
            .unwrap();
        let names = top_level_reassignments(&chunk);
        assert!(names.contains("x"));
        assert!(!names.contains("y"));
        assert!(!names.contains("z"));
        assert!(names.contains("w"));
    }

    #[test]
    fn test_proxy() {
        let stat = first_stat("local Panel = ISPanel");
        assert_eq!(
            match_proxy(&stat, |n| n == "ISPanel"),
            Some(("Panel".to_string(), "ISPanel".to_string()))
        );
        assert_eq!(match_proxy(&stat, |_| false), None);
        assert_eq!(match_proxy(&first_stat("Panel = ISPanel"), |_| true), None);
    }

    #[test]
    fn test_function_decl_shapes() {
        let (target, _) = match_function_decl(&first_stat("function A:b(x) end")).unwrap();
        assert_eq!(
            target,
            DeclTarget::Member {
                container: "A".into(),
                name: "b".into(),
                is_static: false
            }
        );
        let (target, _) = match_function_decl(&first_stat("function A.b(x) end")).unwrap();
        assert!(matches!(target, DeclTarget::Member { is_static: true, .. }));
        let (target, _) = match_function_decl(&first_stat("A.b = function(x) end")).unwrap();
        assert!(matches!(target, DeclTarget::Member { is_static: true, .. }));
        let (target, _) = match_function_decl(&first_stat("local function f() end")).unwrap();
        assert_eq!(
            target,
            DeclTarget::Free {
                name: "f".into(),
                is_local: true
            }
        );
        let (target, _) = match_function_decl(&first_stat("g = function() end")).unwrap();
        assert!(matches!(target, DeclTarget::Free { is_local: false, .. }));
        assert!(match_function_decl(&first_stat("function a.b.c() end")).is_none());
    }

    #[test]
    fn test_field_assigns() {
        assert_eq!(
            match_field_assigns(&first_stat("A.b, C = 1, 2")),
            vec![
                FieldAssign::Static {
                    container: "A".into(),
                    field: "b".into()
                },
                FieldAssign::Global { name: "C".into() },
            ]
        );
        assert!(match_field_assigns(&first_stat("A.b = function() end")).is_empty());
        assert!(match_field_assigns(&first_stat("a.b.c = 1")).is_empty());
    }

    #[test]
    fn test_field_scan_instance_and_static() {
        let body = body_of(
            "function Foo:bar(a)\n  self.x = a\n  Foo.count = 1\n  if a then self.y = 2 end\n  self.x = 3\nend",
        );
        let fields = FieldScanner::collect(&body, "self", "Foo");
        assert_eq!(
            fields,
            vec![
                FieldRef { name: "x".into(), is_static: false },
                FieldRef { name: "count".into(), is_static: true },
                FieldRef { name: "y".into(), is_static: false },
            ]
        );
    }

    #[test]
    fn test_field_scan_respects_shadowing() {
        let body = body_of(
            "function Foo:bar()\n  local Foo = {}\n  Foo.hidden = 1\n  for i, self2 in ipairs(t) do self2.z = 1 end\nend",
        );
        assert!(FieldScanner::collect(&body, "self", "Foo").is_empty());
    }

    #[test]
    fn test_field_scan_shadow_ends_with_block() {
        let body = body_of(
            "function Foo.make()\n  do local Foo = 1 end\n  Foo.visible = 1\nend",
        );
        let fields = FieldScanner::collect(&body, "self", "Foo");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "visible");
    }

    #[test]
    fn test_field_scan_skips_nested_functions() {
        let body = body_of(
            "function Foo:bar()\n  local cb = function() self.inner = 1 end\n  function helper() self.other = 1 end\nend",
        );
        assert!(FieldScanner::collect(&body, "self", "Foo").is_empty());
    }

    #[test]
    fn test_constructor_receiver() {
        let body = body_of("function Foo:new()\n  local o = {}\n  o.x = 1\n  return o\nend");
        assert_eq!(constructor_receiver(&body), "o");
        let fields = FieldScanner::collect(&body, constructor_receiver(&body), "Foo");
        assert_eq!(fields, vec![FieldRef { name: "x".into(), is_static: false }]);

        let body = body_of("function Foo:new()\n  self.y = 1\nend");
        assert_eq!(constructor_receiver(&body), "self");
    }
}
