// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use luadts_cst::visitor::{walk_chunk, VisitResult, Visitor};
use luadts_cst::{parse_chunk, prettify_error, Expr, FuncBody, Stat, StatKind};

fn all_fixtures() -> impl Iterator<Item = (PathBuf, String)> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");

    let mut entries: Vec<PathBuf> = path
        .read_dir()
        .expect("read_dir")
        .map(|entry| entry.unwrap().path())
        .collect();
    entries.sort();
    entries.into_iter().map(|path| {
        let contents = std::fs::read_to_string(&path).expect("reading file");
        (path, contents)
    })
}

#[test]
fn parse_all_fixtures() {
    let mut count = 0;
    for (path, input) in all_fixtures() {
        if let Err(e) = parse_chunk(&input) {
            let fixed = luadts_cst::apply_dialect_fixes(&input);
            panic!("{}", prettify_error(&e, &fixed, &path.display().to_string()));
        }
        count += 1;
    }
    assert!(count >= 3);
}

/// Counts statements and function bodies; stops at the first `return`
/// when asked to.
#[derive(Default)]
struct Census {
    stats: usize,
    bodies: usize,
    calls: usize,
    stop_at_return: bool,
    skip_bodies: bool,
}

impl Visitor for Census {
    fn visit_stat(&mut self, node: &Stat) -> VisitResult {
        self.stats += 1;
        if self.stop_at_return && matches!(node.kind, StatKind::Return(_)) {
            return VisitResult::Stop;
        }
        VisitResult::Continue
    }

    fn visit_expr(&mut self, node: &Expr) -> VisitResult {
        if matches!(node, Expr::Call(_)) {
            self.calls += 1;
        }
        VisitResult::Continue
    }

    fn visit_func_body(&mut self, _node: &FuncBody) -> VisitResult {
        self.bodies += 1;
        if self.skip_bodies {
            VisitResult::SkipChildren
        } else {
            VisitResult::Continue
        }
    }
}

const SAMPLE: &str = r#"
Foo = ISBaseObject:derive("Foo")
function Foo:bar(a, b)
    self.x = a
    print(a)
end
local f = function() return helper() end
return Foo
"#;

#[test]
fn visitor_sees_nested_statements() {
    let chunk = parse_chunk(SAMPLE).unwrap();
    let mut census = Census::default();
    assert_eq!(walk_chunk(&mut census, &chunk), VisitResult::Continue);
    // 4 top-level + 2 in bar + 1 in the anonymous function
    assert_eq!(census.stats, 7);
    assert_eq!(census.bodies, 2);
    // derive and helper; `print(a)` is a call statement, not an expression
    assert_eq!(census.calls, 2);
}

#[test]
fn visitor_skip_children_prunes_bodies() {
    let chunk = parse_chunk(SAMPLE).unwrap();
    let mut census = Census {
        skip_bodies: true,
        ..Default::default()
    };
    walk_chunk(&mut census, &chunk);
    assert_eq!(census.stats, 4);
    assert_eq!(census.bodies, 2);
    assert_eq!(census.calls, 1);
}

#[test]
fn visitor_stop_unwinds() {
    let chunk = parse_chunk(SAMPLE).unwrap();
    let mut census = Census {
        stop_at_return: true,
        ..Default::default()
    };
    assert_eq!(walk_chunk(&mut census, &chunk), VisitResult::Stop);
    // the anonymous function's return is the first one reached
    assert_eq!(census.stats, 6);
}
