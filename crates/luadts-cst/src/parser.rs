// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! PEG grammar producing the [`Chunk`] tree from a token stream.
//!
//! The grammar follows the Lua 5.1 reference manual. Operator precedence is
//! expressed as one rule per level, loosest first:
//!
//! ```text
//! or < and < comparison < .. (right) < + - < * / % < unary < ^ (right)
//! ```

use luadts_core::span::Span;
use peg::{Parse, ParseElem, RuleResult};

use crate::errors::ParserError;
use crate::nodes::{
    BinOp, Block, CallExpr, Chunk, Expr, FuncBody, FuncName, Stat, StatKind, TableField, UnOp,
};
use crate::tokenizer::{Tok, Token};

type ParseResult<T> = Result<T, ParserError>;

/// Token stream handed to the grammar. Elements are borrowed so tokens need
/// not be `Copy`.
pub(crate) struct TokVec<'a>(&'a [Token]);

impl Parse for TokVec<'_> {
    type PositionRepr = usize;

    fn start(&self) -> usize {
        0
    }

    fn is_eof(&self, pos: usize) -> bool {
        pos >= self.0.len()
    }

    fn position_repr(&self, pos: usize) -> usize {
        pos
    }
}

impl<'input, 'a: 'input> ParseElem<'input> for TokVec<'a> {
    type Element = &'a Token;

    fn parse_elem(&'input self, pos: usize) -> RuleResult<&'a Token> {
        match self.0.get(pos) {
            Some(token) => RuleResult::Matched(pos + 1, token),
            None => RuleResult::Failed,
        }
    }
}

/// Parse a token stream (as produced by [`crate::tokenizer::tokenize`]).
pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Chunk> {
    lua::chunk(&TokVec(&tokens), &tokens).map_err(|err| {
        let token = tokens.get(err.location).or_else(|| tokens.last());
        ParserError::ParserError {
            expected: err.expected.to_string(),
            found: token.map_or_else(|| Tok::Eof.describe(), |t| t.tok.describe()),
            span: token.map_or_else(Span::default, |t| t.span),
        }
    })
}

/// Byte span covering tokens `start..end`.
fn span_of(toks: &[Token], start: usize, end: usize) -> Span {
    let first = toks.get(start).map_or(0, |t| t.span.start);
    let last = end
        .checked_sub(1)
        .and_then(|i| toks.get(i))
        .map_or(first, |t| t.span.end);
    Span::new(first, last.max(first))
}

/// Postfix operations applied to a primary expression.
enum Suffix {
    Member(String),
    Index(Expr),
    Method(String, Vec<Expr>),
    Call(Vec<Expr>),
}

fn apply_suffix(expr: Expr, suffix: Suffix) -> Expr {
    match suffix {
        Suffix::Member(name) => Expr::Member {
            obj: Box::new(expr),
            name,
        },
        Suffix::Index(key) => Expr::Index {
            obj: Box::new(expr),
            key: Box::new(key),
        },
        Suffix::Method(method, args) => Expr::Call(CallExpr {
            callee: Box::new(expr),
            method: Some(method),
            args,
        }),
        Suffix::Call(args) => Expr::Call(CallExpr {
            callee: Box::new(expr),
            method: None,
            args,
        }),
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Left-associative fold of `head (op operand)*`.
fn fold_left(head: Expr, tail: Vec<(BinOp, Expr)>) -> Expr {
    tail.into_iter().fold(head, |lhs, (op, rhs)| binary(op, lhs, rhs))
}

fn unary(op: UnOp, expr: Expr) -> Expr {
    Expr::Unary {
        op,
        expr: Box::new(expr),
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(expr, Expr::Name(_) | Expr::Index { .. } | Expr::Member { .. })
}

/// Assignment when `rest` holds more targets and values, else a call.
fn expr_statement(
    first: Expr,
    rest: Option<(Vec<Expr>, Vec<Expr>)>,
) -> Result<StatKind, &'static str> {
    match rest {
        Some((more, exprs)) => {
            let mut targets = vec![first];
            targets.extend(more);
            if targets.iter().all(is_assignable) {
                Ok(StatKind::Assign { targets, exprs })
            } else {
                Err("assignable expression")
            }
        }
        None => match first {
            Expr::Call(call) => Ok(StatKind::Call(call)),
            _ => Err("'=' or call"),
        },
    }
}

peg::parser! {
    grammar lua<'a>(toks: &'a [Token]) for TokVec<'a> {

        // --------------------------------------------------------------------
        // Terminals
        // --------------------------------------------------------------------

        rule kw(k: &'static str)
            = [t] {? if matches!(t.tok, Tok::Kw(w) if w == k) { Ok(()) } else { Err(k) } }

        rule sym(s: &'static str)
            = [t] {? if matches!(t.tok, Tok::Sym(w) if w == s) { Ok(()) } else { Err(s) } }

        rule name() -> String
            = [t] {? match &t.tok { Tok::Name(n) => Ok(n.clone()), _ => Err("name") } }

        rule string() -> String
            = [t] {? match &t.tok { Tok::Str(s) => Ok(s.clone()), _ => Err("string") } }

        rule number() -> String
            = [t] {? match &t.tok { Tok::Number(n) => Ok(n.clone()), _ => Err("number") } }

        rule eof()
            = [t] {? if t.tok == Tok::Eof { Ok(()) } else { Err("end of input") } }

        // --------------------------------------------------------------------
        // Blocks and statements
        // --------------------------------------------------------------------

        pub rule chunk() -> Chunk
            = block:block() eof() { Chunk { block } }

        rule block() -> Block
            = sym(";")* stats:(s:stat() sym(";")* { s })* last:(r:return_stat() sym(";")* { r })? {
                let mut stats = stats;
                stats.extend(last);
                Block { stats }
            }

        rule return_stat() -> Stat
            = start:position!() kw("return") exprs:expr_list()? end:position!() {
                Stat {
                    kind: StatKind::Return(exprs.unwrap_or_default()),
                    span: span_of(toks, start, end),
                }
            }

        rule stat() -> Stat
            = start:position!() kind:stat_kind() end:position!() {
                Stat { kind, span: span_of(toks, start, end) }
            }

        rule stat_kind() -> StatKind
            = kw("if") cond:expr() kw("then") then:block()
              elifs:(kw("elseif") c:expr() kw("then") b:block() { (c, b) })*
              else_block:(kw("else") b:block() { b })? kw("end") {
                let mut clauses = vec![(cond, then)];
                clauses.extend(elifs);
                StatKind::If { clauses, else_block }
            }
            / kw("while") cond:expr() kw("do") block:block() kw("end") {
                StatKind::While { cond, block }
            }
            / kw("do") block:block() kw("end") { StatKind::Do(block) }
            / kw("for") var:name() sym("=") start:expr() sym(",") end:expr()
              step:(sym(",") e:expr() { e })? kw("do") block:block() kw("end") {
                StatKind::NumericFor { var, start, end, step, block }
            }
            / kw("for") names:(name() ++ sym(",")) kw("in") exprs:expr_list()
              kw("do") block:block() kw("end") {
                StatKind::GenericFor { names, exprs, block }
            }
            / kw("repeat") block:block() kw("until") cond:expr() {
                StatKind::Repeat { block, cond }
            }
            / kw("function") name:func_name() body:func_body() {
                StatKind::Function { name, body }
            }
            / kw("local") kw("function") name:name() body:func_body() {
                StatKind::LocalFunction { name, body }
            }
            / kw("local") names:(name() ++ sym(",")) exprs:(sym("=") e:expr_list() { e })? {
                StatKind::Local { names, exprs: exprs.unwrap_or_default() }
            }
            / kw("break") { StatKind::Break }
            / first:suffixed_expr()
              rest:(more:(sym(",") v:suffixed_expr() { v })* sym("=") exprs:expr_list() {
                  (more, exprs)
              })? {? expr_statement(first, rest) }

        rule func_name() -> FuncName
            = base:name() fields:(sym(".") n:name() { n })* method:(sym(":") n:name() { n })? {
                FuncName { base, fields, method }
            }

        rule func_body() -> FuncBody
            = sym("(") params:params() sym(")") block:block() kw("end") {
                let (params, is_vararg) = params;
                FuncBody { params, is_vararg, block }
            }

        rule params() -> (Vec<String>, bool)
            = names:(name() ++ sym(",")) vararg:(sym(",") sym("..."))? {
                (names, vararg.is_some())
            }
            / sym("...") { (Vec::new(), true) }
            / { (Vec::new(), false) }

        // --------------------------------------------------------------------
        // Expressions
        // --------------------------------------------------------------------

        rule expr_list() -> Vec<Expr>
            = expr() ++ sym(",")

        rule expr() -> Expr
            = head:and_expr() tail:(kw("or") e:and_expr() { (BinOp::Or, e) })* {
                fold_left(head, tail)
            }

        rule and_expr() -> Expr
            = head:cmp_expr() tail:(kw("and") e:cmp_expr() { (BinOp::And, e) })* {
                fold_left(head, tail)
            }

        rule cmp_expr() -> Expr
            = head:concat_expr() tail:(op:cmp_op() e:concat_expr() { (op, e) })* {
                fold_left(head, tail)
            }

        rule cmp_op() -> BinOp
            = sym("<") { BinOp::Lt }
            / sym(">") { BinOp::Gt }
            / sym("<=") { BinOp::Le }
            / sym(">=") { BinOp::Ge }
            / sym("~=") { BinOp::Ne }
            / sym("==") { BinOp::Eq }

        rule concat_expr() -> Expr
            = lhs:add_expr() rhs:(sym("..") e:concat_expr() { e })? {
                match rhs {
                    Some(rhs) => binary(BinOp::Concat, lhs, rhs),
                    None => lhs,
                }
            }

        rule add_expr() -> Expr
            = head:mul_expr() tail:(op:add_op() e:mul_expr() { (op, e) })* {
                fold_left(head, tail)
            }

        rule add_op() -> BinOp
            = sym("+") { BinOp::Add }
            / sym("-") { BinOp::Sub }

        rule mul_expr() -> Expr
            = head:unary_expr() tail:(op:mul_op() e:unary_expr() { (op, e) })* {
                fold_left(head, tail)
            }

        rule mul_op() -> BinOp
            = sym("*") { BinOp::Mul }
            / sym("/") { BinOp::Div }
            / sym("%") { BinOp::Mod }

        rule unary_expr() -> Expr
            = kw("not") e:unary_expr() { unary(UnOp::Not, e) }
            / sym("-") e:unary_expr() { unary(UnOp::Neg, e) }
            / sym("#") e:unary_expr() { unary(UnOp::Len, e) }
            / pow_expr()

        // `-a ^ 2` is `-(a ^ 2)` and `2 ^ -3` is legal, so the exponent is a
        // unary expression.
        rule pow_expr() -> Expr
            = base:simple_expr() exp:(sym("^") e:unary_expr() { e })? {
                match exp {
                    Some(exp) => binary(BinOp::Pow, base, exp),
                    None => base,
                }
            }

        rule simple_expr() -> Expr
            = n:number() { Expr::Number(n) }
            / s:string() { Expr::Str(s) }
            / kw("nil") { Expr::Nil }
            / kw("true") { Expr::True }
            / kw("false") { Expr::False }
            / sym("...") { Expr::Vararg }
            / table()
            / kw("function") body:func_body() { Expr::Function(body) }
            / suffixed_expr()

        rule primary_expr() -> Expr
            = n:name() { Expr::Name(n) }
            / sym("(") e:expr() sym(")") { Expr::Paren(Box::new(e)) }

        rule suffixed_expr() -> Expr
            = head:primary_expr() suffixes:suffix()* {
                suffixes.into_iter().fold(head, apply_suffix)
            }

        rule suffix() -> Suffix
            = sym(".") n:name() { Suffix::Member(n) }
            / sym("[") key:expr() sym("]") { Suffix::Index(key) }
            / sym(":") n:name() args:call_args() { Suffix::Method(n, args) }
            / args:call_args() { Suffix::Call(args) }

        rule call_args() -> Vec<Expr>
            = sym("(") args:expr_list()? sym(")") { args.unwrap_or_default() }
            / t:table() { vec![t] }
            / s:string() { vec![Expr::Str(s)] }

        rule table() -> Expr
            = sym("{") fields:(table_field() ** field_sep()) field_sep()? sym("}") {
                Expr::Table(fields)
            }

        rule table_field() -> TableField
            = sym("[") key:expr() sym("]") sym("=") value:expr() { TableField::Keyed(key, value) }
            / n:name() sym("=") value:expr() { TableField::Named(n, value) }
            / value:expr() { TableField::Positional(value) }

        rule field_sep()
            = sym(",") / sym(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn parse(source: &str) -> Chunk {
        parse_tokens(tokenize(source).unwrap()).unwrap()
    }

    fn parse_err(source: &str) -> ParserError {
        parse_tokens(tokenize(source).unwrap()).unwrap_err()
    }

    fn assigned(chunk: &Chunk) -> &Expr {
        match &chunk.block.stats[0].kind {
            StatKind::Assign { exprs, .. } => &exprs[0],
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_derive_assignment() {
        let chunk = parse("ISButton = ISPanel:derive(\"ISButton\")");
        let stat = &chunk.block.stats[0];
        match &stat.kind {
            StatKind::Assign { targets, exprs } => {
                assert_eq!(targets, &vec![Expr::Name("ISButton".to_string())]);
                match &exprs[0] {
                    Expr::Call(call) => {
                        assert_eq!(call.method.as_deref(), Some("derive"));
                        assert_eq!(*call.callee, Expr::Name("ISPanel".to_string()));
                        assert_eq!(call.args, vec![Expr::Str("ISButton".to_string())]);
                    }
                    other => panic!("expected call, got {:?}", other),
                }
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_function_statement_names() {
        let chunk = parse("function a.b.c:d(x, y, ...) return x end");
        match &chunk.block.stats[0].kind {
            StatKind::Function { name, body } => {
                assert_eq!(name.dotted(), "a.b.c:d");
                assert_eq!(body.params, vec!["x", "y"]);
                assert!(body.is_vararg);
                assert_eq!(body.block.stats.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_vararg_only_and_empty_params() {
        let chunk = parse("local function f(...) end\nlocal function g() end");
        match (&chunk.block.stats[0].kind, &chunk.block.stats[1].kind) {
            (
                StatKind::LocalFunction { body: f, .. },
                StatKind::LocalFunction { body: g, .. },
            ) => {
                assert!(f.params.is_empty() && f.is_vararg);
                assert!(g.params.is_empty() && !g.is_vararg);
            }
            other => panic!("expected local functions, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let chunk = parse("x = 1 + 2 * 3 .. 'a' .. 'b'");
        match assigned(&chunk) {
            Expr::Binary { op, lhs, rhs } => {
                assert_eq!(*op, BinOp::Concat);
                assert!(matches!(**lhs, Expr::Binary { op: BinOp::Add, .. }));
                assert!(matches!(**rhs, Expr::Binary { op: BinOp::Concat, .. }));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_subtraction() {
        let chunk = parse("x = a - b - c");
        match assigned(&chunk) {
            Expr::Binary { op, lhs, rhs } => {
                assert_eq!(*op, BinOp::Sub);
                assert!(matches!(**lhs, Expr::Binary { op: BinOp::Sub, .. }));
                assert_eq!(**rhs, Expr::Name("c".to_string()));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_binds_looser_than_pow() {
        let chunk = parse("x = -a ^ 2");
        match assigned(&chunk) {
            Expr::Unary { op, expr } => {
                assert_eq!(*op, UnOp::Neg);
                assert!(matches!(**expr, Expr::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_pow_is_right_associative_with_unary_exponent() {
        let chunk = parse("x = 2 ^ -3 ^ 2");
        match assigned(&chunk) {
            Expr::Binary { op, rhs, .. } => {
                assert_eq!(*op, BinOp::Pow);
                assert!(matches!(**rhs, Expr::Unary { op: UnOp::Neg, .. }));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_and_logic() {
        let chunk = parse("x = a < b and c ~= d or not e");
        match assigned(&chunk) {
            Expr::Binary { op, lhs, rhs } => {
                assert_eq!(*op, BinOp::Or);
                assert!(matches!(**lhs, Expr::Binary { op: BinOp::And, .. }));
                assert!(matches!(**rhs, Expr::Unary { op: UnOp::Not, .. }));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_control_flow_statements() {
        let chunk = parse(
            r#"
            if a then b() elseif c then d() else e() end
            while x do break end
            repeat y() until z
            for i = 1, 10, 2 do end
            for k, v in pairs(t) do end
            do local q end
            "#,
        );
        let kinds: Vec<_> = chunk.block.stats.iter().map(|s| &s.kind).collect();
        assert!(matches!(kinds[0], StatKind::If { clauses, else_block: Some(_) } if clauses.len() == 2));
        assert!(matches!(kinds[1], StatKind::While { .. }));
        assert!(matches!(kinds[2], StatKind::Repeat { .. }));
        assert!(matches!(kinds[3], StatKind::NumericFor { step: Some(_), .. }));
        assert!(matches!(kinds[4], StatKind::GenericFor { names, .. } if names.len() == 2));
        assert!(matches!(kinds[5], StatKind::Do(_)));
    }

    #[test]
    fn test_table_constructor_fields() {
        let chunk = parse("t = { 1, name = 2; [3] = 4, }");
        match assigned(&chunk) {
            Expr::Table(fields) => {
                assert_eq!(fields.len(), 3);
                assert!(matches!(fields[0], TableField::Positional(_)));
                assert!(matches!(&fields[1], TableField::Named(n, _) if n == "name"));
                assert!(matches!(fields[2], TableField::Keyed(_, _)));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_equality_in_table_is_positional() {
        let chunk = parse("t = { a == b }");
        match assigned(&chunk) {
            Expr::Table(fields) => assert!(matches!(fields[0], TableField::Positional(_))),
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_string_and_table_call_args() {
        let chunk = parse("require 'ISUI/ISPanel'\nf{1}");
        assert!(matches!(&chunk.block.stats[0].kind, StatKind::Call(c) if c.args == vec![Expr::Str("ISUI/ISPanel".to_string())]));
        assert!(matches!(&chunk.block.stats[1].kind, StatKind::Call(c) if matches!(c.args[0], Expr::Table(_))));
    }

    #[test]
    fn test_multiple_assignment() {
        let chunk = parse("a, b.c, d[1] = 1, 2");
        match &chunk.block.stats[0].kind {
            StatKind::Assign { targets, exprs } => {
                assert_eq!(targets.len(), 3);
                assert_eq!(exprs.len(), 2);
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_call_result_is_not_assignable() {
        let err = parse_err("f() = 1");
        assert!(matches!(err, ParserError::ParserError { .. }));
    }

    #[test]
    fn test_return_must_end_block() {
        let err = parse_err("return 1 x = 2");
        match err {
            ParserError::ParserError { found, .. } => assert_eq!(found, "name 'x'"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_statement_spans() {
        let source = "local a = 1\nb = 2";
        let chunk = parse(source);
        assert_eq!(chunk.block.stats[0].span, Span::new(0, 11));
        assert_eq!(chunk.block.stats[1].span, Span::new(12, 17));
    }

    #[test]
    fn test_nested_statement_spans() {
        let source = "if a then\n  b = 1\nend";
        let chunk = parse(source);
        assert_eq!(chunk.block.stats[0].span, Span::new(0, source.len()));
        match &chunk.block.stats[0].kind {
            StatKind::If { clauses, .. } => {
                assert_eq!(clauses[0].1.stats[0].span, Span::new(12, 17));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_non_call_expression_statement_rejected() {
        let err = parse_err("x");
        match err {
            ParserError::ParserError { found, span, .. } => {
                assert_eq!(found, "end of input");
                assert_eq!(span, Span::new(1, 1));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_semicolon_separated_break() {
        let chunk = parse("while true do break; end");
        match &chunk.block.stats[0].kind {
            StatKind::While { block, .. } => assert_eq!(block.stats[0].kind, StatKind::Break),
            other => panic!("expected while, got {:?}", other),
        }
    }
}
