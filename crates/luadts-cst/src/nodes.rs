// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Syntax tree node definitions.
//!
//! The tree is a plain owned structure: statements carry their byte span,
//! expressions do not. Comments and whitespace are discarded.

use luadts_core::span::Span;

/// A parsed source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    pub block: Block,
}

/// A sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stats: Vec<Stat>,
}

/// A statement together with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub kind: StatKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatKind {
    /// `local a, b = x, y`
    Local { names: Vec<String>, exprs: Vec<Expr> },
    /// `local function f() end`
    LocalFunction { name: String, body: FuncBody },
    /// `a, b.c = x, y`
    Assign { targets: Vec<Expr>, exprs: Vec<Expr> },
    /// A function call used as a statement.
    Call(CallExpr),
    /// `function a.b.c:d() end`
    Function { name: FuncName, body: FuncBody },
    /// `if c then .. elseif c then .. else .. end`
    If {
        clauses: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },
    While { cond: Expr, block: Block },
    Repeat { block: Block, cond: Expr },
    NumericFor {
        var: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        block: Block,
    },
    GenericFor {
        names: Vec<String>,
        exprs: Vec<Expr>,
        block: Block,
    },
    Do(Block),
    Return(Vec<Expr>),
    Break,
}

/// The dotted/colon name of a `function` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncName {
    /// First identifier (`a` in `a.b.c:d`).
    pub base: String,
    /// Dot-separated fields after the base (`b`, `c`).
    pub fields: Vec<String>,
    /// Method name after `:` (`d`).
    pub method: Option<String>,
}

impl FuncName {
    /// Render the name as written in source.
    pub fn dotted(&self) -> String {
        let mut out = self.base.clone();
        for field in &self.fields {
            out.push('.');
            out.push_str(field);
        }
        if let Some(method) = &self.method {
            out.push(':');
            out.push_str(method);
        }
        out
    }
}

/// Parameters and body of a function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncBody {
    pub params: Vec<String>,
    pub is_vararg: bool,
    pub block: Block,
}

/// A function call, optionally through a `:` method.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub method: Option<String>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Nil,
    True,
    False,
    /// Numeric literal, kept as written.
    Number(String),
    /// String literal with escapes resolved.
    Str(String),
    Vararg,
    Function(FuncBody),
    Table(Vec<TableField>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary { op: UnOp, expr: Box<Expr> },
    Name(String),
    /// `obj[key]`
    Index { obj: Box<Expr>, key: Box<Expr> },
    /// `obj.name`
    Member { obj: Box<Expr>, name: String },
    Call(CallExpr),
    Paren(Box<Expr>),
}

impl Expr {
    /// The identifier if this is a bare name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Expr::Name(name) => Some(name),
            _ => None,
        }
    }

    /// The string value if this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str(value) => Some(value),
            _ => None,
        }
    }

    /// True for an empty table constructor `{}`.
    pub fn is_empty_table(&self) -> bool {
        matches!(self, Expr::Table(fields) if fields.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableField {
    /// `{ value }`
    Positional(Expr),
    /// `{ name = value }`
    Named(String, Expr),
    /// `{ [key] = value }`
    Keyed(Expr, Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
    Len,
}
