// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Walk functions driving a [`Visitor`] over the tree.
//!
//! Each `walk_*` calls `visit_*`, descends into children in source order
//! unless told otherwise, then calls `leave_*`. A `Stop` result unwinds the
//! whole walk without calling any further methods.

use super::traits::{VisitResult, Visitor};
use crate::nodes::{Block, CallExpr, Chunk, Expr, FuncBody, Stat, StatKind, TableField};

/// Walk a [`Chunk`] node.
pub fn walk_chunk<V: Visitor>(visitor: &mut V, node: &Chunk) -> VisitResult {
    match visitor.visit_chunk(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            if walk_block(visitor, &node.block) == VisitResult::Stop {
                return VisitResult::Stop;
            }
        }
    }
    visitor.leave_chunk(node);
    VisitResult::Continue
}

/// Walk a [`Block`] node.
pub fn walk_block<V: Visitor>(visitor: &mut V, node: &Block) -> VisitResult {
    match visitor.visit_block(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            for stat in &node.stats {
                if walk_stat(visitor, stat) == VisitResult::Stop {
                    return VisitResult::Stop;
                }
            }
        }
    }
    visitor.leave_block(node);
    VisitResult::Continue
}

// ============================================================================
// Statement walks
// ============================================================================

/// Walk a [`Stat`] node.
pub fn walk_stat<V: Visitor>(visitor: &mut V, node: &Stat) -> VisitResult {
    match visitor.visit_stat(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            if walk_stat_children(visitor, &node.kind) == VisitResult::Stop {
                return VisitResult::Stop;
            }
        }
    }
    visitor.leave_stat(node);
    VisitResult::Continue
}

fn walk_stat_children<V: Visitor>(visitor: &mut V, kind: &StatKind) -> VisitResult {
    match kind {
        StatKind::Local { exprs, .. } => walk_exprs(visitor, exprs),
        StatKind::LocalFunction { body, .. } | StatKind::Function { body, .. } => {
            walk_func_body(visitor, body)
        }
        StatKind::Assign { targets, exprs } => {
            if walk_exprs(visitor, targets) == VisitResult::Stop {
                return VisitResult::Stop;
            }
            walk_exprs(visitor, exprs)
        }
        StatKind::Call(call) => walk_call(visitor, call),
        StatKind::If {
            clauses,
            else_block,
        } => {
            for (cond, block) in clauses {
                if walk_expr(visitor, cond) == VisitResult::Stop
                    || walk_block(visitor, block) == VisitResult::Stop
                {
                    return VisitResult::Stop;
                }
            }
            match else_block {
                Some(block) => walk_block(visitor, block),
                None => VisitResult::Continue,
            }
        }
        StatKind::While { cond, block } => {
            if walk_expr(visitor, cond) == VisitResult::Stop {
                return VisitResult::Stop;
            }
            walk_block(visitor, block)
        }
        StatKind::Repeat { block, cond } => {
            if walk_block(visitor, block) == VisitResult::Stop {
                return VisitResult::Stop;
            }
            walk_expr(visitor, cond)
        }
        StatKind::NumericFor {
            start,
            end,
            step,
            block,
            ..
        } => {
            for expr in [Some(start), Some(end), step.as_ref()].into_iter().flatten() {
                if walk_expr(visitor, expr) == VisitResult::Stop {
                    return VisitResult::Stop;
                }
            }
            walk_block(visitor, block)
        }
        StatKind::GenericFor { exprs, block, .. } => {
            if walk_exprs(visitor, exprs) == VisitResult::Stop {
                return VisitResult::Stop;
            }
            walk_block(visitor, block)
        }
        StatKind::Do(block) => walk_block(visitor, block),
        StatKind::Return(exprs) => walk_exprs(visitor, exprs),
        StatKind::Break => VisitResult::Continue,
    }
}

// ============================================================================
// Expression walks
// ============================================================================

fn walk_exprs<V: Visitor>(visitor: &mut V, exprs: &[Expr]) -> VisitResult {
    for expr in exprs {
        if walk_expr(visitor, expr) == VisitResult::Stop {
            return VisitResult::Stop;
        }
    }
    VisitResult::Continue
}

fn walk_call<V: Visitor>(visitor: &mut V, call: &CallExpr) -> VisitResult {
    if walk_expr(visitor, &call.callee) == VisitResult::Stop {
        return VisitResult::Stop;
    }
    walk_exprs(visitor, &call.args)
}

/// Walk an [`Expr`] node.
pub fn walk_expr<V: Visitor>(visitor: &mut V, node: &Expr) -> VisitResult {
    match visitor.visit_expr(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            let result = match node {
                Expr::Nil
                | Expr::True
                | Expr::False
                | Expr::Number(_)
                | Expr::Str(_)
                | Expr::Vararg
                | Expr::Name(_) => VisitResult::Continue,
                Expr::Function(body) => walk_func_body(visitor, body),
                Expr::Table(fields) => {
                    let mut result = VisitResult::Continue;
                    for field in fields {
                        result = match field {
                            TableField::Positional(value) | TableField::Named(_, value) => {
                                walk_expr(visitor, value)
                            }
                            TableField::Keyed(key, value) => {
                                if walk_expr(visitor, key) == VisitResult::Stop {
                                    VisitResult::Stop
                                } else {
                                    walk_expr(visitor, value)
                                }
                            }
                        };
                        if result == VisitResult::Stop {
                            break;
                        }
                    }
                    result
                }
                Expr::Binary { lhs, rhs, .. } => {
                    if walk_expr(visitor, lhs) == VisitResult::Stop {
                        VisitResult::Stop
                    } else {
                        walk_expr(visitor, rhs)
                    }
                }
                Expr::Unary { expr, .. } | Expr::Paren(expr) => walk_expr(visitor, expr),
                Expr::Index { obj, key } => {
                    if walk_expr(visitor, obj) == VisitResult::Stop {
                        VisitResult::Stop
                    } else {
                        walk_expr(visitor, key)
                    }
                }
                Expr::Member { obj, .. } => walk_expr(visitor, obj),
                Expr::Call(call) => walk_call(visitor, call),
            };
            if result == VisitResult::Stop {
                return VisitResult::Stop;
            }
        }
    }
    visitor.leave_expr(node);
    VisitResult::Continue
}

/// Walk a [`FuncBody`] node.
pub fn walk_func_body<V: Visitor>(visitor: &mut V, node: &FuncBody) -> VisitResult {
    match visitor.visit_func_body(node) {
        VisitResult::Stop => return VisitResult::Stop,
        VisitResult::SkipChildren => {}
        VisitResult::Continue => {
            if walk_block(visitor, &node.block) == VisitResult::Stop {
                return VisitResult::Stop;
            }
        }
    }
    visitor.leave_func_body(node);
    VisitResult::Continue
}
