// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Visitor trait definitions for tree traversal.

use crate::nodes::{Block, Chunk, Expr, FuncBody, Stat};

/// Result of visiting a node - controls traversal behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisitResult {
    /// Continue traversal into children.
    ///
    /// After visiting children, `leave_*` will be called for this node.
    #[default]
    Continue,

    /// Skip children, continue with siblings.
    ///
    /// `leave_*` is still called for this node.
    SkipChildren,

    /// Stop traversal entirely.
    Stop,
}

/// Read-only visitor over the syntax tree.
///
/// Every method has a default that continues traversal, so implementors only
/// override the nodes they care about.
pub trait Visitor {
    fn visit_chunk(&mut self, _node: &Chunk) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_chunk(&mut self, _node: &Chunk) {}

    fn visit_block(&mut self, _node: &Block) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_block(&mut self, _node: &Block) {}

    fn visit_stat(&mut self, _node: &Stat) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_stat(&mut self, _node: &Stat) {}

    fn visit_expr(&mut self, _node: &Expr) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_expr(&mut self, _node: &Expr) {}

    fn visit_func_body(&mut self, _node: &FuncBody) -> VisitResult {
        VisitResult::Continue
    }
    fn leave_func_body(&mut self, _node: &FuncBody) {}
}
