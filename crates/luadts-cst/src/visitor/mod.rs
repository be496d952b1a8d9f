// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Visitor infrastructure for syntax tree traversal.
//!
//! # Traversal Order
//!
//! - **Depth-first, pre-order** for `visit_*` methods
//! - **Post-order** for `leave_*` methods
//! - Children are visited in source order (left-to-right, top-to-bottom)
//!
//! # Example
//!
//! ```
//! use luadts_cst::visitor::{walk_chunk, VisitResult, Visitor};
//! use luadts_cst::{parse_chunk, Stat, StatKind};
//!
//! struct ReturnCounter {
//!     count: usize,
//! }
//!
//! impl Visitor for ReturnCounter {
//!     fn visit_stat(&mut self, node: &Stat) -> VisitResult {
//!         if matches!(node.kind, StatKind::Return(_)) {
//!             self.count += 1;
//!         }
//!         VisitResult::Continue
//!     }
//! }
//!
//! let chunk = parse_chunk("if a then return 1 end return 2").unwrap();
//! let mut counter = ReturnCounter { count: 0 };
//! walk_chunk(&mut counter, &chunk);
//! assert_eq!(counter.count, 2);
//! ```

mod dispatch;
mod traits;

pub use dispatch::*;
pub use traits::{VisitResult, Visitor};
