// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use luadts_core::span::Span;
use thiserror::Error;

/// Error produced while splitting source text into tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TokError {
    pub message: String,
    pub span: Span,
}

impl TokError {
    pub(crate) fn new(message: impl Into<String>, span: Span) -> Self {
        TokError {
            message: message.into(),
            span,
        }
    }
}

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("tokenizer error: {0}")]
    TokenizerError(#[from] TokError),
    #[error("parser error: expected {expected}, found {found}")]
    ParserError {
        expected: String,
        found: String,
        span: Span,
    },
}

impl ParserError {
    /// Byte span the error points at.
    pub fn span(&self) -> Span {
        match self {
            ParserError::TokenizerError(e) => e.span,
            ParserError::ParserError { span, .. } => *span,
        }
    }
}
