//! Internal errors of the optimizer.
//!
//! Every error here is a broken invariant, either in the input tree (which an
//! earlier stage should have rejected) or in the analysis itself. None of them
//! are recoverable: the pass that hits one aborts.

use sable_ast::Span;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("internal optimizer error: effect facts requested for a statement")]
    StatementInExpressionContext { span: Span },

    #[error("internal optimizer error: assignment to `{names}` has no value")]
    MissingAssignmentValue { names: String, span: Span },

    #[error("internal optimizer error: for loop with a non-empty pre block")]
    NonEmptyForLoopPre { span: Span },

    #[error("internal optimizer error: inconsistent knowledge: {message}")]
    InconsistentKnowledge { message: String },

    #[error("internal optimizer error: scope stack has {actual} frames, expected {expected}")]
    ScopeImbalance { expected: usize, actual: usize },

    #[error("internal optimizer error: {message}")]
    Internal { message: String, span: Span },
}

impl OptimizerError {
    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        OptimizerError::Internal {
            message: message.into(),
            span,
        }
    }

    /// Stable diagnostic tag.
    pub fn tag(&self) -> &'static str {
        match self {
            OptimizerError::StatementInExpressionContext { .. } => "statement-in-expression-context",
            OptimizerError::MissingAssignmentValue { .. } => "missing-assignment-value",
            OptimizerError::NonEmptyForLoopPre { .. } => "non-empty-for-loop-pre",
            OptimizerError::InconsistentKnowledge { .. } => "inconsistent-knowledge",
            OptimizerError::ScopeImbalance { .. } => "scope-imbalance",
            OptimizerError::Internal { .. } => "internal",
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            OptimizerError::StatementInExpressionContext { span }
            | OptimizerError::MissingAssignmentValue { span, .. }
            | OptimizerError::NonEmptyForLoopPre { span }
            | OptimizerError::Internal { span, .. } => Some(*span),
            OptimizerError::InconsistentKnowledge { .. } | OptimizerError::ScopeImbalance { .. } => {
                None
            }
        }
    }
}

/// Result type for optimizer operations
pub type OptResult<T> = Result<T, OptimizerError>;
