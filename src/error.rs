use std::fmt;

use thiserror::Error;

use crate::{
    ast::ExprRef,
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    object::ObjectId,
    value::LabeledValue,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("cannot access fields of null")]
    NullAccess,
    #[error("value is not callable")]
    NotCallable,
    #[error("setting this proto would create a proto loop")]
    ProtoLoop,
    #[error("proto must be an object or null")]
    InvalidProto,
    #[error("cannot set the proto of a primitive value")]
    SimpleProto,
    #[error("type mismatch at `{path}`: expected {expected}")]
    TypeMismatch { path: String, expected: String },
    #[error("step limit of {max} exceeded")]
    StepLimitExceeded { max: u64 },
    #[error("maximum call depth of {max} exceeded")]
    DepthLimitExceeded { max: usize },
    #[error("{0}")]
    User(String),
    #[error("{0}")]
    InvalidArgument(String),
}

/// Error raised while evaluating; carries the expressions active when it was raised,
/// innermost first.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub stack: Vec<ExprRef>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind) -> Self {
        Self {
            kind,
            stack: Vec::new(),
        }
    }

    pub fn user(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::User(message.into()))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::InvalidArgument(message.into()))
    }

    /// Fatal errors are never recoverable by language code.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            RuntimeErrorKind::StepLimitExceeded { .. }
                | RuntimeErrorKind::DepthLimitExceeded { .. }
                | RuntimeErrorKind::ProtoLoop
        )
    }

    /// Span of the innermost expression that has one.
    pub fn first_span(&self) -> Option<SourceSpan> {
        self.stack.iter().find_map(|expr| expr.span)
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(DiagnosticKind::Runtime, self.kind.to_string());
        if let Some(span) = self.first_span() {
            diagnostic = diagnostic.with_span(span);
        }
        for span in self.stack.iter().filter_map(|expr| expr.span).skip(1).take(8) {
            diagnostic = diagnostic.with_note(format!("while evaluating {span}"));
        }
        diagnostic
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(span) = self.first_span() {
            write!(f, " at {span}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Raised by a completion probe; unwinds evaluation up to the autocompletion driver.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    /// Receiver whose fields are offered, or the scope for bare identifiers.
    pub context: LabeledValue,
    pub scope: ObjectId,
    pub node: ExprRef,
}

/// Non-local exit from evaluation.
#[derive(Debug, Clone)]
pub enum Interrupt {
    Error(RuntimeError),
    Completion(Box<CompletionSignal>),
}

impl From<RuntimeError> for Interrupt {
    fn from(error: RuntimeError) -> Self {
        Interrupt::Error(error)
    }
}

impl From<RuntimeErrorKind> for Interrupt {
    fn from(kind: RuntimeErrorKind) -> Self {
        Interrupt::Error(RuntimeError::new(kind))
    }
}

pub type EvalResult<T> = Result<T, Interrupt>;
