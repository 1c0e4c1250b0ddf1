use std::fmt;

use thiserror::Error;

use crate::{error::RuntimeError, module::ModuleError};

/// Represents a byte span within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: SourceSpan) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Inclusive on both ends so a cursor sitting right after a name still hits it.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lexer,
    Parser,
    Runtime,
}

/// Rich diagnostic information surfaced to end users.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if let Some(span) = self.span {
            write!(f, " ({span})")?;
        }
        if !self.notes.is_empty() {
            writeln!(f)?;
            for note in &self.notes {
                writeln!(f, "  note: {note}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type for the Diagrammar toolchain.
#[derive(Debug, Error)]
pub enum DiagrammarError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("{}", .0.first().map(ToString::to_string).unwrap_or_default())]
    Diagnostics(Vec<Diagnostic>),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
    #[error("{0}")]
    Module(#[from] ModuleError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagrammarError {
    /// Flattens the error into user-facing diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            DiagrammarError::Diagnostic(diagnostic) => vec![diagnostic.clone()],
            DiagrammarError::Diagnostics(diagnostics) => diagnostics.clone(),
            DiagrammarError::Runtime(error) => vec![error.to_diagnostic()],
            DiagrammarError::Module(err) => vec![Diagnostic::new(
                DiagnosticKind::Runtime,
                err.to_string(),
            )],
            DiagrammarError::Io(err) => vec![Diagnostic::new(
                DiagnosticKind::Runtime,
                format!("I/O error: {err}"),
            )],
        }
    }
}

pub type Result<T> = std::result::Result<T, DiagrammarError>;
