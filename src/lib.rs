//! Core library for the Diagrammar diagram description language: lexing,
//! parsing, lowering to an executable tree, prototype-based evaluation, the
//! builtin modules and probe-based autocompletion.

pub mod ast;
pub mod completion;
pub mod diagnostics;
pub mod error;
pub mod executable;
pub mod lexer;
pub mod module;
pub mod object;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod stdlib;
pub mod types;
pub mod value;

pub use completion::CompletionItem;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagrammarError, SourceSpan};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use repl::Repl;
pub use runtime::{InterpretationResult, Interpreter, InterpreterConfig, InterpreterContext};
pub use value::{LabeledValue, Value};
