//! Positioned syntax tree produced by the parser.
//!
//! Nodes are shared through [`ExprRef`] so the executable tree, runtime values
//! and error stacks can point back at the expression that produced them.
//! Apart from the editability flag the tree never changes after construction.

use std::{cell::Cell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{diagnostics::SourceSpan, runtime::NativeCallback, types::TypeRef};

pub type ExprRef = Rc<Expr>;

/// Key of an object field: a name or a non-negative index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Name(String),
    Index(usize),
}

impl FieldKey {
    pub fn name(name: impl Into<String>) -> Self {
        FieldKey::Name(name.into())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            FieldKey::Name(name) => Some(name),
            FieldKey::Index(_) => None,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.as_name() == Some(name)
    }
}

impl From<&str> for FieldKey {
    fn from(value: &str) -> Self {
        FieldKey::Name(value.to_string())
    }
}

impl From<String> for FieldKey {
    fn from(value: String) -> Self {
        FieldKey::Name(value)
    }
}

impl From<usize> for FieldKey {
    fn from(value: usize) -> Self {
        FieldKey::Index(value)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Name(name) => write!(f, "{name}"),
            FieldKey::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub name: Option<String>,
    pub value: ExprRef,
}

impl Argument {
    pub fn positional(value: ExprRef) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: ExprRef) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// Declared type of one parameter, checked when the function is invoked.
#[derive(Debug, Clone)]
pub struct ParameterType {
    pub key: FieldKey,
    pub ty: TypeRef,
}

pub type Decorators = IndexMap<String, Option<String>>;

#[derive(Debug, Clone, Default)]
pub struct FunctionExpr {
    pub body: Vec<ExprRef>,
    pub decorators: Decorators,
    pub types: Vec<ParameterType>,
}

#[derive(Clone)]
pub struct NativeFunctionExpr {
    pub callback: NativeCallback,
    pub decorators: Decorators,
    pub types: Vec<ParameterType>,
}

impl fmt::Debug for NativeFunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunctionExpr")
            .field("decorators", &self.decorators)
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Identifier(String),
    FieldAccess {
        target: ExprRef,
        name: FieldKey,
        name_span: Option<SourceSpan>,
    },
    Invocation {
        target: ExprRef,
        args: Vec<Argument>,
        trailing: Vec<ExprRef>,
    },
    /// `target.name(args)`: field access fused with a call passing `target` as `self`.
    SelfInvocation {
        target: ExprRef,
        name: FieldKey,
        name_span: Option<SourceSpan>,
        args: Vec<Argument>,
        trailing: Vec<ExprRef>,
    },
    Assignment {
        target: Option<ExprRef>,
        name: FieldKey,
        name_span: Option<SourceSpan>,
        value: ExprRef,
    },
    Destructuring {
        names: Vec<String>,
        value: ExprRef,
    },
    Bracket(ExprRef),
    Literal(Literal),
    Function(FunctionExpr),
    NativeFunction(NativeFunctionExpr),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Option<SourceSpan>,
    editable: Cell<bool>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Option<SourceSpan>) -> Self {
        Self {
            kind,
            span,
            editable: Cell::new(true),
        }
    }

    pub fn spanned(kind: ExprKind, span: SourceSpan) -> ExprRef {
        Rc::new(Self::new(kind, Some(span)))
    }

    pub fn synthetic(kind: ExprKind) -> ExprRef {
        Rc::new(Self::new(kind, None))
    }

    /// A desugared node that reports `span` in diagnostics but is never rewritten by editors.
    pub fn synthesized_at(kind: ExprKind, span: SourceSpan) -> ExprRef {
        let expr = Self::new(kind, Some(span));
        expr.editable.set(false);
        Rc::new(expr)
    }

    pub fn is_editable(&self) -> bool {
        self.editable.get() && self.span.is_some()
    }

    /// Clears the editable flag on this node and every descendant.
    pub fn mark_frozen(&self) {
        self.editable.set(false);
        self.for_each_child(|child| child.mark_frozen());
    }

    pub fn for_each_child(&self, mut visit: impl FnMut(&ExprRef)) {
        match &self.kind {
            ExprKind::Identifier(_) | ExprKind::Literal(_) | ExprKind::NativeFunction(_) => {}
            ExprKind::FieldAccess { target, .. } => visit(target),
            ExprKind::Invocation {
                target,
                args,
                trailing,
            }
            | ExprKind::SelfInvocation {
                target,
                args,
                trailing,
                ..
            } => {
                visit(target);
                args.iter().for_each(|arg| visit(&arg.value));
                trailing.iter().for_each(&mut visit);
            }
            ExprKind::Assignment { target, value, .. } => {
                if let Some(target) = target {
                    visit(target);
                }
                visit(value);
            }
            ExprKind::Destructuring { value, .. } => visit(value),
            ExprKind::Bracket(inner) => visit(inner),
            ExprKind::Function(function) => function.body.iter().for_each(visit),
        }
    }
}

pub fn identifier(name: impl Into<String>) -> ExprRef {
    Expr::synthetic(ExprKind::Identifier(name.into()))
}

pub fn number(value: f64) -> ExprRef {
    Expr::synthetic(ExprKind::Literal(Literal::Number(value)))
}

pub fn string(value: impl Into<String>) -> ExprRef {
    Expr::synthetic(ExprKind::Literal(Literal::String(value.into())))
}

pub fn field_access(target: ExprRef, name: impl Into<FieldKey>) -> ExprRef {
    Expr::synthetic(ExprKind::FieldAccess {
        target,
        name: name.into(),
        name_span: None,
    })
}

pub fn invocation(target: ExprRef, args: Vec<Argument>) -> ExprRef {
    Expr::synthetic(ExprKind::Invocation {
        target,
        args,
        trailing: Vec::new(),
    })
}

pub fn assignment(target: Option<ExprRef>, name: impl Into<FieldKey>, value: ExprRef) -> ExprRef {
    Expr::synthetic(ExprKind::Assignment {
        target,
        name: name.into(),
        name_span: None,
        value,
    })
}

pub fn native_function(callback: NativeCallback, decorators: Decorators, types: Vec<ParameterType>) -> ExprRef {
    Expr::synthetic(ExprKind::NativeFunction(NativeFunctionExpr {
        callback,
        decorators,
        types,
    }))
}

/// Builds a decorator map holding only `docs`.
pub fn docs(text: &str) -> Decorators {
    let mut decorators = IndexMap::new();
    decorators.insert("docs".to_string(), Some(text.to_string()));
    decorators
}

/// Formats a number the way the language prints it: integral values without a fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn write_arguments(f: &mut fmt::Formatter<'_>, args: &[Argument], trailing: &[ExprRef]) -> fmt::Result {
    write!(f, "(")?;
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        if let Some(name) = &arg.name {
            write!(f, "{name} = ")?;
        }
        write!(f, "{}", arg.value)?;
    }
    write!(f, ")")?;
    for function in trailing {
        write!(f, " {function}")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier(name) => write!(f, "{name}"),
            ExprKind::FieldAccess { target, name, .. } => write!(f, "{target}.{name}"),
            ExprKind::Invocation {
                target,
                args,
                trailing,
            } => {
                write!(f, "{target}")?;
                write_arguments(f, args, trailing)
            }
            ExprKind::SelfInvocation {
                target,
                name,
                args,
                trailing,
                ..
            } => {
                write!(f, "{target}.{name}")?;
                write_arguments(f, args, trailing)
            }
            ExprKind::Assignment {
                target,
                name,
                value,
                ..
            } => match target {
                Some(target) => write!(f, "{target}.{name} = {value}"),
                None => write!(f, "{name} = {value}"),
            },
            ExprKind::Destructuring { names, value } => {
                write!(f, "({}) = {value}", names.join(", "))
            }
            ExprKind::Bracket(inner) => write!(f, "({inner})"),
            ExprKind::Literal(Literal::Number(value)) => write!(f, "{}", format_number(*value)),
            ExprKind::Literal(Literal::String(value)) => {
                write!(f, "\"{}\"", escape_string(value))
            }
            ExprKind::Function(function) => {
                if !function.decorators.is_empty() {
                    write!(f, "[")?;
                    for (idx, (name, value)) in function.decorators.iter().enumerate() {
                        if idx > 0 {
                            write!(f, ", ")?;
                        }
                        match value {
                            Some(value) => write!(f, "{name} = \"{}\"", escape_string(value))?,
                            None => write!(f, "{name}")?,
                        }
                    }
                    write!(f, "] ")?;
                }
                if function.body.is_empty() {
                    return write!(f, "{{ }}");
                }
                writeln!(f, "{{")?;
                for expr in &function.body {
                    writeln!(f, "{expr}")?;
                }
                write!(f, "}}")
            }
            ExprKind::NativeFunction(_) => write!(f, "<native function>"),
        }
    }
}
