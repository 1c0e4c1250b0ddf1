//! Executable form of the syntax tree.
//!
//! The interpreter never evaluates [`crate::ast::Expr`] directly. A [`Transformer`] lowers
//! each node into an [`ExecExpr`]; the default lowering is purely structural,
//! and specialised transformers override [`Transformer::transform_expr`] to
//! splice in extra nodes such as completion probes.

use std::rc::Rc;

use crate::{
    ast::{Argument, Decorators, ExprKind, ExprRef, FieldKey, Literal, ParameterType},
    runtime::NativeCallback,
    value::LabeledValue,
};

pub type ExecRef = Rc<ExecExpr>;

#[derive(Debug)]
pub struct ExecExpr {
    pub kind: ExecKind,
    /// Source node, kept when the tree was lowered with source retention.
    pub origin: Option<ExprRef>,
}

impl ExecExpr {
    pub fn new(kind: ExecKind, origin: Option<ExprRef>) -> ExecRef {
        Rc::new(Self { kind, origin })
    }

    /// Wraps an already evaluated value, used to pass `self` into invocations.
    pub fn constant(value: LabeledValue) -> ExecRef {
        Self::new(ExecKind::Const(value), None)
    }
}

#[derive(Debug)]
pub struct ExecArgument {
    pub name: Option<String>,
    pub value: ExecRef,
}

#[derive(Debug)]
pub struct ExecFunction {
    pub body: Vec<ExecRef>,
    pub decorators: Decorators,
    pub types: Vec<ParameterType>,
}

pub struct ExecNativeFunction {
    pub callback: NativeCallback,
    pub decorators: Decorators,
    pub types: Vec<ParameterType>,
}

impl std::fmt::Debug for ExecNativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecNativeFunction")
            .field("decorators", &self.decorators)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ExecKind {
    Const(LabeledValue),
    Identifier(String),
    FieldAccess {
        target: ExecRef,
        name: FieldKey,
    },
    /// Trailing functions are already appended to `args`.
    Invocation {
        target: ExecRef,
        args: Vec<ExecArgument>,
    },
    SelfInvocation {
        target: ExecRef,
        name: FieldKey,
        args: Vec<ExecArgument>,
    },
    Assignment {
        target: Option<ExecRef>,
        name: FieldKey,
        value: ExecRef,
    },
    Destructuring {
        names: Vec<String>,
        value: ExecRef,
    },
    Bracket(ExecRef),
    Literal(Literal),
    Function(Rc<ExecFunction>),
    NativeFunction(Rc<ExecNativeFunction>),
    /// Stops evaluation and reports completion candidates for `node`.
    /// With a target, candidates are the target's fields; otherwise the scope's.
    Probe {
        target: Option<ExecRef>,
        node: ExprRef,
    },
}

/// Lowers syntax nodes into executable nodes.
///
/// Override `transform_expr` to intercept specific nodes and call
/// [`walk_expr`] to keep the structural lowering for the rest.
pub trait Transformer {
    fn retain_source(&self) -> bool;

    fn transform_expr(&mut self, expr: &ExprRef) -> ExecRef {
        walk_expr(self, expr)
    }

    fn transform_all(&mut self, exprs: &[ExprRef]) -> Vec<ExecRef> {
        exprs.iter().map(|expr| self.transform_expr(expr)).collect()
    }

    fn origin(&self, expr: &ExprRef) -> Option<ExprRef> {
        self.retain_source().then(|| Rc::clone(expr))
    }
}

pub fn walk_expr<T: Transformer + ?Sized>(transformer: &mut T, expr: &ExprRef) -> ExecRef {
    let kind = match &expr.kind {
        ExprKind::Identifier(name) => ExecKind::Identifier(name.clone()),
        ExprKind::FieldAccess { target, name, .. } => ExecKind::FieldAccess {
            target: transformer.transform_expr(target),
            name: name.clone(),
        },
        ExprKind::Invocation {
            target,
            args,
            trailing,
        } => ExecKind::Invocation {
            target: transformer.transform_expr(target),
            args: transform_arguments(transformer, args, trailing),
        },
        ExprKind::SelfInvocation {
            target,
            name,
            args,
            trailing,
            ..
        } => ExecKind::SelfInvocation {
            target: transformer.transform_expr(target),
            name: name.clone(),
            args: transform_arguments(transformer, args, trailing),
        },
        ExprKind::Assignment {
            target,
            name,
            value,
            ..
        } => ExecKind::Assignment {
            target: target.as_ref().map(|target| transformer.transform_expr(target)),
            name: name.clone(),
            value: transformer.transform_expr(value),
        },
        ExprKind::Destructuring { names, value } => ExecKind::Destructuring {
            names: names.clone(),
            value: transformer.transform_expr(value),
        },
        ExprKind::Bracket(inner) => ExecKind::Bracket(transformer.transform_expr(inner)),
        ExprKind::Literal(literal) => ExecKind::Literal(literal.clone()),
        ExprKind::Function(function) => ExecKind::Function(Rc::new(ExecFunction {
            body: transformer.transform_all(&function.body),
            decorators: function.decorators.clone(),
            types: function.types.clone(),
        })),
        ExprKind::NativeFunction(native) => ExecKind::NativeFunction(Rc::new(ExecNativeFunction {
            callback: Rc::clone(&native.callback),
            decorators: native.decorators.clone(),
            types: native.types.clone(),
        })),
    };
    ExecExpr::new(kind, transformer.origin(expr))
}

fn transform_arguments<T: Transformer + ?Sized>(
    transformer: &mut T,
    args: &[Argument],
    trailing: &[ExprRef],
) -> Vec<ExecArgument> {
    let mut lowered: Vec<ExecArgument> = args
        .iter()
        .map(|arg| ExecArgument {
            name: arg.name.clone(),
            value: transformer.transform_expr(&arg.value),
        })
        .collect();
    lowered.extend(trailing.iter().map(|function| ExecArgument {
        name: None,
        value: transformer.transform_expr(function),
    }));
    lowered
}

/// Plain structural lowering.
pub struct ExecutableTransformer {
    retain_source: bool,
}

impl ExecutableTransformer {
    pub fn new(retain_source: bool) -> Self {
        Self { retain_source }
    }
}

impl Transformer for ExecutableTransformer {
    fn retain_source(&self) -> bool {
        self.retain_source
    }
}

pub fn to_executable(exprs: &[ExprRef], retain_source: bool) -> Vec<ExecRef> {
    ExecutableTransformer::new(retain_source).transform_all(exprs)
}

