//! Autocompletion by probing.
//!
//! The tolerant parse of the edited text is lowered with [`CompletionTransformer`],
//! which swaps the node under the cursor for a probe. Running the program then
//! stops at the probe with the receiver (or scope) whose fields are offered.

use tracing::debug;

use crate::{
    ast::{ExprKind, ExprRef, FieldKey},
    diagnostics::SourceSpan,
    error::{CompletionSignal, Interrupt},
    executable::{walk_expr, ExecExpr, ExecKind, ExecRef, Transformer},
    object::ObjectKind,
    parser,
    runtime::{Interpreter, InterpreterContext},
    value::Value,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub insert_value: String,
    pub label: String,
    pub documentation: Option<String>,
    /// Source range the inserted text replaces.
    pub replace_range: SourceSpan,
}

pub struct CompletionTransformer {
    offset: usize,
}

impl CompletionTransformer {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    fn probe(&mut self, target: Option<&ExprRef>, expr: &ExprRef) -> ExecRef {
        let target = target.map(|target| self.transform_expr(target));
        ExecExpr::new(
            ExecKind::Probe {
                target,
                node: ExprRef::clone(expr),
            },
            self.origin(expr),
        )
    }

    fn hits(&self, span: &Option<SourceSpan>) -> bool {
        span.is_some_and(|span| span.contains(self.offset))
    }
}

impl Transformer for CompletionTransformer {
    fn retain_source(&self) -> bool {
        true
    }

    fn transform_expr(&mut self, expr: &ExprRef) -> ExecRef {
        match &expr.kind {
            ExprKind::FieldAccess {
                target, name_span, ..
            }
            | ExprKind::SelfInvocation {
                target, name_span, ..
            } if self.hits(name_span) => self.probe(Some(target), expr),
            ExprKind::Assignment {
                target: Some(target),
                name_span,
                ..
            } if self.hits(name_span) => self.probe(Some(target), expr),
            ExprKind::Assignment {
                target: None,
                name_span,
                ..
            } if self.hits(name_span) => self.probe(None, expr),
            ExprKind::Identifier(_) if self.hits(&expr.span) => self.probe(None, expr),
            _ => walk_expr(self, expr),
        }
    }
}

/// Range of the name being completed for a probed node.
fn name_range(node: &ExprRef, offset: usize) -> SourceSpan {
    let span = match &node.kind {
        ExprKind::FieldAccess { name_span, .. }
        | ExprKind::SelfInvocation { name_span, .. }
        | ExprKind::Assignment { name_span, .. } => *name_span,
        _ => node.span,
    };
    span.unwrap_or(SourceSpan::empty(offset))
}

fn documentation(context: &InterpreterContext, value: &Value) -> Option<String> {
    let id = value.as_object()?;
    let decorators = match &context.heap.get(id).kind {
        ObjectKind::Function { function, .. } => &function.decorators,
        ObjectKind::Native { function, .. } => &function.decorators,
        ObjectKind::Plain => return None,
    };
    decorators.get("docs").cloned().flatten()
}

fn collect_items(context: &InterpreterContext, signal: &CompletionSignal, offset: usize) -> Vec<CompletionItem> {
    let replace_range = name_range(&signal.node, offset);
    let receiver = &signal.context.value;
    context
        .heap
        .visible_keys(receiver)
        .into_iter()
        .filter_map(|key| {
            let FieldKey::Name(name) = &key else {
                return None;
            };
            let value = context.heap.get_value_field(receiver, &key).ok()?;
            Some(CompletionItem {
                insert_value: name.clone(),
                label: name.clone(),
                documentation: documentation(context, &value.value),
                replace_range,
            })
        })
        .collect()
}

impl Interpreter {
    /// Completion candidates at byte `offset` of `source`, or `None` when
    /// evaluation never reaches the cursor.
    pub fn autocomplete(&self, source: &str, offset: usize) -> Option<Vec<CompletionItem>> {
        let parsed = parser::parse_tolerant(source);
        let ast = parsed.ast?;
        let exprs = CompletionTransformer::new(offset).transform_all(&ast);
        let (context, outcome) = self.run_raw(&exprs);
        match outcome {
            Err(Interrupt::Completion(signal)) => Some(collect_items(&context, &signal, offset)),
            Err(Interrupt::Error(error)) => {
                debug!(error = %error, "completion run failed before reaching the cursor");
                None
            }
            Ok(_) => None,
        }
    }
}
