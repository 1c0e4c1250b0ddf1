use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::{
    ast::{FieldKey, Literal, ParameterType},
    diagnostics::{DiagrammarError, Result},
    error::{CompletionSignal, EvalResult, Interrupt, RuntimeError, RuntimeErrorKind},
    executable::{to_executable, ExecArgument, ExecExpr, ExecFunction, ExecKind, ExecNativeFunction, ExecRef},
    module::{self, Module},
    object::{Heap, ObjectId, ObjectKind},
    parser, stdlib,
    value::{LabeledValue, Value},
};

/// Host callback behind a native function. Receives the unevaluated arguments,
/// the context and the scope the native was defined in.
pub type NativeCallback =
    Rc<dyn Fn(&Arguments, &mut InterpreterContext, ObjectId) -> EvalResult<LabeledValue>>;

const RED_ZONE: usize = 100 * 1024;
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Invocations allowed per run before it is aborted.
    pub max_steps: u64,
    pub max_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            max_depth: 4_000,
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Lazily evaluated argument list of one invocation.
#[derive(Debug)]
pub struct Arguments {
    entries: Vec<ExecArgument>,
    /// Scope the argument expressions are evaluated in.
    scope: ObjectId,
}

impl Arguments {
    pub fn new(self_value: Option<LabeledValue>, args: &[ExecArgument], scope: ObjectId) -> Self {
        let mut entries = Vec::with_capacity(args.len() + 1);
        if let Some(value) = self_value {
            entries.push(ExecArgument {
                name: Some("self".to_string()),
                value: ExecExpr::constant(value),
            });
        }
        entries.extend(args.iter().map(|arg| ExecArgument {
            name: arg.name.clone(),
            value: Rc::clone(&arg.value),
        }));
        Self { entries, scope }
    }

    /// Already evaluated positional arguments, used when natives call back into functions.
    pub fn from_values(values: Vec<LabeledValue>, scope: ObjectId) -> Self {
        let entries = values
            .into_iter()
            .map(|value| ExecArgument {
                name: None,
                value: ExecExpr::constant(value),
            })
            .collect();
        Self { entries, scope }
    }

    fn positional(&self, index: usize) -> Option<&ExecRef> {
        self.entries
            .iter()
            .filter(|arg| arg.name.is_none())
            .nth(index)
            .map(|arg| &arg.value)
    }

    /// Evaluates positional argument `index`; a missing argument is null.
    pub fn evaluate_positional(&self, ctx: &mut InterpreterContext, index: usize) -> EvalResult<LabeledValue> {
        match self.positional(index) {
            Some(expr) => ctx.evaluate_with_source(expr, self.scope),
            None => Ok(LabeledValue::null()),
        }
    }

    /// Evaluates every argument in call order.
    pub fn materialize(&self, ctx: &mut InterpreterContext) -> EvalResult<Materialized> {
        let mut entries = Vec::with_capacity(self.entries.len());
        let mut index = 0;
        for arg in &self.entries {
            let key = match &arg.name {
                Some(name) => FieldKey::Name(name.clone()),
                None => {
                    index += 1;
                    FieldKey::Index(index - 1)
                }
            };
            let value = ctx.evaluate_with_source(&arg.value, self.scope)?;
            entries.push((key, value));
        }
        Ok(Materialized { entries })
    }
}

/// Fully evaluated arguments, keyed by position or name.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    pub entries: Vec<(FieldKey, LabeledValue)>,
}

impl Materialized {
    pub fn lookup(&self, key: &FieldKey) -> LabeledValue {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, index: usize) -> LabeledValue {
        self.lookup(&FieldKey::Index(index))
    }

    pub fn named(&self, name: &str) -> LabeledValue {
        self.lookup(&FieldKey::name(name))
    }

    pub fn positional(&self) -> impl Iterator<Item = &LabeledValue> {
        self.entries
            .iter()
            .filter(|(key, _)| matches!(key, FieldKey::Index(_)))
            .map(|(_, value)| value)
    }

    /// Named arguments other than the implicit `self`.
    pub fn named_entries(&self) -> impl Iterator<Item = (&str, &LabeledValue)> {
        self.entries.iter().filter_map(|(key, value)| match key {
            FieldKey::Name(name) if name != "self" => Some((name.as_str(), value)),
            _ => None,
        })
    }
}

/// Mutable state of one run: the object graph plus the execution guards.
#[derive(Debug)]
pub struct InterpreterContext {
    pub heap: Heap,
    pub global: ObjectId,
    steps: u64,
    depth: usize,
    config: InterpreterConfig,
}

impl InterpreterContext {
    pub fn new(config: InterpreterConfig) -> Self {
        let mut heap = Heap::new();
        let global = heap.alloc(None);
        let protos = heap.protos();
        for (name, id) in [
            ("objectProto", protos.object),
            ("functionProto", protos.function),
            ("numberProto", protos.number),
            ("stringProto", protos.string),
            ("booleanProto", protos.boolean),
        ] {
            heap.define(global, name, LabeledValue::new(id));
        }
        heap.define(global, "this", LabeledValue::new(global));
        Self {
            heap,
            global,
            steps: 0,
            depth: 0,
            config,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn config(&self) -> InterpreterConfig {
        self.config
    }

    fn reset_steps(&mut self) {
        self.steps = 0;
    }

    /// Text used when a value is printed or concatenated.
    pub fn display(&self, value: &Value) -> String {
        self.heap.display(value)
    }

    /// Evaluates `expr` in `scope`, recording its origin on errors passing through.
    pub fn evaluate(&mut self, expr: &ExecRef, scope: ObjectId) -> EvalResult<LabeledValue> {
        stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || {
            self.evaluate_internal(expr, scope)
        })
        .map_err(|interrupt| match interrupt {
            Interrupt::Error(mut error) => {
                if let Some(origin) = &expr.origin {
                    error.stack.push(Rc::clone(origin));
                }
                Interrupt::Error(error)
            }
            completion => completion,
        })
    }

    /// Like [`InterpreterContext::evaluate`], attaching `expr` as source when the value has none.
    pub fn evaluate_with_source(&mut self, expr: &ExecRef, scope: ObjectId) -> EvalResult<LabeledValue> {
        Ok(self.evaluate(expr, scope)?.or_source(expr.origin.as_ref()))
    }

    /// Evaluates expressions in order and yields the last value, null when empty.
    pub fn run_all(&mut self, exprs: &[ExecRef], scope: ObjectId) -> EvalResult<LabeledValue> {
        let mut last = LabeledValue::null();
        for expr in exprs {
            last = self.evaluate(expr, scope)?;
        }
        Ok(last)
    }

    fn evaluate_internal(&mut self, expr: &ExecRef, scope: ObjectId) -> EvalResult<LabeledValue> {
        match &expr.kind {
            ExecKind::Const(value) => Ok(value.clone()),
            ExecKind::Identifier(name) => Ok(self.heap.get_field(scope, &FieldKey::name(name.as_str()))),
            ExecKind::FieldAccess { target, name } => {
                let target = self.evaluate(target, scope)?;
                Ok(self.heap.get_value_field(&target.value, name)?)
            }
            ExecKind::Invocation { target, args } => {
                let callee = self.evaluate(target, scope)?;
                let args = Arguments::new(Some(LabeledValue::new(scope)), args, scope);
                self.invoke(&callee, &args)
            }
            ExecKind::SelfInvocation { target, name, args } => {
                let receiver = self.evaluate(target, scope)?;
                let callee = self.heap.get_value_field(&receiver.value, name)?;
                let args = Arguments::new(Some(receiver), args, scope);
                self.invoke(&callee, &args)
            }
            ExecKind::Assignment { target, name, value } => {
                let value = self.evaluate_with_source(value, scope)?;
                match target {
                    Some(target) => {
                        let target = self.evaluate(target, scope)?;
                        self.heap
                            .set_value_field(&target.value, name.clone(), value.clone(), true)?;
                    }
                    None => self.heap.set_field(scope, name.clone(), value.clone())?,
                }
                Ok(value)
            }
            ExecKind::Destructuring { names, value } => {
                let value = self.evaluate_with_source(value, scope)?;
                for (index, name) in names.iter().enumerate() {
                    let field = self
                        .heap
                        .get_value_field(&value.value, &FieldKey::Index(index))?;
                    self.heap.set_field(scope, FieldKey::name(name.as_str()), field)?;
                }
                Ok(value)
            }
            ExecKind::Bracket(inner) => self.evaluate_with_source(inner, scope),
            ExecKind::Literal(literal) => {
                let value = match literal {
                    Literal::Number(number) => Value::Number(*number),
                    Literal::String(text) => Value::string(text),
                };
                Ok(LabeledValue::with_source(value, expr.origin.clone()))
            }
            ExecKind::Function(function) => {
                let id = self.heap.alloc_function(Rc::clone(function), scope);
                Ok(LabeledValue::with_source(id, expr.origin.clone()))
            }
            ExecKind::NativeFunction(function) => {
                let id = self.heap.alloc_native(Rc::clone(function), scope);
                Ok(LabeledValue::with_source(id, expr.origin.clone()))
            }
            ExecKind::Probe { target, node } => {
                trace!(span = ?node.span, "completion probe reached");
                let context = match target {
                    Some(target) => self.evaluate(target, scope)?,
                    None => LabeledValue::new(scope),
                };
                Err(Interrupt::Completion(Box::new(CompletionSignal {
                    context,
                    scope,
                    node: Rc::clone(node),
                })))
            }
        }
    }

    /// Invokes a function value with lazily evaluated arguments.
    pub fn invoke(&mut self, callee: &LabeledValue, args: &Arguments) -> EvalResult<LabeledValue> {
        let Value::Object(id) = callee.value else {
            return Err(RuntimeErrorKind::NotCallable.into());
        };
        match self.heap.get(id).kind.clone() {
            ObjectKind::Plain => Err(RuntimeErrorKind::NotCallable.into()),
            ObjectKind::Function { function, scope } => {
                self.enter_call()?;
                let result = self.invoke_function(&function, scope, args);
                self.depth -= 1;
                result
            }
            ObjectKind::Native { function, scope } => {
                self.enter_call()?;
                let result = self.invoke_native(&function, scope, args);
                self.depth -= 1;
                result
            }
        }
    }

    /// Calls `callee` with already evaluated positional arguments and no `self`.
    pub fn call(&mut self, callee: &LabeledValue, args: Vec<LabeledValue>) -> EvalResult<LabeledValue> {
        let args = Arguments::from_values(args, self.global);
        self.invoke(callee, &args)
    }

    fn enter_call(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.config.max_steps {
            warn!(max_steps = self.config.max_steps, "step limit exceeded");
            return Err(RuntimeErrorKind::StepLimitExceeded {
                max: self.config.max_steps,
            }
            .into());
        }
        if self.depth >= self.config.max_depth {
            warn!(max_depth = self.config.max_depth, "call depth limit exceeded");
            return Err(RuntimeErrorKind::DepthLimitExceeded {
                max: self.config.max_depth,
            }
            .into());
        }
        self.depth += 1;
        Ok(())
    }

    fn invoke_function(
        &mut self,
        function: &ExecFunction,
        captured: ObjectId,
        args: &Arguments,
    ) -> EvalResult<LabeledValue> {
        let scope = self.heap.alloc(Some(captured));
        trace!(scope = %scope, captured = %captured, "invoking function");
        self.heap.define(scope, "this", LabeledValue::new(scope));

        let materialized = args.materialize(self)?;
        let args_object = self.heap.alloc_object();
        for (key, value) in &materialized.entries {
            self.heap
                .set_local_field(args_object, key.clone(), value.clone())?;
        }
        self.heap.define(scope, "args", LabeledValue::new(args_object));
        self.heap.define(scope, "it", materialized.get(0));
        self.heap.define(scope, "self", materialized.named("self"));

        self.validate(&function.types, |key| materialized.lookup(key))?;
        self.run_all(&function.body, scope)
    }

    fn invoke_native(
        &mut self,
        function: &ExecNativeFunction,
        captured: ObjectId,
        args: &Arguments,
    ) -> EvalResult<LabeledValue> {
        (function.callback)(args, self, captured)
    }

    /// Checks each declared parameter type against the argument found under its key.
    pub fn validate(
        &self,
        types: &[ParameterType],
        lookup: impl Fn(&FieldKey) -> LabeledValue,
    ) -> EvalResult<()> {
        for parameter in types {
            self.validate_parameter(parameter, &lookup(&parameter.key))?;
        }
        Ok(())
    }

    pub fn validate_parameter(&self, parameter: &ParameterType, value: &LabeledValue) -> EvalResult<()> {
        if let Err(mismatch) = parameter.ty.matches(&value.value, &self.heap) {
            let mut error = RuntimeError::new(mismatch.into_error(&parameter.key));
            if let Some(source) = &value.source {
                error.stack.push(Rc::clone(source));
            }
            return Err(error.into());
        }
        Ok(())
    }
}

/// Outcome of [`Interpreter::run`]. The context stays available so callers can
/// keep reading the produced object graph.
///
/// A completion probe reached during a plain run leaves both `result` and
/// `error` empty; use [`Interpreter::run_raw`] to observe the signal.
#[derive(Debug)]
pub struct InterpretationResult {
    pub result: Option<LabeledValue>,
    pub error: Option<RuntimeError>,
    pub context: InterpreterContext,
}

/// Successful evaluation of a whole source text.
#[derive(Debug)]
pub struct Evaluation {
    pub value: LabeledValue,
    pub context: InterpreterContext,
}

impl Evaluation {
    pub fn display(&self) -> String {
        self.context.display(&self.value.value)
    }
}

struct LoadedModule {
    name: String,
    expressions: Vec<ExecRef>,
}

/// Runs programs on top of a bootstrapped standard library.
///
/// Every run starts from a fresh [`InterpreterContext`], so runs never observe
/// each other's mutations.
pub struct Interpreter {
    modules: Vec<LoadedModule>,
    config: InterpreterConfig,
}

impl Interpreter {
    pub fn new() -> Result<Self> {
        Self::with_modules(stdlib::modules()?)
    }

    pub fn with_modules(modules: Vec<Module>) -> Result<Self> {
        let ordered = module::initialization_order(&modules)?;
        let modules = ordered
            .into_iter()
            .map(|module| LoadedModule {
                name: module.name.clone(),
                expressions: to_executable(&module.expressions, false),
            })
            .collect();
        Ok(Self {
            modules,
            config: InterpreterConfig::default(),
        })
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> InterpreterConfig {
        self.config
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|module| module.name.as_str())
    }

    /// Creates a context with every module initialized and the step counter reset.
    pub fn bootstrap(&self) -> (InterpreterContext, EvalResult<()>) {
        self.bootstrap_with(self.config)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    fn bootstrap_with(&self, config: InterpreterConfig) -> (InterpreterContext, EvalResult<()>) {
        let mut context = InterpreterContext::new(config);
        let global = context.global;
        for module in &self.modules {
            debug!(module = %module.name, "initializing module");
            if let Err(interrupt) = context.run_all(&module.expressions, global) {
                return (context, Err(interrupt));
            }
        }
        context.reset_steps();
        (context, Ok(()))
    }

    /// Runs `exprs` and keeps a completion signal distinguishable from errors.
    pub fn run_raw(&self, exprs: &[ExecRef]) -> (InterpreterContext, EvalResult<LabeledValue>) {
        self.run_raw_with(exprs, self.config)
    }

    fn run_raw_with(
        &self,
        exprs: &[ExecRef],
        config: InterpreterConfig,
    ) -> (InterpreterContext, EvalResult<LabeledValue>) {
        let (mut context, booted) = self.bootstrap_with(config);
        if let Err(interrupt) = booted {
            return (context, Err(interrupt));
        }
        let global = context.global;
        let outcome = context.run_all(exprs, global);
        debug!(steps = context.steps(), ok = outcome.is_ok(), "run finished");
        (context, outcome)
    }

    pub fn run(&self, exprs: &[ExecRef]) -> InterpretationResult {
        self.run_with_max_steps(exprs, self.config.max_steps)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(expressions = exprs.len()))]
    pub fn run_with_max_steps(&self, exprs: &[ExecRef], max_steps: u64) -> InterpretationResult {
        let (context, outcome) = self.run_raw_with(exprs, self.config.with_max_steps(max_steps));
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(Interrupt::Error(error)) => (None, Some(error)),
            Err(Interrupt::Completion(signal)) => {
                warn!(span = ?signal.node.span, "completion probe reached outside autocompletion");
                (None, None)
            }
        };
        InterpretationResult {
            result,
            error,
            context,
        }
    }

    /// Parses strictly, lowers with source links and runs.
    pub fn eval_source(&self, source: &str) -> Result<Evaluation> {
        let parsed = parser::parse(source);
        let Some(ast) = parsed.ast else {
            return Err(DiagrammarError::Diagnostics(parsed.errors().cloned().collect()));
        };
        let exprs = to_executable(&ast, true);
        let outcome = self.run(&exprs);
        match outcome.error {
            Some(error) => Err(DiagrammarError::Runtime(error)),
            None => Ok(Evaluation {
                value: outcome.result.unwrap_or_default(),
                context: outcome.context,
            }),
        }
    }
}
