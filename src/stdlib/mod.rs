//! Builtin modules bootstrapped into every interpreter context.

use std::rc::Rc;

use crate::{
    ast::{self, ExprRef, FieldKey, ParameterType},
    error::{EvalResult, RuntimeError},
    module::{Module, ModuleError},
    object::ObjectId,
    runtime::{Arguments, InterpreterContext, Materialized, NativeCallback},
    types::TypeRef,
    value::{LabeledValue, Value},
};

mod booleans;
mod control;
mod lists;
mod numbers;
mod objects;
mod operators;
mod strings;

/// Native receiving its arguments unevaluated.
pub(crate) type LazyFn = fn(&LazyArguments, &mut InterpreterContext, ObjectId) -> EvalResult<LabeledValue>;

/// Native receiving evaluated and type-checked arguments.
pub(crate) type EagerFn = fn(&Materialized, &mut InterpreterContext, ObjectId) -> EvalResult<LabeledValue>;

pub fn modules() -> Result<Vec<Module>, ModuleError> {
    Ok(vec![
        objects::module()?,
        booleans::module(),
        numbers::module(),
        strings::module(),
        control::module(),
        operators::module(),
        lists::module()?,
    ])
}

/// Unevaluated arguments of a lazy native. An argument is type-checked when it is evaluated.
pub(crate) struct LazyArguments<'a> {
    args: &'a Arguments,
    types: &'a [ParameterType],
}

impl LazyArguments<'_> {
    pub(crate) fn positional(&self, ctx: &mut InterpreterContext, index: usize) -> EvalResult<LabeledValue> {
        let value = self.args.evaluate_positional(ctx, index)?;
        let key = FieldKey::Index(index);
        for parameter in self.types.iter().filter(|parameter| parameter.key == key) {
            ctx.validate_parameter(parameter, &value)?;
        }
        Ok(value)
    }
}

pub(crate) fn lazy(callback: LazyFn, docs: &str, types: Vec<ParameterType>) -> ExprRef {
    let checked = types.clone();
    let wrapped: NativeCallback = Rc::new(
        move |args: &Arguments, ctx: &mut InterpreterContext, scope: ObjectId| {
            callback(&LazyArguments { args, types: &checked }, ctx, scope)
        },
    );
    ast::native_function(wrapped, ast::docs(docs), types)
}

pub(crate) fn eager(callback: EagerFn, docs: &str, types: Vec<ParameterType>) -> ExprRef {
    let checked = types.clone();
    let wrapped: NativeCallback = Rc::new(
        move |args: &Arguments, ctx: &mut InterpreterContext, scope: ObjectId| {
            let materialized = args.materialize(ctx)?;
            ctx.validate(&checked, |key| materialized.lookup(key))?;
            callback(&materialized, ctx, scope)
        },
    );
    ast::native_function(wrapped, ast::docs(docs), types)
}

/// `name = value` in the global scope.
pub(crate) fn define(name: &str, value: ExprRef) -> ExprRef {
    ast::assignment(None, name, value)
}

/// `target.name = value`.
pub(crate) fn define_on(target: &str, name: &str, value: ExprRef) -> ExprRef {
    ast::assignment(Some(ast::identifier(target)), name, value)
}

pub(crate) fn param(key: impl Into<FieldKey>, ty: TypeRef) -> ParameterType {
    ParameterType {
        key: key.into(),
        ty,
    }
}

pub(crate) fn expect_number(value: &LabeledValue, what: &str) -> EvalResult<f64> {
    value.value.as_number().ok_or_else(|| {
        RuntimeError::invalid_argument(format!(
            "{what} expected a number but found {}",
            value.value.type_name()
        ))
        .into()
    })
}

pub(crate) fn expect_string(value: &LabeledValue, what: &str) -> EvalResult<Rc<str>> {
    match &value.value {
        Value::String(text) => Ok(Rc::clone(text)),
        other => Err(RuntimeError::invalid_argument(format!(
            "{what} expected a string but found {}",
            other.type_name()
        ))
        .into()),
    }
}

pub(crate) fn expect_bool(value: &LabeledValue, what: &str) -> EvalResult<bool> {
    value.value.as_bool().ok_or_else(|| {
        RuntimeError::invalid_argument(format!(
            "{what} expected a boolean but found {}",
            value.value.type_name()
        ))
        .into()
    })
}

/// Field key named by a string or a non-negative integer value.
pub(crate) fn expect_key(value: &LabeledValue, what: &str) -> EvalResult<FieldKey> {
    match &value.value {
        Value::String(name) => Ok(FieldKey::name(name.as_ref())),
        Value::Number(index) if *index >= 0.0 && index.fract() == 0.0 => {
            Ok(FieldKey::Index(*index as usize))
        }
        other => Err(RuntimeError::invalid_argument(format!(
            "{what} expected a field key but found {}",
            other.type_name()
        ))
        .into()),
    }
}

pub(crate) fn key_value(key: &FieldKey) -> Value {
    match key {
        FieldKey::Name(name) => Value::string(name),
        FieldKey::Index(index) => Value::Number(*index as f64),
    }
}
