use crate::{
    ast,
    error::EvalResult,
    module::Module,
    object::ObjectId,
    runtime::{InterpreterContext, Materialized},
    types,
    value::LabeledValue,
};

use super::{define, eager, expect_bool, lazy, param, LazyArguments};

pub(super) fn module() -> Module {
    Module::new("booleans")
        .depends_on(&["objects"])
        .with_expressions([
            define("true", ast::invocation(lazy(boolean_true, "", Vec::new()), Vec::new())),
            define("false", ast::invocation(lazy(boolean_false, "", Vec::new()), Vec::new())),
            define(
                "!",
                eager(
                    boolean_not,
                    "Negates a boolean",
                    vec![param(0, types::boolean())],
                ),
            ),
        ])
}

fn boolean_true(_args: &LazyArguments, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(true))
}

fn boolean_false(_args: &LazyArguments, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(false))
}

fn boolean_not(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(!expect_bool(&args.get(0), "!")?))
}
