use crate::{
    error::{EvalResult, RuntimeError},
    module::Module,
    object::ObjectId,
    runtime::{InterpreterContext, Materialized},
    types,
    value::LabeledValue,
};

use super::{define, define_on, eager, expect_number, param};

pub(super) fn module() -> Module {
    let receiver = || vec![param("self", types::number())];
    Module::new("numbers")
        .depends_on(&["objects"])
        .with_expressions([
            define_on("numberProto", "floor", eager(number_floor, "Rounds down", receiver())),
            define_on("numberProto", "ceil", eager(number_ceil, "Rounds up", receiver())),
            define_on(
                "numberProto",
                "round",
                eager(number_round, "Rounds to the nearest integer", receiver()),
            ),
            define_on("numberProto", "abs", eager(number_abs, "Absolute value", receiver())),
            define("min", eager(number_min, "Smallest of the given numbers", Vec::new())),
            define("max", eager(number_max, "Largest of the given numbers", Vec::new())),
        ])
}

fn receiver_number(args: &Materialized, name: &str) -> EvalResult<f64> {
    expect_number(&args.named("self"), name)
}

fn number_floor(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(receiver_number(args, "floor")?.floor()))
}

fn number_ceil(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(receiver_number(args, "ceil")?.ceil()))
}

fn number_round(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(receiver_number(args, "round")?.round()))
}

fn number_abs(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(receiver_number(args, "abs")?.abs()))
}

fn fold_numbers(args: &Materialized, name: &str, pick: fn(f64, f64) -> f64) -> EvalResult<LabeledValue> {
    let mut result: Option<f64> = None;
    for value in args.positional() {
        let number = expect_number(value, name)?;
        result = Some(match result {
            Some(current) => pick(current, number),
            None => number,
        });
    }
    match result {
        Some(value) => Ok(LabeledValue::new(value)),
        None => Err(RuntimeError::invalid_argument(format!("{name} expects at least one number")).into()),
    }
}

fn number_min(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    fold_numbers(args, "min", f64::min)
}

fn number_max(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    fold_numbers(args, "max", f64::max)
}
