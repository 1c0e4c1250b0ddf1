use crate::{
    error::EvalResult,
    module::Module,
    object::ObjectId,
    runtime::{InterpreterContext, Materialized},
    types,
    value::{LabeledValue, Value},
};

use super::{define, define_on, eager, expect_string, param};

pub(super) fn module() -> Module {
    let receiver = || vec![param("self", types::string())];
    Module::new("strings")
        .depends_on(&["objects"])
        .with_expressions([
            define(
                "string",
                eager(string_of, "Converts any value to its display string", Vec::new()),
            ),
            define_on(
                "stringProto",
                "length",
                eager(string_length, "Number of characters", receiver()),
            ),
            define_on(
                "stringProto",
                "toUpperCase",
                eager(string_to_upper, "Upper-cased copy", receiver()),
            ),
            define_on(
                "stringProto",
                "toLowerCase",
                eager(string_to_lower, "Lower-cased copy", receiver()),
            ),
            define_on(
                "stringProto",
                "contains",
                eager(
                    string_contains,
                    "Whether the given text occurs in this string",
                    vec![param("self", types::string()), param(0, types::string())],
                ),
            ),
        ])
}

fn string_of(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(Value::string(ctx.display(&args.get(0).value))))
}

fn string_length(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let text = expect_string(&args.named("self"), "length")?;
    Ok(LabeledValue::new(text.chars().count() as f64))
}

fn string_to_upper(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let text = expect_string(&args.named("self"), "toUpperCase")?;
    Ok(LabeledValue::new(Value::string(text.to_uppercase())))
}

fn string_to_lower(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let text = expect_string(&args.named("self"), "toLowerCase")?;
    Ok(LabeledValue::new(Value::string(text.to_lowercase())))
}

fn string_contains(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let text = expect_string(&args.named("self"), "contains")?;
    let needle = expect_string(&args.get(0), "contains")?;
    Ok(LabeledValue::new(text.contains(needle.as_ref())))
}
