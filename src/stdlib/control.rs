use crate::{
    error::{EvalResult, RuntimeError},
    module::Module,
    object::ObjectId,
    runtime::{InterpreterContext, Materialized},
    types,
    value::LabeledValue,
};

use super::{define, eager, expect_bool, expect_string, param};

pub(super) fn module() -> Module {
    Module::new("control")
        .depends_on(&["booleans"])
        .with_expressions([
            define(
                "if",
                eager(
                    control_if,
                    "Calls the second argument if the condition is true, otherwise the optional third",
                    vec![
                        param(0, types::boolean()),
                        param(1, types::function()),
                        param(2, types::optional(types::function())),
                    ],
                ),
            ),
            define(
                "while",
                eager(
                    control_while,
                    "Calls the body while the condition function returns true and yields the last body result",
                    vec![param(0, types::function()), param(1, types::function())],
                ),
            ),
            define(
                "error",
                eager(
                    control_error,
                    "Raises an error with the given message",
                    vec![param(0, types::string())],
                ),
            ),
        ])
}

fn control_if(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let branch = if expect_bool(&args.get(0), "if")? {
        args.get(1)
    } else {
        args.get(2)
    };
    if branch.value.is_null() {
        return Ok(LabeledValue::null());
    }
    ctx.call(&branch, Vec::new())
}

fn control_while(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let condition = args.get(0);
    let body = args.get(1);
    let mut last = LabeledValue::null();
    loop {
        let check = ctx.call(&condition, Vec::new())?;
        if !expect_bool(&check, "while condition")? {
            return Ok(last);
        }
        last = ctx.call(&body, Vec::new())?;
    }
}

fn control_error(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let message = expect_string(&args.get(0), "error")?;
    Err(RuntimeError::user(message.as_ref()).into())
}
