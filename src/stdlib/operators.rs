use crate::{
    ast::ParameterType,
    error::{EvalResult, RuntimeError},
    module::Module,
    object::ObjectId,
    runtime::{InterpreterContext, Materialized},
    types::{self, TypeRef},
    value::{LabeledValue, Value},
};

use super::{define, eager, expect_bool, expect_number, lazy, param, LazyArguments};

fn numeric_pair() -> Vec<ParameterType> {
    vec![param(0, types::number()), param(1, types::number())]
}

fn boolean_operands() -> Vec<ParameterType> {
    let boolean: TypeRef = types::boolean();
    vec![param(0, boolean.clone()), param(1, boolean)]
}

pub(super) fn module() -> Module {
    Module::new("operators")
        .depends_on(&["booleans", "numbers", "strings"])
        .with_expressions([
            define(
                "+",
                eager(
                    op_add,
                    "Adds two numbers, or concatenates when either side is a string",
                    Vec::new(),
                ),
            ),
            define("-", eager(op_sub, "Subtracts two numbers", numeric_pair())),
            define("*", eager(op_mul, "Multiplies two numbers", numeric_pair())),
            define("/", eager(op_div, "Divides two numbers", numeric_pair())),
            define("%", eager(op_rem, "Remainder of a division", numeric_pair())),
            define("<", eager(op_lt, "Less than", numeric_pair())),
            define("<=", eager(op_le, "Less than or equal", numeric_pair())),
            define(">", eager(op_gt, "Greater than", numeric_pair())),
            define(">=", eager(op_ge, "Greater than or equal", numeric_pair())),
            define(
                "==",
                eager(
                    op_eq,
                    "Equality by value for primitives and by identity for objects",
                    Vec::new(),
                ),
            ),
            define("!=", eager(op_ne, "Negated equality", Vec::new())),
            define(
                "&&",
                lazy(op_and, "Logical and; the right side is skipped when the left is false", boolean_operands()),
            ),
            define(
                "||",
                lazy(op_or, "Logical or; the right side is skipped when the left is true", boolean_operands()),
            ),
            define(
                "??",
                lazy(op_coalesce, "The left side unless it is null, otherwise the right side", Vec::new()),
            ),
        ])
}

fn op_add(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (lhs, rhs) = (args.get(0), args.get(1));
    match (&lhs.value, &rhs.value) {
        (Value::Number(a), Value::Number(b)) => Ok(LabeledValue::new(a + b)),
        (Value::String(_), _) | (_, Value::String(_)) => {
            let joined = format!("{}{}", ctx.display(&lhs.value), ctx.display(&rhs.value));
            Ok(LabeledValue::new(Value::string(joined)))
        }
        (a, b) => Err(RuntimeError::invalid_argument(format!(
            "cannot add {} and {}",
            a.type_name(),
            b.type_name()
        ))
        .into()),
    }
}

fn numbers(args: &Materialized, name: &str) -> EvalResult<(f64, f64)> {
    Ok((expect_number(&args.get(0), name)?, expect_number(&args.get(1), name)?))
}

fn op_sub(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (a, b) = numbers(args, "-")?;
    Ok(LabeledValue::new(a - b))
}

fn op_mul(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (a, b) = numbers(args, "*")?;
    Ok(LabeledValue::new(a * b))
}

fn op_div(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (a, b) = numbers(args, "/")?;
    Ok(LabeledValue::new(a / b))
}

fn op_rem(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (a, b) = numbers(args, "%")?;
    Ok(LabeledValue::new(a % b))
}

fn op_lt(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (a, b) = numbers(args, "<")?;
    Ok(LabeledValue::new(a < b))
}

fn op_le(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (a, b) = numbers(args, "<=")?;
    Ok(LabeledValue::new(a <= b))
}

fn op_gt(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (a, b) = numbers(args, ">")?;
    Ok(LabeledValue::new(a > b))
}

fn op_ge(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let (a, b) = numbers(args, ">=")?;
    Ok(LabeledValue::new(a >= b))
}

fn op_eq(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(args.get(0).value == args.get(1).value))
}

fn op_ne(args: &Materialized, _ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    Ok(LabeledValue::new(args.get(0).value != args.get(1).value))
}

fn op_and(args: &LazyArguments, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let lhs = args.positional(ctx, 0)?;
    if !expect_bool(&lhs, "&&")? {
        return Ok(lhs);
    }
    args.positional(ctx, 1)
}

fn op_or(args: &LazyArguments, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let lhs = args.positional(ctx, 0)?;
    if expect_bool(&lhs, "||")? {
        return Ok(lhs);
    }
    args.positional(ctx, 1)
}

fn op_coalesce(args: &LazyArguments, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let lhs = args.positional(ctx, 0)?;
    if !lhs.value.is_null() {
        return Ok(lhs);
    }
    args.positional(ctx, 1)
}
