use crate::{
    error::EvalResult,
    module::{Module, ModuleError},
    object::ObjectId,
    runtime::{InterpreterContext, Materialized},
    types,
    value::{LabeledValue, Value},
};

use super::{define, define_on, eager, expect_key, key_value, param};

const KEYS: &str = r#"
objectProto.keys = [docs = "Lists the own keys of this object"] {
    this.result = list()
    self.forEach { result.add(args.1) }
    result
}
"#;

pub(super) fn module() -> Result<Module, ModuleError> {
    Module::new("objects")
        .uses_at_runtime(&["lists"])
        .with_expressions([
            define(
                "object",
                eager(
                    object_new,
                    "Creates an object from the given fields; positional arguments become indexed fields",
                    Vec::new(),
                ),
            ),
            define_on(
                "objectProto",
                "forEach",
                eager(
                    object_for_each,
                    "Calls the callback with (value, key) for every own field",
                    vec![param("self", types::object()), param(0, types::function())],
                ),
            ),
            define_on(
                "objectProto",
                "get",
                eager(
                    object_get,
                    "Reads a field by name or index",
                    vec![param(0, types::or(vec![types::string(), types::number()]))],
                ),
            ),
            define_on(
                "objectProto",
                "set",
                eager(
                    object_set,
                    "Sets an own field by name or index and returns the value",
                    vec![param(0, types::or(vec![types::string(), types::number()]))],
                ),
            ),
            define_on(
                "objectProto",
                "has",
                eager(
                    object_has,
                    "Whether the field is present on this object or its protos",
                    vec![param(0, types::or(vec![types::string(), types::number()]))],
                ),
            ),
        ])
        .with_source(KEYS)
}

fn object_new(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let id = ctx.heap.alloc_object();
    for (index, value) in args.positional().enumerate() {
        ctx.heap.set_local_field(id, index.into(), value.clone())?;
    }
    for (name, value) in args.named_entries() {
        ctx.heap.set_local_field(id, name.into(), value.clone())?;
    }
    Ok(LabeledValue::new(id))
}

fn object_for_each(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let receiver = args.named("self");
    let callback = args.get(0);
    let Value::Object(id) = receiver.value else {
        return Ok(LabeledValue::null());
    };
    for (key, value) in ctx.heap.own_entries(id) {
        ctx.call(&callback, vec![value, LabeledValue::new(key_value(&key))])?;
    }
    Ok(LabeledValue::null())
}

fn object_get(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let key = expect_key(&args.get(0), "get")?;
    Ok(ctx.heap.get_value_field(&args.named("self").value, &key)?)
}

fn object_set(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let key = expect_key(&args.get(0), "set")?;
    let value = args.get(1);
    ctx.heap
        .set_value_field(&args.named("self").value, key, value.clone(), true)?;
    Ok(value)
}

fn object_has(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let key = expect_key(&args.get(0), "has")?;
    let field = ctx.heap.get_value_field(&args.named("self").value, &key)?;
    Ok(LabeledValue::new(!field.value.is_null()))
}
