use crate::{
    ast::{self, FieldKey},
    error::{EvalResult, RuntimeError},
    module::{Module, ModuleError},
    object::ObjectId,
    runtime::{InterpreterContext, Materialized},
    types,
    value::{LabeledValue, Value},
};

use super::{define, define_on, eager, expect_number, param};

const LENGTH: &str = "length";

const LIST_FUNCTIONS: &str = r#"
listProto.forEach = [docs = "Calls the callback with (value, index) for every element"] {
    this.callback = it
    this.i = 0
    while { i < self.length } {
        callback(self.get(i), i)
        i = i + 1
    }
    null
}
listProto.map = [docs = "New list with the callback applied to every element"] {
    this.callback = it
    this.result = list()
    self.forEach { result.add(callback(args.0, args.1)) }
    result
}
listProto.filter = [docs = "New list with the elements the callback accepts"] {
    this.callback = it
    this.result = list()
    self.forEach {
        this.entry = args
        if(callback(entry.0, entry.1)) { result.add(entry.0) }
    }
    result
}
listProto.isEmpty = [docs = "Whether the list has no elements"] {
    self.length == 0
}
"#;

pub(super) fn module() -> Result<Module, ModuleError> {
    Module::new("lists")
        .depends_on(&["objects", "control"])
        .uses_at_runtime(&["operators"])
        .with_expressions([
            define("listProto", ast::invocation(ast::identifier("object"), Vec::new())),
            define(
                "list",
                eager(list_new, "Creates a list from the positional arguments", Vec::new()),
            ),
            define_on(
                "listProto",
                "add",
                eager(
                    list_add,
                    "Appends a value to the end of this list",
                    vec![param("self", types::object())],
                ),
            ),
        ])
        .with_source(LIST_FUNCTIONS)
}

fn list_new(args: &Materialized, ctx: &mut InterpreterContext, scope: ObjectId) -> EvalResult<LabeledValue> {
    let proto = ctx.heap.get_field(scope, &FieldKey::name("listProto"));
    let Value::Object(proto) = proto.value else {
        return Err(RuntimeError::invalid_argument("listProto is not initialized").into());
    };
    let id = ctx.heap.alloc(Some(proto));
    let mut length = 0usize;
    for value in args.positional() {
        ctx.heap.set_local_field(id, length.into(), value.clone())?;
        length += 1;
    }
    ctx.heap
        .set_local_field(id, LENGTH.into(), LabeledValue::new(length as f64))?;
    Ok(LabeledValue::new(id))
}

fn list_add(args: &Materialized, ctx: &mut InterpreterContext, _scope: ObjectId) -> EvalResult<LabeledValue> {
    let receiver = args.named("self");
    let Value::Object(id) = receiver.value else {
        return Err(RuntimeError::invalid_argument("add expects a list receiver").into());
    };
    let length = expect_number(&ctx.heap.get_field(id, &FieldKey::name(LENGTH)), "add")?;
    let value = args.get(0);
    ctx.heap
        .set_local_field(id, FieldKey::Index(length as usize), value.clone())?;
    ctx.heap
        .set_local_field(id, LENGTH.into(), LabeledValue::new(length + 1.0))?;
    Ok(value)
}
