use diagrammar::{
    ast::FieldKey,
    object::Heap,
    types::{self, Type, TypeMismatch},
    Interpreter, LabeledValue, RuntimeErrorKind, Value,
};

fn key(name: &str) -> FieldKey {
    FieldKey::name(name)
}

#[test]
fn writing_null_removes_field() {
    let mut heap = Heap::new();
    let id = heap.alloc_object();
    heap.set_local_field(id, key("x"), LabeledValue::new(1.0))
        .expect("plain field write");
    assert_eq!(heap.get_field(id, &key("x")).value, Value::Number(1.0));

    heap.set_local_field(id, key("x"), LabeledValue::null())
        .expect("null write");
    assert!(heap.own_entries(id).is_empty());
    assert!(heap.get_field(id, &key("x")).value.is_null());
}

#[test]
fn set_field_overwrites_owning_ancestor() {
    let mut heap = Heap::new();
    let parent = heap.alloc_object();
    let child = heap.alloc(Some(parent));
    heap.set_local_field(parent, key("count"), LabeledValue::new(1.0))
        .expect("parent write");

    heap.set_field(child, key("count"), LabeledValue::new(2.0))
        .expect("chain write");
    assert!(heap.own_entries(child).is_empty());
    assert_eq!(heap.get_local_field(parent, &key("count")).value, Value::Number(2.0));

    heap.set_local_field(child, key("count"), LabeledValue::new(3.0))
        .expect("local write");
    assert_eq!(heap.get_field(child, &key("count")).value, Value::Number(3.0));
    assert_eq!(heap.get_field(parent, &key("count")).value, Value::Number(2.0));
}

#[test]
fn proto_loops_are_rejected_and_rolled_back() {
    let mut heap = Heap::new();
    let a = heap.alloc_object();
    let b = heap.alloc(Some(a));
    let object_proto = heap.protos().object;

    let err = heap
        .set_field(a, key("proto"), LabeledValue::new(b))
        .expect_err("closing a loop must fail");
    assert_eq!(err, RuntimeErrorKind::ProtoLoop);
    assert_eq!(heap.proto_of(a), Some(object_proto));

    let err = heap
        .set_field(a, key("proto"), LabeledValue::new(a))
        .expect_err("self proto must fail");
    assert_eq!(err, RuntimeErrorKind::ProtoLoop);
    assert_eq!(heap.proto_of(a), Some(object_proto));
}

#[test]
fn proto_field_reads_and_clears_link() {
    let mut heap = Heap::new();
    let parent = heap.alloc_object();
    let child = heap.alloc(Some(parent));
    assert_eq!(heap.get_field(child, &key("proto")).value, Value::Object(parent));

    heap.set_local_field(child, key("proto"), LabeledValue::null())
        .expect("clearing proto");
    assert_eq!(heap.proto_of(child), None);
    assert!(heap.get_field(child, &key("proto")).value.is_null());

    let err = heap
        .set_local_field(child, key("proto"), LabeledValue::new(3.0))
        .expect_err("numbers cannot be protos");
    assert_eq!(err, RuntimeErrorKind::InvalidProto);
}

#[test]
fn simple_values_read_through_shared_protos() {
    let mut heap = Heap::new();
    let number_proto = heap.protos().number;
    heap.set_local_field(number_proto, key("unit"), LabeledValue::new("px"))
        .expect("proto write");

    let five = Value::Number(5.0);
    assert_eq!(
        heap.get_value_field(&five, &key("unit")).expect("read").value,
        Value::string("px")
    );
    assert_eq!(
        heap.set_value_field(&five, key("proto"), LabeledValue::null(), true),
        Err(RuntimeErrorKind::SimpleProto)
    );
    assert!(matches!(
        heap.get_value_field(&Value::Null, &key("unit")),
        Err(RuntimeErrorKind::NullAccess)
    ));
}

#[test]
fn visible_keys_list_nearest_first() {
    let mut heap = Heap::new();
    let parent = heap.alloc_object();
    let child = heap.alloc(Some(parent));
    heap.set_local_field(parent, key("shared"), LabeledValue::new(1.0))
        .expect("write");
    heap.set_local_field(parent, key("inherited"), LabeledValue::new(1.0))
        .expect("write");
    heap.set_local_field(child, key("own"), LabeledValue::new(1.0))
        .expect("write");
    heap.set_local_field(child, key("shared"), LabeledValue::new(2.0))
        .expect("write");

    assert_eq!(
        heap.visible_keys(&Value::Object(child)),
        vec![key("own"), key("shared"), key("inherited")]
    );
}

#[test]
fn structural_types_report_field_paths() {
    let mut heap = Heap::new();
    let point = heap.alloc_object();
    heap.set_local_field(point, key("x"), LabeledValue::new("left"))
        .expect("write");

    let ty = types::object_of(vec![(key("x"), types::number())]);
    let mismatch = ty
        .matches(&Value::Object(point), &heap)
        .expect_err("string is not a number");
    assert_eq!(
        mismatch,
        TypeMismatch {
            expected: "number".into(),
            path: vec!["x".into()],
        }
    );
    assert_eq!(
        mismatch.into_error(&FieldKey::Index(0)),
        RuntimeErrorKind::TypeMismatch {
            path: "0.x".into(),
            expected: "number".into(),
        }
    );

    assert!(types::optional(types::number()).matches(&Value::Null, &heap).is_ok());
    assert_eq!(types::or(vec![types::number(), types::string()]).name(), "number | string");
}

#[test]
fn list_types_check_every_element() {
    let interpreter = Interpreter::new().expect("standard library should load");
    let evaluation = interpreter
        .eval_source("list(1, \"two\", 3)")
        .expect("list builds");
    let heap = &evaluation.context.heap;
    let list = &evaluation.value.value;

    let mismatch = types::list_of(types::number())
        .matches(list, heap)
        .expect_err("second element is a string");
    assert_eq!(mismatch.path, vec!["1".to_string()]);
    assert!(types::list_of(types::any()).matches(list, heap).is_ok());
}

#[test]
fn evaluated_objects_stay_readable() {
    let interpreter = Interpreter::new().expect("standard library should load");
    let evaluation = interpreter
        .eval_source("base = object(kind = \"shape\")\nobject(proto = base, width = 10)")
        .expect("objects build");
    let heap = &evaluation.context.heap;
    let id = evaluation.value.value.as_object().expect("object result");

    assert_eq!(heap.get_field(id, &key("width")).value, Value::Number(10.0));
    assert_eq!(heap.get_field(id, &key("kind")).value, Value::string("shape"));
    assert!(heap.get_local_field(id, &key("kind")).value.is_null());
}

#[test]
fn list_types_skip_unstored_indices() {
    let interpreter = Interpreter::new().expect("standard library should load");
    let evaluation = interpreter
        .eval_source("list(1, null, 3)")
        .expect("list builds");
    let heap = &evaluation.context.heap;
    let list = &evaluation.value.value;
    let mismatch = types::list_of(types::number())
        .matches(list, heap)
        .expect_err("null is not a number");
    assert_eq!(mismatch.path, vec!["1".to_string()]);
    assert!(types::list_of(types::optional(types::number())).matches(list, heap).is_ok());

    let huge = interpreter
        .eval_source("object(length = 1000000000000000000)")
        .expect("object builds");
    let heap = &huge.context.heap;
    assert!(types::list_of(types::any()).matches(&huge.value.value, heap).is_ok());
    let mismatch = types::list_of(types::number())
        .matches(&huge.value.value, heap)
        .expect_err("missing elements read as null");
    assert_eq!(mismatch.path, vec!["0".to_string()]);
}
