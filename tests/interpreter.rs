use diagrammar::{
    executable::to_executable,
    parser,
    runtime::Evaluation,
    DiagrammarError, Interpreter, InterpreterConfig, RuntimeError, RuntimeErrorKind, Value,
};

fn interpreter() -> Interpreter {
    Interpreter::new().expect("standard library should load")
}

fn eval(source: &str) -> Evaluation {
    interpreter()
        .eval_source(source)
        .expect("evaluation should succeed")
}

fn eval_runtime_error(source: &str) -> RuntimeError {
    match interpreter().eval_source(source) {
        Ok(evaluation) => panic!("expected error, received value {}", evaluation.display()),
        Err(DiagrammarError::Runtime(err)) => err,
        Err(other) => panic!("expected runtime error, received {other}"),
    }
}

fn expect_number(evaluation: &Evaluation) -> f64 {
    match evaluation.value.value {
        Value::Number(n) => n,
        ref other => panic!("expected number, found {}", other.type_name()),
    }
}

fn expect_bool(evaluation: &Evaluation) -> bool {
    match evaluation.value.value {
        Value::Boolean(b) => b,
        ref other => panic!("expected boolean, found {}", other.type_name()),
    }
}

fn expect_string(evaluation: &Evaluation) -> String {
    match &evaluation.value.value {
        Value::String(text) => text.to_string(),
        other => panic!("expected string, found {}", other.type_name()),
    }
}

#[test]
fn operators_chain_left_to_right() {
    assert_eq!(expect_number(&eval("1 + 2 * 3")), 9.0);
    assert_eq!(expect_number(&eval("x = 5\nx - 2")), 3.0);
}

#[test]
fn interpolates_strings() {
    let value = eval("name = \"world\"\n\"hello ${name}!\"");
    assert_eq!(expect_string(&value), "hello world!");
    assert_eq!(expect_string(&eval("\"sum: ${1 + 2}\"")), "sum: 3");
}

#[test]
fn closures_keep_their_defining_scope() {
    let value = eval(
        r#"
makeCounter = {
    this.count = 0
    { count = count + 1 }
}
counter = makeCounter()
counter()
counter()
"#,
    );
    assert_eq!(expect_number(&value), 2.0);
}

#[test]
fn scope_is_lexical_not_dynamic() {
    let value = eval(
        r#"
x = "global"
reader = { x }
wrapper = {
    this.x = "local"
    reader()
}
wrapper()
"#,
    );
    assert_eq!(expect_string(&value), "global");
}

#[test]
fn untargeted_assignment_updates_outer_binding() {
    let value = eval(
        r#"
total = 0
add = { total = total + it }
add(5)
add(7)
total
"#,
    );
    assert_eq!(expect_number(&value), 12.0);
}

#[test]
fn top_level_this_is_the_global_scope() {
    assert_eq!(expect_number(&eval("this.x = 1\nx")), 1.0);
    assert_eq!(expect_number(&eval("this.seen = list()\nseen.add(3)\nseen.length")), 1.0);
}

#[test]
fn targeted_assignment_shadows_locally() {
    assert_eq!(
        expect_number(&eval("value = 1\nf = { this.value = 2; value }\nf()")),
        2.0
    );
    assert_eq!(
        expect_number(&eval("value = 1\nf = { this.value = 2; value }\nf()\nvalue")),
        1.0
    );
}

#[test]
fn logical_operators_short_circuit() {
    assert!(!expect_bool(&eval("false && error(\"boom\")")));
    assert!(expect_bool(&eval("true || error(\"boom\")")));
    assert!(expect_bool(&eval("true && true")));
}

#[test]
fn logical_operators_check_evaluated_operands() {
    let err = eval_runtime_error("1 && true");
    assert_eq!(
        err.kind,
        RuntimeErrorKind::TypeMismatch {
            path: "0".into(),
            expected: "boolean".into(),
        }
    );
    let err = eval_runtime_error("false || \"yes\"");
    assert_eq!(
        err.kind,
        RuntimeErrorKind::TypeMismatch {
            path: "1".into(),
            expected: "boolean".into(),
        }
    );
    assert!(!expect_bool(&eval("false && 1")));
}

#[test]
fn if_selects_branches() {
    assert_eq!(expect_number(&eval("if(true, {1}, {2})")), 1.0);
    assert_eq!(expect_number(&eval("if(false, {1}, {2})")), 2.0);
    assert!(eval("if(false, {1})").value.value.is_null());
    assert_eq!(expect_string(&eval("if(1 < 2) { \"yes\" } { \"no\" }")), "yes");
}

#[test]
fn while_returns_last_body_value() {
    let value = eval("i = 0\nwhile { i < 5 } { i = i + 1 }");
    assert_eq!(expect_number(&value), 5.0);
}

#[test]
fn endless_loop_hits_step_budget() {
    let interpreter = interpreter().with_config(InterpreterConfig::default().with_max_steps(1_000));
    let err = match interpreter.eval_source("while { true } { 1 }") {
        Err(DiagrammarError::Runtime(err)) => err,
        other => panic!("expected step limit error, received {other:?}"),
    };
    assert_eq!(err.kind, RuntimeErrorKind::StepLimitExceeded { max: 1_000 });
    assert!(err.is_fatal());
}

#[test]
fn unbounded_recursion_hits_depth_limit() {
    let config = InterpreterConfig {
        max_depth: 50,
        ..InterpreterConfig::default()
    };
    let interpreter = interpreter().with_config(config);
    let err = match interpreter.eval_source("f = { f() }\nf()") {
        Err(DiagrammarError::Runtime(err)) => err,
        other => panic!("expected depth limit error, received {other:?}"),
    };
    assert_eq!(err.kind, RuntimeErrorKind::DepthLimitExceeded { max: 50 });
}

#[test]
fn user_errors_point_at_the_call() {
    let err = eval_runtime_error("x = 1\nerror(\"boom\")");
    assert_eq!(err.kind, RuntimeErrorKind::User("boom".into()));
    let span = err.first_span().expect("error should carry a span");
    assert_eq!((span.start, span.end), (6, 19));
    assert!(!err.is_fatal());
}

#[test]
fn reports_null_access_and_bad_calls() {
    assert_eq!(eval_runtime_error("missing.field").kind, RuntimeErrorKind::NullAccess);
    assert_eq!(eval_runtime_error("x = 5\nx()").kind, RuntimeErrorKind::NotCallable);
}

#[test]
fn validates_native_argument_types() {
    let err = eval_runtime_error("1 - \"a\"");
    assert_eq!(
        err.kind,
        RuntimeErrorKind::TypeMismatch {
            path: "1".into(),
            expected: "number".into(),
        }
    );
}

#[test]
fn destructures_indexed_fields() {
    assert_eq!(expect_number(&eval("(a, b) = list(1, 2)\na + b")), 3.0);
}

#[test]
fn binds_named_arguments_and_it() {
    assert_eq!(expect_number(&eval("f = { args.x + args.y }\nf(x = 1, y = 2)")), 3.0);
    assert_eq!(expect_number(&eval("double = { it * 2 }\ndouble(21)")), 42.0);
}

#[test]
fn list_helpers_work() {
    assert_eq!(expect_number(&eval("list(1, 2, 3).map { it * 2 }.get(2)")), 6.0);
    assert_eq!(
        expect_number(&eval("list(1, 2, 3, 4).filter { it % 2 == 0 }.length")),
        2.0
    );
    assert!(expect_bool(&eval("list().isEmpty()")));
    assert_eq!(expect_number(&eval("l = list()\nl.add(4)\nl.add(5)\nl.length")), 2.0);
}

#[test]
fn list_helpers_pass_null_elements_through() {
    assert!(eval("list(null, 1).map { it }.get(0)").value.value.is_null());
    assert_eq!(expect_number(&eval("list(null, 1).map { it ?? 7 }.get(0)")), 7.0);
    assert_eq!(
        expect_number(&eval("list(null, 1, null).filter { it == null }.length")),
        2.0
    );
    assert!(eval("list(null, 1).filter { true }.get(0)").value.value.is_null());
    assert_eq!(
        expect_number(&eval("list(1, null, 2).filter { it != null }.get(1)")),
        2.0
    );
}

#[test]
fn object_helpers_work() {
    assert_eq!(expect_number(&eval("o = object(a = 1, b = 2)\no.keys().length")), 2.0);
    assert_eq!(expect_string(&eval("o = object(a = 1, b = 2)\no.keys().get(0)")), "a");
    assert!(!expect_bool(&eval("o = object(x = 1)\no.x = null\no.has(\"x\")")));
    assert_eq!(expect_number(&eval("o = object()\no.set(\"y\", 3)\no.y")), 3.0);
}

#[test]
fn protos_provide_inherited_methods() {
    let value = eval(
        r#"
base = object(greet = { "hi " + self.name })
child = object(proto = base, name = "ann")
child.greet()
"#,
    );
    assert_eq!(expect_string(&value), "hi ann");
}

#[test]
fn rejects_proto_loops() {
    let err = eval_runtime_error("a = object()\nb = object(proto = a)\na.proto = b");
    assert_eq!(err.kind, RuntimeErrorKind::ProtoLoop);
    assert!(err.is_fatal());
}

#[test]
fn primitives_delegate_to_their_protos() {
    assert_eq!(expect_number(&eval("3.7.floor()")), 3.0);
    assert_eq!(expect_number(&eval("min(3, 1, 2)")), 1.0);
    assert_eq!(expect_string(&eval("\"abc\".toUpperCase()")), "ABC");
    assert!(expect_bool(&eval("\"hello\".contains(\"ell\")")));
    assert_eq!(expect_number(&eval("\"héllo\".length()")), 5.0);
    assert_eq!(expect_string(&eval("string(42)")), "42");
}

#[test]
fn equality_and_coalescing() {
    assert!(expect_bool(&eval("o = object()\no == o")));
    assert!(!expect_bool(&eval("object() == object()")));
    assert!(expect_bool(&eval("\"a\" == \"a\"")));
    assert_eq!(expect_number(&eval("missing ?? 5")), 5.0);
    assert!(expect_bool(&eval("!(1 == 2)")));
}

#[test]
fn reprinted_and_tolerant_parses_evaluate_identically() {
    let source = "a = object(x = 3)\nb = a.x * 2 + 1\nb - a.x";
    let interpreter = interpreter();
    let run = |ast: Vec<diagrammar::ast::ExprRef>| {
        let outcome = interpreter.run(&to_executable(&ast, true));
        assert!(outcome.error.is_none(), "run failed: {:?}", outcome.error);
        outcome.result.expect("run should produce a value").value
    };

    let parsed = parser::parse(source).ast.expect("source parses");
    let printed = parsed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    let reparsed = parser::parse(&printed).ast.expect("printed program parses");
    let tolerant = parser::parse_tolerant(source).ast.expect("tolerant parse yields a tree");

    let expected = run(parsed);
    assert_eq!(expected, Value::Number(4.0));
    assert_eq!(run(reparsed), expected);
    assert_eq!(run(tolerant), expected);
}

#[test]
fn lowering_without_source_links_keeps_results() {
    let interpreter = interpreter();
    let lowered = |source: &str, retain_source: bool| {
        let ast = parser::parse(source).ast.expect("source parses");
        interpreter.run(&to_executable(&ast, retain_source))
    };

    let source = "a = object(x = 3)\nb = a.x * 2 + 1\nb - a.x";
    let linked = lowered(source, true);
    let bare = lowered(source, false);
    assert!(linked.error.is_none() && bare.error.is_none());
    let linked = linked.result.expect("linked run yields a value").value;
    assert_eq!(linked, Value::Number(4.0));
    assert_eq!(bare.result.expect("bare run yields a value").value, linked);

    let failing = "a = object()\na.missing.field";
    let linked = lowered(failing, true).error.expect("linked run fails");
    let bare = lowered(failing, false).error.expect("bare run fails");
    assert_eq!(bare.kind, linked.kind);
    assert_eq!(bare.kind, RuntimeErrorKind::NullAccess);
    assert!(linked.first_span().is_some());
    assert!(bare.first_span().is_none());
}

#[test]
fn runs_are_isolated() {
    let interpreter = interpreter();
    interpreter
        .eval_source("leaked = 1")
        .expect("first run succeeds");
    let second = interpreter
        .eval_source("leaked")
        .expect("second run succeeds");
    assert!(second.value.value.is_null());
}
