use diagrammar::{
    module::{initialization_order, Module, ModuleError},
    stdlib, DiagrammarError, Interpreter, Value,
};

fn names(modules: &[&Module]) -> Vec<String> {
    modules.iter().map(|module| module.name.clone()).collect()
}

#[test]
fn orders_dependencies_first() {
    let modules = vec![
        Module::new("shapes").depends_on(&["geometry"]),
        Module::new("geometry"),
        Module::new("style"),
    ];
    let order = initialization_order(&modules).expect("acyclic modules order");
    assert_eq!(names(&order), vec!["geometry", "shapes", "style"]);
}

#[test]
fn rejects_hard_cycles() {
    let modules = vec![
        Module::new("a").depends_on(&["b"]),
        Module::new("b").depends_on(&["a"]),
    ];
    let err = initialization_order(&modules).expect_err("cycle must be rejected");
    assert_eq!(err, ModuleError::Cycle(vec!["a".into(), "b".into(), "a".into()]));
    assert_eq!(err.to_string(), "dependency cycle between modules: a -> b -> a");
}

#[test]
fn rejects_unknown_and_duplicate_modules() {
    let unknown = vec![Module::new("a").uses_at_runtime(&["missing"])];
    assert_eq!(
        initialization_order(&unknown).expect_err("unknown dependency"),
        ModuleError::UnknownDependency {
            module: "a".into(),
            dependency: "missing".into(),
        }
    );

    let duplicate = vec![Module::new("a"), Module::new("a")];
    assert_eq!(
        initialization_order(&duplicate).expect_err("duplicate module"),
        ModuleError::Duplicate("a".into())
    );
}

#[test]
fn runtime_dependencies_may_point_back() {
    let modules = vec![
        Module::new("a")
            .uses_at_runtime(&["b"])
            .with_source("fa = { fb() }")
            .expect("module a parses"),
        Module::new("b")
            .depends_on(&["a"])
            .with_source("fb = { 42 }")
            .expect("module b parses"),
    ];
    let interpreter = Interpreter::with_modules(modules).expect("runtime cycles are allowed");
    assert_eq!(interpreter.module_names().collect::<Vec<_>>(), vec!["a", "b"]);

    let evaluation = interpreter.eval_source("fa()").expect("fa runs");
    assert_eq!(evaluation.value.value, Value::Number(42.0));
}

#[test]
fn interpreter_surfaces_module_errors() {
    let modules = vec![
        Module::new("a").depends_on(&["b"]),
        Module::new("b").depends_on(&["a"]),
    ];
    match Interpreter::with_modules(modules) {
        Err(DiagrammarError::Module(ModuleError::Cycle(_))) => {}
        Err(other) => panic!("expected cycle error, received {other}"),
        Ok(_) => panic!("expected cycle error"),
    }
}

#[test]
fn source_modules_are_frozen() {
    let module = Module::new("m")
        .with_source("x = 1 + 2")
        .expect("module parses");
    assert_eq!(module.expressions.len(), 1);
    assert!(!module.expressions[0].is_editable());

    let err = Module::new("broken")
        .with_source("x = (")
        .expect_err("invalid source");
    assert!(matches!(err, ModuleError::Source { ref module, .. } if module == "broken"));
}

#[test]
fn standard_library_initializes_in_dependency_order() {
    let modules = stdlib::modules().expect("standard library parses");
    let order = names(&initialization_order(&modules).expect("standard library orders"));
    let position = |name: &str| {
        order
            .iter()
            .position(|module| module == name)
            .unwrap_or_else(|| panic!("missing module {name}"))
    };
    assert!(position("objects") < position("lists"));
    assert!(position("control") < position("lists"));
    assert!(position("booleans") < position("lists"));
}
