use diagrammar::{
    completion::CompletionTransformer, error::Interrupt, executable::Transformer, parser,
    CompletionItem, Interpreter,
};

fn complete(source: &str, offset: usize) -> Option<Vec<CompletionItem>> {
    Interpreter::new()
        .expect("standard library should load")
        .autocomplete(source, offset)
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|item| item.label.as_str()).collect()
}

fn position(items: &[CompletionItem], label: &str) -> usize {
    items
        .iter()
        .position(|item| item.label == label)
        .unwrap_or_else(|| panic!("missing completion {label}"))
}

#[test]
fn completes_fields_after_dot() {
    let source = "obj = object(alpha = 1)\nobj.";
    let items = complete(source, source.len()).expect("cursor is reached");

    assert!(position(&items, "alpha") < position(&items, "forEach"));
    assert!(labels(&items).contains(&"keys"));
    let alpha = &items[position(&items, "alpha")];
    assert_eq!(alpha.insert_value, "alpha");
    assert_eq!((alpha.replace_range.start, alpha.replace_range.end), (28, 28));
}

#[test]
fn replaces_partially_typed_name() {
    let source = "obj = object(alpha = 1)\nobj.al";
    let items = complete(source, source.len()).expect("cursor is reached");
    let alpha = &items[position(&items, "alpha")];
    assert_eq!((alpha.replace_range.start, alpha.replace_range.end), (28, 30));
}

#[test]
fn offers_documentation_of_library_functions() {
    let source = "obj = object()\nobj.";
    let items = complete(source, source.len()).expect("cursor is reached");
    let for_each = &items[position(&items, "forEach")];
    assert_eq!(
        for_each.documentation.as_deref(),
        Some("Calls the callback with (value, key) for every own field")
    );
}

#[test]
fn completes_identifiers_from_scope() {
    let source = "value = 1\nva";
    let items = complete(source, source.len()).expect("cursor is reached");
    let found = labels(&items);
    assert!(found.contains(&"value"));
    assert!(found.contains(&"list"));
    assert!(found.contains(&"objectProto"));
}

#[test]
fn completes_members_of_simple_values() {
    let source = "\"abc\".";
    let items = complete(source, source.len()).expect("cursor is reached");
    assert!(labels(&items).contains(&"toUpperCase"));
}

#[test]
fn stops_before_later_statements_run() {
    let source = "obj = object(alpha = 1)\nobj.\nerror(\"later\")";
    let items = complete(source, 28).expect("cursor is reached before the error");
    assert!(labels(&items).contains(&"alpha"));
}

#[test]
fn returns_none_when_cursor_is_never_evaluated() {
    let source = "f = { obj. }";
    assert!(complete(source, 10).is_none());
}

#[test]
fn plain_runs_report_no_value_when_the_cursor_is_reached() {
    let interpreter = Interpreter::new().expect("standard library should load");
    let source = "obj = object(alpha = 1)\nobj.";
    let ast = parser::parse_tolerant(source).ast.expect("tolerant parse yields a tree");
    let exprs = CompletionTransformer::new(source.len()).transform_all(&ast);

    let outcome = interpreter.run(&exprs);
    assert!(outcome.result.is_none());
    assert!(outcome.error.is_none());

    let (_, raw) = interpreter.run_raw(&exprs);
    assert!(matches!(raw, Err(Interrupt::Completion(_))));
}
