use diagrammar::{
    ast::{ExprKind, ExprRef, FieldKey, Literal},
    lexer::{self, TokenKind},
    parser,
};

fn parse_ok(source: &str) -> Vec<ExprRef> {
    let output = parser::parse(source);
    assert!(
        !output.has_errors(),
        "unexpected errors: {:?}",
        output.errors().collect::<Vec<_>>()
    );
    output.ast.expect("strict parse without errors yields a tree")
}

fn single(source: &str) -> ExprRef {
    let mut exprs = parse_ok(source);
    assert_eq!(exprs.len(), 1, "expected one expression in {source:?}");
    exprs.remove(0)
}

fn operator_name(expr: &ExprRef) -> &str {
    match &expr.kind {
        ExprKind::Invocation { target, .. } => match &target.kind {
            ExprKind::Identifier(name) => name,
            other => panic!("expected identifier callee, found {other:?}"),
        },
        other => panic!("expected invocation, found {other:?}"),
    }
}

#[test]
fn tokenizes_negative_numbers_by_context() {
    let kinds = |source: &str| {
        lexer::tokenize(source)
            .tokens
            .into_iter()
            .map(|token| token.kind)
            .collect::<Vec<_>>()
    };
    assert_eq!(kinds("-1"), vec![TokenKind::Number, TokenKind::Eof]);
    assert_eq!(
        kinds("a -1"),
        vec![
            TokenKind::Identifier,
            TokenKind::OperatorIdentifier,
            TokenKind::Number,
            TokenKind::Eof
        ]
    );
}

#[test]
fn newlines_inside_parentheses_are_whitespace() {
    let expr = single("f(1,\n2)");
    match &expr.kind {
        ExprKind::Invocation { args, .. } => assert_eq!(args.len(), 2),
        other => panic!("expected invocation, found {other:?}"),
    }
}

#[test]
fn skips_nested_comments() {
    let exprs = parse_ok("// leading\n1 /* outer /* inner */ still */ + 2");
    assert_eq!(exprs.len(), 1);
    assert_eq!(operator_name(&exprs[0]), "+");
}

#[test]
fn operators_associate_left_without_precedence() {
    let expr = single("1 + 2 * 3");
    assert_eq!(operator_name(&expr), "*");
    match &expr.kind {
        ExprKind::Invocation { args, .. } => assert_eq!(operator_name(&args[0].value), "+"),
        other => panic!("expected invocation, found {other:?}"),
    }
}

#[test]
fn fuses_field_access_and_call() {
    let expr = single("a.b(1, x = 2) { c }");
    match &expr.kind {
        ExprKind::SelfInvocation {
            name,
            args,
            trailing,
            ..
        } => {
            assert_eq!(name, &FieldKey::name("b"));
            assert_eq!(args.len(), 2);
            assert!(args[0].name.is_none());
            assert_eq!(args[1].name.as_deref(), Some("x"));
            assert_eq!(trailing.len(), 1);
        }
        other => panic!("expected self invocation, found {other:?}"),
    }
}

#[test]
fn parses_index_fields() {
    match &single("a.0").kind {
        ExprKind::FieldAccess { name, .. } => assert_eq!(name, &FieldKey::Index(0)),
        other => panic!("expected field access, found {other:?}"),
    }
}

#[test]
fn parses_assignments_and_destructuring() {
    match &single("a.b = 1").kind {
        ExprKind::Assignment { target, name, .. } => {
            assert!(target.is_some());
            assert_eq!(name, &FieldKey::name("b"));
        }
        other => panic!("expected assignment, found {other:?}"),
    }
    match &single("(x, y) = pair").kind {
        ExprKind::Destructuring { names, .. } => assert_eq!(names, &["x", "y"]),
        other => panic!("expected destructuring, found {other:?}"),
    }
}

#[test]
fn parses_decorators() {
    match &single("[docs = \"hi\", pure] { 1 }").kind {
        ExprKind::Function(function) => {
            assert_eq!(
                function.decorators.get("docs"),
                Some(&Some("hi".to_string()))
            );
            assert_eq!(function.decorators.get("pure"), Some(&None));
            assert_eq!(function.body.len(), 1);
        }
        other => panic!("expected function, found {other:?}"),
    }
}

#[test]
fn interpolation_desugars_to_frozen_concatenation() {
    let expr = single("\"a${x}b\"");
    assert_eq!(operator_name(&expr), "+");
    assert!(!expr.is_editable());
    match &expr.kind {
        ExprKind::Invocation { args, .. } => match &args[1].value.kind {
            ExprKind::Literal(Literal::String(text)) => assert_eq!(text, "b"),
            other => panic!("expected trailing text, found {other:?}"),
        },
        other => panic!("expected invocation, found {other:?}"),
    }
}

#[test]
fn strict_mode_rejects_invalid_assignment() {
    let output = parser::parse("1 = 2");
    assert!(output.ast.is_none());
    assert!(output
        .parser_errors
        .iter()
        .any(|diagnostic| diagnostic.message == "invalid assignment target"));
}

#[test]
fn strict_mode_reports_lexing_errors() {
    let output = parser::parse("a = 1 ` 2");
    assert!(output.ast.is_none());
    assert!(!output.lexing_errors.is_empty());
}

#[test]
fn tolerant_mode_recovers_missing_field_name() {
    assert!(parser::parse("obj.").ast.is_none());

    let output = parser::parse_tolerant("obj.");
    assert!(output.has_errors());
    let ast = output.ast.expect("tolerant parse yields a tree");
    match &ast[0].kind {
        ExprKind::FieldAccess {
            name, name_span, ..
        } => {
            assert_eq!(name, &FieldKey::name(""));
            let span = name_span.expect("recovered name keeps a position");
            assert_eq!((span.start, span.end), (4, 4));
        }
        other => panic!("expected field access, found {other:?}"),
    }
}

#[test]
fn tolerant_mode_closes_unbalanced_calls() {
    let output = parser::parse_tolerant("f(1, 2");
    assert!(output.has_errors());
    let ast = output.ast.expect("tolerant parse yields a tree");
    assert_eq!(ast.len(), 1);
    match &ast[0].kind {
        ExprKind::Invocation { args, .. } => assert_eq!(args.len(), 2),
        other => panic!("expected invocation, found {other:?}"),
    }
}

#[test]
fn tolerant_mode_keeps_later_statements() {
    let output = parser::parse_tolerant("a = 1\nb.\nc = 3");
    let ast = output.ast.expect("tolerant parse yields a tree");
    assert_eq!(ast.len(), 3);
}
