use indexmap::IndexMap;

use crate::{
    ast::{Argument, Decorators, Expr, ExprKind, ExprRef, FieldKey, FunctionExpr, Literal},
    diagnostics::{Diagnostic, DiagnosticKind, SourceSpan},
    lexer::{self, Token, TokenKind},
};

type PResult<T> = Result<T, Diagnostic>;

/// Result of parsing a source text.
///
/// In strict mode `ast` is `None` as soon as any lexing or parse error was
/// recorded. In tolerant mode a best-effort tree is always returned.
#[derive(Debug)]
pub struct ParseOutput {
    pub ast: Option<Vec<ExprRef>>,
    pub lexing_errors: Vec<Diagnostic>,
    pub parser_errors: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.lexing_errors.is_empty() || !self.parser_errors.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.lexing_errors.iter().chain(self.parser_errors.iter())
    }
}

pub fn parse(source: &str) -> ParseOutput {
    parse_with(source, false)
}

/// Parses in fault-tolerant mode, used by autocompletion on incomplete text.
pub fn parse_tolerant(source: &str) -> ParseOutput {
    parse_with(source, true)
}

pub fn parse_with(source: &str, tolerant: bool) -> ParseOutput {
    let lexed = lexer::tokenize(source);
    let mut parser = Parser::new(lexed.tokens, tolerant);
    let program = parser.parse_body(TokenKind::Eof);
    let parser_errors = parser.errors;
    let failed = !lexed.errors.is_empty() || !parser_errors.is_empty();
    ParseOutput {
        ast: if tolerant || !failed { Some(program) } else { None },
        lexing_errors: lexed.errors,
        parser_errors,
    }
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    tolerant: bool,
    errors: Vec<Diagnostic>,
}

impl Parser {
    fn new(tokens: Vec<Token>, tolerant: bool) -> Self {
        Self {
            tokens,
            current: 0,
            tolerant,
            errors: Vec::new(),
        }
    }

    fn parse_body(&mut self, terminator: TokenKind) -> Vec<ExprRef> {
        let mut items = Vec::new();
        loop {
            self.skip_separators();
            if self.check(terminator) || self.check(TokenKind::Eof) {
                break;
            }
            let before = self.current;
            match self.parse_expression() {
                Ok(expr) => {
                    items.push(expr);
                    if !self.at_separator() && !self.check(terminator) && !self.check(TokenKind::Eof)
                    {
                        let diagnostic =
                            self.error_here("expected a newline or `;` after expression");
                        self.errors.push(diagnostic);
                        self.synchronize();
                    }
                }
                Err(diagnostic) => {
                    self.errors.push(diagnostic);
                    self.synchronize();
                }
            }
            if self.current == before && !self.check(terminator) && !self.check(TokenKind::Eof) {
                self.advance();
            }
        }
        items
    }

    /// Skips to the next separator on the current nesting level.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Newline | TokenKind::Semicolon if depth == 0 => return,
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn parse_expression(&mut self) -> PResult<ExprRef> {
        if self.is_destructuring_start() {
            return self.parse_destructuring();
        }
        let lhs = self.parse_operator_expression()?;
        if self.matches(TokenKind::Assign) {
            let equals = self.previous().span;
            let value = self.parse_operator_expression()?;
            return self.make_assignment(lhs, value, equals);
        }
        Ok(lhs)
    }

    fn make_assignment(&mut self, lhs: ExprRef, value: ExprRef, equals: SourceSpan) -> PResult<ExprRef> {
        let span = span_of(&lhs, equals).to(span_of(&value, equals));
        let kind = match &lhs.kind {
            ExprKind::Identifier(name) => ExprKind::Assignment {
                target: None,
                name: FieldKey::Name(name.clone()),
                name_span: lhs.span,
                value,
            },
            ExprKind::FieldAccess {
                target,
                name,
                name_span,
            } => ExprKind::Assignment {
                target: Some(target.clone()),
                name: name.clone(),
                name_span: *name_span,
                value,
            },
            _ => {
                let diagnostic =
                    Diagnostic::new(DiagnosticKind::Parser, "invalid assignment target")
                        .with_span(equals);
                if self.tolerant {
                    self.errors.push(diagnostic);
                    return Ok(value);
                }
                return Err(diagnostic);
            }
        };
        Ok(Expr::spanned(kind, span))
    }

    fn is_destructuring_start(&self) -> bool {
        if self.peek_kind() != TokenKind::LParen {
            return false;
        }
        let mut idx = self.current + 1;
        loop {
            match self.tokens.get(idx).map(|token| token.kind) {
                Some(TokenKind::Identifier) => idx += 1,
                _ => return false,
            }
            match self.tokens.get(idx).map(|token| token.kind) {
                Some(TokenKind::Comma) => idx += 1,
                Some(TokenKind::RParen) => {
                    return self.tokens.get(idx + 1).map(|token| token.kind)
                        == Some(TokenKind::Assign);
                }
                _ => return false,
            }
        }
    }

    fn parse_destructuring(&mut self) -> PResult<ExprRef> {
        let lparen = self.consume(TokenKind::LParen, "expected `(` to start destructuring")?;
        let mut names = Vec::new();
        loop {
            let name = self.consume(TokenKind::Identifier, "expected name in destructuring")?;
            names.push(name.lexeme);
            if !self.matches(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RParen, "expected `)` after destructured names")?;
        let equals = self.consume(TokenKind::Assign, "expected `=` after destructured names")?;
        let value = self.parse_operator_expression()?;
        let span = lparen.span.to(span_of(&value, equals.span));
        Ok(Expr::spanned(ExprKind::Destructuring { names, value }, span))
    }

    /// `a op b op c` parses as `op(op(a, b), c)`.
    fn parse_operator_expression(&mut self) -> PResult<ExprRef> {
        let mut expr = self.parse_field_access_expression()?;
        while self.check(TokenKind::OperatorIdentifier) || self.check(TokenKind::Identifier) {
            let operator = self.advance();
            let callee = Expr::spanned(ExprKind::Identifier(operator.lexeme), operator.span);
            let rhs = self.parse_field_access_expression()?;
            let span = span_of(&expr, operator.span).to(span_of(&rhs, operator.span));
            expr = Expr::spanned(
                ExprKind::Invocation {
                    target: callee,
                    args: vec![Argument::positional(expr), Argument::positional(rhs)],
                    trailing: Vec::new(),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn parse_field_access_expression(&mut self) -> PResult<ExprRef> {
        let mut expr = self.parse_call_expression()?;
        while self.matches(TokenKind::Dot) {
            let dot = self.previous().span;
            let (name, name_span) = self.parse_field_name(dot)?;
            let start = span_of(&expr, dot);
            if self.starts_call_arguments() {
                let (args, trailing, end) = self.parse_call_arguments()?;
                let invocation = Expr::spanned(
                    ExprKind::SelfInvocation {
                        target: expr,
                        name,
                        name_span: Some(name_span),
                        args,
                        trailing,
                    },
                    start.to(end),
                );
                expr = self.parse_call_suffixes(invocation)?;
            } else {
                expr = Expr::spanned(
                    ExprKind::FieldAccess {
                        target: expr,
                        name,
                        name_span: Some(name_span),
                    },
                    start.to(name_span),
                );
            }
        }
        Ok(expr)
    }

    fn parse_field_name(&mut self, dot: SourceSpan) -> PResult<(FieldKey, SourceSpan)> {
        match self.peek_kind() {
            TokenKind::Identifier | TokenKind::OperatorIdentifier => {
                let token = self.advance();
                Ok((FieldKey::Name(token.lexeme), token.span))
            }
            TokenKind::Number => {
                let token = self.advance();
                match token.lexeme.parse::<usize>() {
                    Ok(index) => Ok((FieldKey::Index(index), token.span)),
                    Err(_) => Err(self.error(&token, "field index must be a non-negative integer")),
                }
            }
            _ => {
                let diagnostic = self.error_here("expected field name after `.`");
                if self.tolerant {
                    self.errors.push(diagnostic);
                    Ok((FieldKey::Name(String::new()), SourceSpan::empty(dot.end)))
                } else {
                    Err(diagnostic)
                }
            }
        }
    }

    fn parse_call_expression(&mut self) -> PResult<ExprRef> {
        let primary = self.parse_primary()?;
        self.parse_call_suffixes(primary)
    }

    fn parse_call_suffixes(&mut self, mut expr: ExprRef) -> PResult<ExprRef> {
        while self.starts_call_arguments() {
            let start = span_of(&expr, self.peek().span);
            let (args, trailing, end) = self.parse_call_arguments()?;
            expr = Expr::spanned(
                ExprKind::Invocation {
                    target: expr,
                    args,
                    trailing,
                },
                start.to(end),
            );
        }
        Ok(expr)
    }

    fn starts_call_arguments(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket
        )
    }

    fn parse_call_arguments(&mut self) -> PResult<(Vec<Argument>, Vec<ExprRef>, SourceSpan)> {
        let mut args = Vec::new();
        let mut trailing = Vec::new();
        let mut end = self.peek().span;
        if self.matches(TokenKind::LParen) {
            end = self.previous().span;
            if !self.check(TokenKind::RParen) {
                loop {
                    args.push(self.parse_argument()?);
                    if !self.matches(TokenKind::Comma) || self.check(TokenKind::RParen) {
                        break;
                    }
                }
            }
            end = self.expect_closer(TokenKind::RParen, "expected `)` after arguments")?;
        }
        while matches!(self.peek_kind(), TokenKind::LBrace | TokenKind::LBracket) {
            let function = self.parse_function()?;
            end = span_of(&function, end);
            trailing.push(function);
        }
        Ok((args, trailing, end))
    }

    fn parse_argument(&mut self) -> PResult<Argument> {
        let named = matches!(
            self.peek_kind(),
            TokenKind::Identifier | TokenKind::OperatorIdentifier
        ) && self.peek_next_kind() == TokenKind::Assign;
        if named {
            let name = self.advance();
            self.advance();
            let value = self.parse_operator_expression()?;
            return Ok(Argument::named(name.lexeme, value));
        }
        Ok(Argument::positional(self.parse_operator_expression()?))
    }

    fn parse_primary(&mut self) -> PResult<ExprRef> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Identifier | TokenKind::OperatorIdentifier => {
                self.advance();
                Ok(Expr::spanned(ExprKind::Identifier(token.lexeme), token.span))
            }
            TokenKind::Number => {
                self.advance();
                match token.lexeme.parse::<f64>() {
                    Ok(value) => Ok(Expr::spanned(
                        ExprKind::Literal(Literal::Number(value)),
                        token.span,
                    )),
                    Err(_) => Err(self.error(&token, "invalid number literal")),
                }
            }
            TokenKind::StringStart => self.parse_string(),
            TokenKind::LBrace | TokenKind::LBracket => self.parse_function(),
            TokenKind::LParen => {
                let lparen = self.advance();
                let inner = self.parse_expression()?;
                let rparen = self.expect_closer(TokenKind::RParen, "expected `)` after expression")?;
                Ok(Expr::spanned(
                    ExprKind::Bracket(inner),
                    lparen.span.to(rparen),
                ))
            }
            _ => {
                let diagnostic = self.error(&token, "expected expression");
                if self.tolerant {
                    self.errors.push(diagnostic);
                    let at = SourceSpan::empty(token.span.start);
                    Ok(Expr::spanned(ExprKind::Identifier(String::new()), at))
                } else {
                    Err(diagnostic)
                }
            }
        }
    }

    /// Strings with `${...}` parts desugar into left-nested `+` invocations.
    fn parse_string(&mut self) -> PResult<ExprRef> {
        let open = self.consume(TokenKind::StringStart, "expected string literal")?;
        let mut parts: Vec<ExprRef> = Vec::new();
        let mut text = String::new();
        let mut text_span: Option<SourceSpan> = None;
        let mut interpolated = false;
        let end = loop {
            match self.peek_kind() {
                TokenKind::StringContent => {
                    let content = self.advance();
                    text.push_str(&content.lexeme);
                    text_span = Some(text_span.map_or(content.span, |span| span.to(content.span)));
                }
                TokenKind::InterpolationStart => {
                    let start = self.advance();
                    let literal_span = text_span.take().unwrap_or(SourceSpan::empty(start.span.start));
                    parts.push(Expr::spanned(
                        ExprKind::Literal(Literal::String(std::mem::take(&mut text))),
                        literal_span,
                    ));
                    interpolated = true;
                    parts.push(self.parse_expression()?);
                    self.expect_closer(TokenKind::RBrace, "expected `}` to close interpolation")?;
                }
                TokenKind::StringEnd => break self.advance().span,
                _ => {
                    let diagnostic = self.error_here("unterminated string literal");
                    if !self.tolerant {
                        return Err(diagnostic);
                    }
                    self.errors.push(diagnostic);
                    break SourceSpan::empty(self.previous().span.end);
                }
            }
        };
        let span = open.span.to(end);
        if !interpolated {
            return Ok(Expr::spanned(ExprKind::Literal(Literal::String(text)), span));
        }
        if !text.is_empty() {
            let literal_span = text_span.unwrap_or(SourceSpan::empty(end.start));
            parts.push(Expr::spanned(
                ExprKind::Literal(Literal::String(text)),
                literal_span,
            ));
        }
        let mut parts = parts.into_iter();
        let mut expr = match parts.next() {
            Some(first) => first,
            None => return Ok(Expr::spanned(ExprKind::Literal(Literal::String(String::new())), span)),
        };
        for part in parts {
            expr = Expr::synthesized_at(
                ExprKind::Invocation {
                    target: Expr::synthesized_at(ExprKind::Identifier("+".to_string()), span),
                    args: vec![Argument::positional(expr), Argument::positional(part)],
                    trailing: Vec::new(),
                },
                span,
            );
        }
        Ok(expr)
    }

    fn parse_function(&mut self) -> PResult<ExprRef> {
        let start = self.peek().span;
        let decorators = if self.check(TokenKind::LBracket) {
            self.parse_decorators()?
        } else {
            IndexMap::new()
        };
        self.consume(TokenKind::LBrace, "expected `{` to start function")?;
        let body = self.parse_body(TokenKind::RBrace);
        let end = self.expect_closer(TokenKind::RBrace, "expected `}` to close function")?;
        Ok(Expr::spanned(
            ExprKind::Function(FunctionExpr {
                body,
                decorators,
                types: Vec::new(),
            }),
            start.to(end),
        ))
    }

    fn parse_decorators(&mut self) -> PResult<Decorators> {
        self.consume(TokenKind::LBracket, "expected `[` to start decorators")?;
        let mut decorators = IndexMap::new();
        if !self.check(TokenKind::RBracket) {
            loop {
                let name = self.consume(TokenKind::Identifier, "expected decorator name")?;
                let value = if self.matches(TokenKind::Assign) {
                    Some(self.parse_plain_string()?)
                } else {
                    None
                };
                decorators.insert(name.lexeme, value);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_closer(TokenKind::RBracket, "expected `]` after decorators")?;
        Ok(decorators)
    }

    fn parse_plain_string(&mut self) -> PResult<String> {
        self.consume(TokenKind::StringStart, "expected string value")?;
        let mut text = String::new();
        while self.check(TokenKind::StringContent) {
            text.push_str(&self.advance().lexeme);
        }
        if self.check(TokenKind::InterpolationStart) {
            return Err(self.error_here("decorator values cannot be interpolated"));
        }
        self.consume(TokenKind::StringEnd, "expected closing `\"`")?;
        Ok(text)
    }

    /// Consumes a closing delimiter; tolerant mode pretends it was there.
    fn expect_closer(&mut self, kind: TokenKind, message: &str) -> PResult<SourceSpan> {
        if self.check(kind) {
            return Ok(self.advance().span);
        }
        let diagnostic = self.error_here(message);
        if self.tolerant {
            self.errors.push(diagnostic);
            let end = if self.current == 0 {
                0
            } else {
                self.previous().span.end
            };
            Ok(SourceSpan::empty(end))
        } else {
            Err(diagnostic)
        }
    }

    fn skip_separators(&mut self) {
        while self.at_separator() {
            self.advance();
        }
    }

    fn at_separator(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.current.min(last)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_next_kind(&self) -> TokenKind {
        self.tokens
            .get(self.current + 1)
            .map_or(TokenKind::Eof, |token| token.kind)
    }

    fn is_at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    fn error(&self, token: &Token, message: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticKind::Parser, message.to_string()).with_span(token.span)
    }

    fn error_here(&self, message: &str) -> Diagnostic {
        self.error(self.peek(), message)
    }
}

fn span_of(expr: &ExprRef, fallback: SourceSpan) -> SourceSpan {
    expr.span.unwrap_or(fallback)
}
