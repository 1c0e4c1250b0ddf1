use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    OperatorIdentifier,
    Number,
    StringStart,
    StringContent,
    InterpolationStart,
    StringEnd,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Semicolon,
    Assign,
    Newline,
    Eof,
}

impl TokenKind {
    /// Tokens after which a `-` belongs to an operator rather than a number.
    fn ends_operand(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::Number
                | TokenKind::StringEnd
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
        )
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text, except for string content where escapes are resolved.
    pub lexeme: String,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Newlines separate statements.
    Default,
    /// Inside `(` or `[`; newlines are plain whitespace.
    NewlineFree,
    /// Inside `${ ... }` of a string literal.
    Interpolation,
    /// Inside `"..."`; holds the offset of the opening quote.
    String(usize),
}

pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub errors: Vec<Diagnostic>,
}

const OPERATOR_CHARS: &str = "!#%&'*+-/:<=>?@\\^|~";

pub fn is_operator_char(ch: char) -> bool {
    OPERATOR_CHARS.contains(ch)
}

pub fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

pub fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

pub struct Lexer<'a> {
    source: &'a str,
    current: usize,
    modes: Vec<Mode>,
    tokens: Vec<Token>,
    errors: Vec<Diagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            current: 0,
            modes: vec![Mode::Default],
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.current += ch.len_utf8();
        Some(ch)
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn collect_while<F>(&mut self, mut predicate: F)
    where
        F: FnMut(char) -> bool,
    {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.bump();
        }
    }

    fn mode(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::Default)
    }

    fn push_mode(&mut self, mode: Mode) {
        self.modes.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        }
    }

    fn last_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|token| token.kind)
    }

    fn push_token(&mut self, kind: TokenKind, start: usize) {
        let end = self.current;
        self.tokens.push(Token {
            kind,
            lexeme: self.source[start..end].to_string(),
            span: SourceSpan { start, end },
        });
    }

    fn error(&mut self, message: impl Into<String>, span: SourceSpan) {
        self.errors
            .push(Diagnostic::new(DiagnosticKind::Lexer, message).with_span(span));
    }

    /// Skips whitespace and comments. Newlines are left in place when they are significant.
    fn skip_whitespace_and_comments(&mut self, newlines_significant: bool) {
        loop {
            let mut progressed = false;

            while let Some(ch) = self.peek() {
                if ch.is_whitespace() && !(ch == '\n' && newlines_significant) {
                    self.bump();
                    progressed = true;
                } else {
                    break;
                }
            }

            if self.peek() == Some('/') {
                match self.peek_second() {
                    Some('/') => {
                        self.collect_while(|ch| ch != '\n');
                        progressed = true;
                    }
                    Some('*') => {
                        self.bump();
                        self.bump();
                        let mut depth = 1;
                        while let Some(ch) = self.bump() {
                            if ch == '/' && self.match_next('*') {
                                depth += 1;
                            } else if ch == '*' && self.match_next('/') {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                        }
                        progressed = true;
                    }
                    _ => {}
                }
            }

            if !progressed {
                break;
            }
        }
    }

    fn identifier(&mut self, start: usize) {
        self.collect_while(is_name_char);
        self.push_token(TokenKind::Identifier, start);
    }

    fn operator_identifier(&mut self, start: usize) {
        while let Some(ch) = self.peek() {
            if !is_operator_char(ch) {
                break;
            }
            if ch == '/' && matches!(self.peek_second(), Some('/' | '*')) {
                break;
            }
            self.bump();
        }
        if &self.source[start..self.current] == "=" {
            self.push_token(TokenKind::Assign, start);
        } else {
            self.push_token(TokenKind::OperatorIdentifier, start);
        }
    }

    fn number_literal(&mut self, start: usize, integer_only: bool) {
        self.collect_while(|ch| ch.is_ascii_digit());
        if !integer_only {
            if self.peek() == Some('.') && self.peek_second().is_some_and(|ch| ch.is_ascii_digit()) {
                self.bump();
                self.collect_while(|ch| ch.is_ascii_digit());
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let rest = &self.source[self.current + 1..];
                let mut chars = rest.chars();
                let exponent_follows = match chars.next() {
                    Some('+' | '-') => chars.next().is_some_and(|ch| ch.is_ascii_digit()),
                    Some(ch) => ch.is_ascii_digit(),
                    None => false,
                };
                if exponent_follows {
                    self.bump();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                    }
                    self.collect_while(|ch| ch.is_ascii_digit());
                }
            }
        }
        self.push_token(TokenKind::Number, start);
    }

    fn string_part(&mut self, opened_at: usize) {
        let start = self.current;
        let mut content = String::new();
        loop {
            match self.peek() {
                None => {
                    self.flush_content(&mut content, start);
                    self.error(
                        "unterminated string literal",
                        SourceSpan::new(opened_at, self.current),
                    );
                    self.pop_mode();
                    return;
                }
                Some('"') => {
                    self.flush_content(&mut content, start);
                    let quote = self.current;
                    self.bump();
                    self.push_token(TokenKind::StringEnd, quote);
                    self.pop_mode();
                    return;
                }
                Some('$') if self.peek_second() == Some('{') => {
                    self.flush_content(&mut content, start);
                    let dollar = self.current;
                    self.bump();
                    self.bump();
                    self.push_token(TokenKind::InterpolationStart, dollar);
                    self.push_mode(Mode::Interpolation);
                    return;
                }
                Some('\\') => {
                    let escape_start = self.current;
                    self.bump();
                    match self.bump() {
                        Some('n') => content.push('\n'),
                        Some('t') => content.push('\t'),
                        Some('r') => content.push('\r'),
                        Some(other @ ('"' | '\\' | '$')) => content.push(other),
                        Some(other) => {
                            self.error(
                                format!("unknown escape sequence `\\{other}`"),
                                SourceSpan::new(escape_start, self.current),
                            );
                            content.push(other);
                        }
                        None => {}
                    }
                }
                Some(ch) => {
                    self.bump();
                    content.push(ch);
                }
            }
        }
    }

    fn flush_content(&mut self, content: &mut String, start: usize) {
        if start == self.current {
            return;
        }
        self.tokens.push(Token {
            kind: TokenKind::StringContent,
            lexeme: std::mem::take(content),
            span: SourceSpan::new(start, self.current),
        });
    }

    pub fn tokenize(mut self) -> LexOutput {
        loop {
            let mode = self.mode();
            if let Mode::String(opened_at) = mode {
                self.string_part(opened_at);
                continue;
            }

            self.skip_whitespace_and_comments(mode == Mode::Default);
            let start = self.current;
            let Some(ch) = self.bump() else {
                if self.modes.contains(&Mode::Interpolation) {
                    self.error(
                        "unterminated string interpolation",
                        SourceSpan::empty(self.current),
                    );
                }
                self.tokens.push(Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    span: SourceSpan::empty(self.current),
                });
                break;
            };

            match ch {
                '\n' => {
                    if !matches!(self.last_kind(), None | Some(TokenKind::Newline)) {
                        self.push_token(TokenKind::Newline, start);
                    }
                }
                ch if is_name_start(ch) => self.identifier(start),
                '0'..='9' => {
                    let after_dot = self.last_kind() == Some(TokenKind::Dot);
                    self.number_literal(start, after_dot);
                }
                '-' if self.peek().is_some_and(|next| next.is_ascii_digit())
                    && !self.last_kind().is_some_and(TokenKind::ends_operand) =>
                {
                    self.number_literal(start, false);
                }
                '"' => {
                    self.push_token(TokenKind::StringStart, start);
                    self.push_mode(Mode::String(start));
                }
                '(' => {
                    self.push_token(TokenKind::LParen, start);
                    self.push_mode(Mode::NewlineFree);
                }
                '[' => {
                    self.push_token(TokenKind::LBracket, start);
                    self.push_mode(Mode::NewlineFree);
                }
                '{' => {
                    self.push_token(TokenKind::LBrace, start);
                    self.push_mode(Mode::Default);
                }
                ')' => {
                    self.push_token(TokenKind::RParen, start);
                    self.pop_mode();
                }
                ']' => {
                    self.push_token(TokenKind::RBracket, start);
                    self.pop_mode();
                }
                '}' => {
                    self.push_token(TokenKind::RBrace, start);
                    self.pop_mode();
                }
                ',' => self.push_token(TokenKind::Comma, start),
                '.' => self.push_token(TokenKind::Dot, start),
                ';' => self.push_token(TokenKind::Semicolon, start),
                ch if is_operator_char(ch) => self.operator_identifier(start),
                other => self.error(
                    format!("unexpected character `{other}`"),
                    SourceSpan::new(start, self.current),
                ),
            }
        }
        LexOutput {
            tokens: self.tokens,
            errors: self.errors,
        }
    }
}

pub fn tokenize(source: &str) -> LexOutput {
    Lexer::new(source).tokenize()
}
