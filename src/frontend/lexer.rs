//! Lexer for Xi Script
//!
//! Converts source code into a stream of tokens. Lexing is fail-fast: the
//! first invalid character or unterminated string produces a single `Error`
//! token and stops the scan.

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    line: usize,
    column: usize,
    /// Line and column where the current token started
    token_line: usize,
    token_column: usize,
    error: Option<Error>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            column: 1,
            token_line: 1,
            token_column: 1,
            error: None,
        }
    }

    // ==================== Diagnostics ====================

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The error message, empty when lexing succeeded
    pub fn error(&self) -> &str {
        self.error.as_ref().map_or("", |e| e.message())
    }

    /// Line of the error, or -1 when there is none
    pub fn error_line(&self) -> i64 {
        self.error.as_ref().map_or(-1, |e| e.line() as i64)
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    // ==================== Character Helpers ====================

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.token_line, self.token_column)
    }

    /// Token whose lexeme is the raw source text
    fn make_token(&self, kind: TokenKind) -> Token {
        let text: String = self.source[self.start..self.pos].iter().collect();
        Token::new(kind, text, self.make_span())
    }

    fn error_token(&mut self, message: impl Into<String>) -> Token {
        let message = message.into();
        let span = self.make_span();
        self.error = Some(Error::lex(message.clone(), span));
        Token::new(TokenKind::Error, message, span)
    }

    // ==================== Skipping ====================

    /// Skip whitespace and `--` comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '-' if self.peek_next() == Some('-') => {
                    self.advance();
                    self.advance();
                    self.skip_comment();
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some('[') && self.peek_next() == Some('[') {
            self.advance();
            self.advance();
            while !self.is_at_end() {
                if self.peek() == Some(']') && self.peek_next() == Some(']') {
                    self.advance();
                    self.advance();
                    return;
                }
                self.advance();
            }
        } else {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
        }
    }

    // ==================== Scanners ====================

    fn consume_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Scan a number literal: `12`, `3.5`, `.5`, `1e10`, `2.5E-3`
    fn read_number(&mut self) -> Token {
        if self.peek() == Some('.') {
            self.advance();
        } else {
            self.consume_digits();
            if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.consume_digits();

        if matches!(self.peek(), Some('e') | Some('E')) {
            let digit_follows = match self.peek_next() {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => self.source.get(self.pos + 2).is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            };
            if digit_follows {
                self.advance();
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.advance();
                }
                self.consume_digits();
            }
        }

        self.make_token(TokenKind::Number)
    }

    /// Scan a string literal. The opening quote has already been consumed.
    fn read_string(&mut self, quote: char) -> Token {
        let mut value = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => return self.error_token("Unterminated string"),
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let Some(escaped) = self.advance() else {
                        return self.error_token("Unterminated string");
                    };
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Token::new(TokenKind::String, value, self.make_span())
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Identifier);
        Token::new(kind, text, self.make_span())
    }

    /// Scan the next token. Returns `EndOfFile` at the end of input.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        self.start = self.pos;
        self.token_line = self.line;
        self.token_column = self.column;

        let Some(c) = self.peek() else {
            return Token::eof(self.make_span());
        };

        if c.is_ascii_digit() || (c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit())) {
            return self.read_number();
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return self.read_identifier();
        }

        self.advance();
        let kind = match c {
            '"' | '\'' => return self.read_string(c),
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '#' => TokenKind::Hash,
            '.' => {
                if self.match_char('.') {
                    TokenKind::Concat
                } else {
                    TokenKind::Dot
                }
            }
            '=' => {
                if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '~' => {
                if self.match_char('=') {
                    TokenKind::NotEqual
                } else {
                    return self.error_token("Unexpected character '~'");
                }
            }
            '<' => {
                if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            other => return self.error_token(format!("Unexpected character '{}'", other)),
        };

        self.make_token(kind)
    }

    /// Tokenize the entire source. The result ends with `EndOfFile`, or with
    /// a single `Error` token if lexing failed (see [`Lexer::has_error`]).
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = matches!(token.kind, TokenKind::EndOfFile | TokenKind::Error);
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

/// Tokenize `source`, turning a lexical error into an `Err`
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    match lexer.take_error() {
        Some(err) => Err(err),
        None => Ok(tokens),
    }
}
