//! Parser for Xi Script
//!
//! Recursive descent for statements, precedence climbing for expressions.
//! Parsing stops at the first malformed construct; only that error is
//! reported. [`Parser::parse_with_recovery`] is the one exception, used by
//! tooling that wants every error in a file.

use crate::frontend::ast::*;
use crate::frontend::lexer::tokenize;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{ensure_sufficient_stack, Error, Result};

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    program: Program,
    error: Option<Error>,
}

impl Parser {
    /// Create a parser from pre-tokenized input
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfFile)) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::eof(span));
        }
        Self {
            tokens,
            pos: 0,
            program: Program::new(),
            error: None,
        }
    }

    // ==================== Diagnostics ====================

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The error message, empty when parsing succeeded
    pub fn error(&self) -> &str {
        self.error.as_ref().map_or("", |e| e.message())
    }

    /// Line of the error, or -1 when there is none
    pub fn error_line(&self) -> i64 {
        self.error.as_ref().map_or(-1, |e| e.line() as i64)
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn is_at_end(&self) -> bool {
        self.current_kind() == TokenKind::EndOfFile
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.current_kind() == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| t.kind == kind)
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any(&mut self, kinds: &[TokenKind]) -> Option<TokenKind> {
        let kind = self.current_kind();
        if !self.is_at_end() && kinds.contains(&kind) {
            self.advance();
            Some(kind)
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: &str) -> Error {
        Error::parse(message, self.current().span)
    }

    /// Tokens that close a block
    fn at_block_end(&self) -> bool {
        self.is_at_end()
            || matches!(
                self.current_kind(),
                TokenKind::End | TokenKind::Else | TokenKind::ElseIf | TokenKind::Until
            )
    }

    /// Skip ahead to the next token that can start a statement
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            match self.current_kind() {
                TokenKind::Function
                | TokenKind::Local
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ==================== Parsing Methods ====================

    /// Parse a complete program, stopping at the first error
    pub fn parse(&mut self) -> Result<Program> {
        let result = self.parse_program();
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    fn parse_program(&mut self) -> Result<Program> {
        while !self.is_at_end() {
            if self.match_kind(TokenKind::Semicolon) {
                continue;
            }
            let stmt = self.parse_statement()?;
            self.program.body.push(stmt);
        }
        Ok(std::mem::take(&mut self.program))
    }

    /// Parse the whole input, resynchronizing after each malformed statement.
    /// Returns the statements that parsed plus every error found.
    pub fn parse_with_recovery(&mut self) -> (Program, Vec<Error>) {
        let mut errors = Vec::new();

        while !self.is_at_end() {
            if self.match_kind(TokenKind::Semicolon) {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => self.program.body.push(stmt),
                Err(err) => {
                    errors.push(err);
                    self.synchronize();
                }
            }
        }

        self.error = errors.first().cloned();
        (std::mem::take(&mut self.program), errors)
    }

    fn parse_block(&mut self) -> Result<Block> {
        let mut stmts = Vec::new();
        while !self.at_block_end() {
            if self.match_kind(TokenKind::Semicolon) {
                continue;
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<StmtId> {
        ensure_sufficient_stack(|| self.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<StmtId> {
        let line = self.current().line();

        match self.current_kind() {
            TokenKind::Local => {
                self.advance();
                if self.match_kind(TokenKind::Function) {
                    self.parse_function_decl(true)
                } else {
                    self.parse_local()
                }
            }
            TokenKind::Function => {
                self.advance();
                self.parse_function_decl(false)
            }
            TokenKind::If => {
                self.advance();
                self.parse_if(line)
            }
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expression()?;
                self.expect(TokenKind::Do, "Expected 'do' after while condition")?;
                let body = self.parse_block()?;
                self.expect(TokenKind::End, "Expected 'end' after while body")?;
                Ok(self.program.add_stmt(StmtKind::While { cond, body }, line))
            }
            TokenKind::Repeat => {
                self.advance();
                let body = self.parse_block()?;
                self.expect(TokenKind::Until, "Expected 'until' after repeat body")?;
                let cond = self.parse_expression()?;
                Ok(self.program.add_stmt(StmtKind::Repeat { body, cond }, line))
            }
            TokenKind::For => {
                self.advance();
                self.parse_for()
            }
            TokenKind::Return => {
                self.advance();
                self.parse_return(line)
            }
            TokenKind::Break => {
                self.advance();
                Ok(self.program.add_stmt(StmtKind::Break, line))
            }
            TokenKind::Do => {
                self.advance();
                let body = self.parse_block()?;
                self.expect(TokenKind::End, "Expected 'end' after block")?;
                Ok(self.program.add_stmt(StmtKind::Block(body), line))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_local(&mut self) -> Result<StmtId> {
        let name = self.expect(TokenKind::Identifier, "Expected variable name")?;
        let line = name.line();
        let init = if self.match_kind(TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(self.program.add_stmt(StmtKind::Local { name: name.lexeme, init }, line))
    }

    fn parse_function_decl(&mut self, is_local: bool) -> Result<StmtId> {
        let name = self.expect(TokenKind::Identifier, "Expected function name")?;
        let line = name.line();
        self.expect(TokenKind::LeftParen, "Expected '(' after function name")?;
        let func = self.parse_function_rest(line)?;
        Ok(self.program.add_stmt(StmtKind::FunctionDecl { name: name.lexeme, func, is_local }, line))
    }

    /// Parameters (after the opening paren), body, and closing `end`
    fn parse_function_rest(&mut self, line: usize) -> Result<FuncId> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let param = self.expect(TokenKind::Identifier, "Expected parameter name")?;
                params.push(param.lexeme);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "Expected ')' after parameters")?;

        let body = self.parse_block()?;
        self.expect(TokenKind::End, "Expected 'end' after function body")?;

        Ok(self.program.add_function(FunctionDef { params, body, line }))
    }

    fn parse_if(&mut self, line: usize) -> Result<StmtId> {
        let cond = self.parse_expression()?;
        self.expect(TokenKind::Then, "Expected 'then' after if condition")?;
        let then_body = self.parse_block()?;

        let mut elseifs = Vec::new();
        while self.match_kind(TokenKind::ElseIf) {
            let branch_cond = self.parse_expression()?;
            self.expect(TokenKind::Then, "Expected 'then' after elseif condition")?;
            elseifs.push((branch_cond, self.parse_block()?));
        }

        let else_body = if self.match_kind(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        self.expect(TokenKind::End, "Expected 'end' after if statement")?;
        Ok(self.program.add_stmt(StmtKind::If { cond, then_body, elseifs, else_body }, line))
    }

    fn parse_for(&mut self) -> Result<StmtId> {
        let var = self.expect(TokenKind::Identifier, "Expected variable name")?;
        let line = var.line();

        if self.match_kind(TokenKind::Equal) {
            let start = self.parse_expression()?;
            self.expect(TokenKind::Comma, "Expected ',' after for start value")?;
            let end = self.parse_expression()?;
            let step = if self.match_kind(TokenKind::Comma) {
                Some(self.parse_expression()?)
            } else {
                None
            };

            self.expect(TokenKind::Do, "Expected 'do' in for statement")?;
            let body = self.parse_block()?;
            self.expect(TokenKind::End, "Expected 'end' after for body")?;

            return Ok(self.program.add_stmt(
                StmtKind::NumericFor { var: var.lexeme, start, end, step, body },
                line,
            ));
        }

        if self.check(TokenKind::Comma) || self.check(TokenKind::In) {
            let mut vars = vec![var.lexeme];
            while self.match_kind(TokenKind::Comma) {
                vars.push(self.expect(TokenKind::Identifier, "Expected variable name")?.lexeme);
            }

            self.expect(TokenKind::In, "Expected 'in' in for statement")?;
            let iterator = self.parse_expression()?;
            self.expect(TokenKind::Do, "Expected 'do' in for statement")?;
            let body = self.parse_block()?;
            self.expect(TokenKind::End, "Expected 'end' after for body")?;

            return Ok(self.program.add_stmt(StmtKind::GenericFor { vars, iterator, body }, line));
        }

        Err(self.error_here("Invalid for statement"))
    }

    fn parse_return(&mut self, line: usize) -> Result<StmtId> {
        let mut values = Vec::new();
        if !self.at_block_end() && !self.check(TokenKind::Semicolon) {
            loop {
                values.push(self.parse_expression()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        Ok(self.program.add_stmt(StmtKind::Return(values), line))
    }

    fn parse_expression_statement(&mut self) -> Result<StmtId> {
        let expr = self.parse_expression()?;
        let line = self.program.expr(expr).line;

        if self.match_kind(TokenKind::Equal) {
            let assignable = matches!(
                self.program.expr(expr).kind,
                ExprKind::Identifier(_) | ExprKind::Index { .. } | ExprKind::Member { .. }
            );
            if !assignable {
                return Err(Error::parse("Invalid assignment target", self.previous().span));
            }
            let value = self.parse_expression()?;
            return Ok(self.program.add_stmt(StmtKind::Assign { target: expr, value }, line));
        }

        Ok(self.program.add_stmt(StmtKind::Expr(expr), line))
    }

    // ==================== Expression Parsing ====================

    pub fn parse_expression(&mut self) -> Result<ExprId> {
        ensure_sufficient_stack(|| self.parse_or())
    }

    /// One left-associative binary precedence level
    fn parse_binary_level(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> Result<ExprId>,
    ) -> Result<ExprId> {
        let mut left = operand(self)?;

        while let Some(op) = self.match_any(operators).and_then(BinOp::from_token) {
            let line = self.previous().line();
            let right = operand(self)?;
            left = self.program.add_expr(ExprKind::Binary { op, left, right }, line);
        }

        Ok(left)
    }

    fn parse_or(&mut self) -> Result<ExprId> {
        self.parse_binary_level(&[TokenKind::Or], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<ExprId> {
        self.parse_binary_level(&[TokenKind::And], Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<ExprId> {
        self.parse_binary_level(
            &[
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::EqualEqual,
                TokenKind::NotEqual,
            ],
            Self::parse_concat,
        )
    }

    fn parse_concat(&mut self) -> Result<ExprId> {
        self.parse_binary_level(&[TokenKind::Concat], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<ExprId> {
        self.parse_binary_level(&[TokenKind::Plus, TokenKind::Minus], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<ExprId> {
        self.parse_binary_level(
            &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<ExprId> {
        if let Some(op) = UnaryOp::from_token(self.current_kind()) {
            let line = self.advance().line();
            let operand = ensure_sufficient_stack(|| self.parse_unary())?;
            return Ok(self.program.add_expr(ExprKind::Unary { op, operand }, line));
        }

        self.parse_power()
    }

    /// `^` binds tighter than unary minus on its left and is right-associative
    fn parse_power(&mut self) -> Result<ExprId> {
        let left = self.parse_postfix()?;

        if self.match_kind(TokenKind::Caret) {
            let line = self.previous().line();
            let right = self.parse_unary()?;
            return Ok(self.program.add_expr(ExprKind::Binary { op: BinOp::Pow, left, right }, line));
        }

        Ok(left)
    }

    fn parse_call_args(&mut self, args: &mut Vec<ExprId>) -> Result<()> {
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "Expected ')' after arguments")?;
        Ok(())
    }

    fn parse_postfix(&mut self) -> Result<ExprId> {
        let mut expr = self.parse_primary()?;

        loop {
            let line = self.program.expr(expr).line;

            if self.match_kind(TokenKind::LeftParen) {
                let mut args = Vec::new();
                self.parse_call_args(&mut args)?;
                expr = self.program.add_expr(ExprKind::Call { callee: expr, args }, line);
            } else if self.match_kind(TokenKind::LeftBracket) {
                let index = self.parse_expression()?;
                self.expect(TokenKind::RightBracket, "Expected ']' after index")?;
                expr = self.program.add_expr(ExprKind::Index { object: expr, index }, line);
            } else if self.match_kind(TokenKind::Dot) {
                let name = self.expect(TokenKind::Identifier, "Expected member name")?;
                expr = self.program.add_expr(ExprKind::Member { object: expr, name: name.lexeme }, line);
            } else if self.match_kind(TokenKind::Colon) {
                // obj:method(args) becomes obj.method(obj, args)
                let name = self.expect(TokenKind::Identifier, "Expected method name")?;
                self.expect(TokenKind::LeftParen, "Expected '(' after method name")?;

                let mut args = vec![expr];
                self.parse_call_args(&mut args)?;

                let callee = self.program.add_expr(ExprKind::Member { object: expr, name: name.lexeme }, line);
                expr = self.program.add_expr(ExprKind::Call { callee, args }, line);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<ExprId> {
        let token = self.current().clone();
        let line = token.line();

        let kind = match token.kind {
            TokenKind::Number => {
                let value = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| self.error_here("Malformed number"))?;
                ExprKind::Number(value)
            }
            TokenKind::String => ExprKind::String(token.lexeme),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Nil => ExprKind::Nil,
            TokenKind::Identifier => ExprKind::Identifier(token.lexeme),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "Expected ')' after expression")?;
                return Ok(expr);
            }
            TokenKind::LeftBrace => {
                self.advance();
                return self.parse_table(line);
            }
            TokenKind::Function => {
                self.advance();
                self.expect(TokenKind::LeftParen, "Expected '(' after 'function'")?;
                let func = self.parse_function_rest(line)?;
                return Ok(self.program.add_expr(ExprKind::Function(func), line));
            }
            _ => return Err(self.error_here("Expected expression")),
        };

        self.advance();
        Ok(self.program.add_expr(kind, line))
    }

    /// Table constructor; the opening brace has been consumed
    fn parse_table(&mut self, line: usize) -> Result<ExprId> {
        let mut entries = Vec::new();
        let mut array_index = 1;

        while !self.check(TokenKind::RightBrace) {
            let entry_line = self.current().line();

            let (key, value) = if self.match_kind(TokenKind::LeftBracket) {
                let key = self.parse_expression()?;
                self.expect(TokenKind::RightBracket, "Expected ']' after key")?;
                self.expect(TokenKind::Equal, "Expected '=' after key")?;
                (key, self.parse_expression()?)
            } else if self.check(TokenKind::Identifier) && self.check_next(TokenKind::Equal) {
                let name = self.advance();
                self.advance();
                let key = self.program.add_expr(ExprKind::String(name.lexeme), entry_line);
                (key, self.parse_expression()?)
            } else {
                let key = self.program.add_expr(ExprKind::Number(array_index as f64), entry_line);
                array_index += 1;
                (key, self.parse_expression()?)
            };
            entries.push((key, value));

            if !self.match_kind(TokenKind::Comma) && !self.match_kind(TokenKind::Semicolon) {
                break;
            }
        }

        self.expect(TokenKind::RightBrace, "Expected '}' after table")?;
        Ok(self.program.add_expr(ExprKind::Table(entries), line))
    }
}

/// Lex and parse `source` in one step
pub fn parse_source(source: &str) -> Result<Program> {
    Parser::new(tokenize(source)?).parse()
}
