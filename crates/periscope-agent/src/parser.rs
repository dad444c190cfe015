//! Recursive-descent parser for the condition/expression dialect.
//!
//! Parses the full grammar, including the statements and mutating
//! operators the validator later rejects. Errors for misplaced tokens
//! read `Unexpected token '…'`.

use crate::ast::{BinaryOp, Expr, ExprKind, LogicalOp, Program, PropertyKey, Stmt, StmtKind, UnaryOp};
use crate::token::{Span, SyntaxError, Token, TokenKind};

/// Parser state over a token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a parser for the given tokens (must end with `Eof`).
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a complete program.
    pub fn parse(mut self) -> Result<Program, SyntaxError> {
        let mut statements = Vec::new();
        while !self.at(&TokenKind::Eof) {
            statements.push(self.statement()?);
        }
        Ok(Program { statements })
    }

    // ── Statements ───────────────────────────────────────────────────────────

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.peek_span().start;
        let kind = match self.peek_kind().clone() {
            TokenKind::Semicolon => {
                self.advance();
                StmtKind::Empty
            }
            TokenKind::LeftBrace => {
                self.block()?;
                StmtKind::Block
            }
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                self.advance();
                self.var_declarators()?;
                self.eat(&TokenKind::Semicolon);
                StmtKind::VarDecl
            }
            TokenKind::Function => {
                self.advance();
                self.function_tail(true)?;
                StmtKind::FunctionDecl
            }
            TokenKind::Return => {
                self.advance();
                if !self.at(&TokenKind::Semicolon)
                    && !self.at(&TokenKind::RightBrace)
                    && !self.at(&TokenKind::Eof)
                {
                    self.expression()?;
                }
                self.eat(&TokenKind::Semicolon);
                StmtKind::Return
            }
            TokenKind::Throw => {
                self.advance();
                self.expression()?;
                self.eat(&TokenKind::Semicolon);
                StmtKind::Throw
            }
            TokenKind::Debugger => {
                self.advance();
                self.eat(&TokenKind::Semicolon);
                StmtKind::Debugger
            }
            TokenKind::If => {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                self.expression()?;
                self.expect(&TokenKind::RightParen)?;
                self.statement()?;
                if self.eat(&TokenKind::Else) {
                    self.statement()?;
                }
                StmtKind::If
            }
            TokenKind::While => {
                self.advance();
                self.expect(&TokenKind::LeftParen)?;
                self.expression()?;
                self.expect(&TokenKind::RightParen)?;
                self.statement()?;
                StmtKind::While
            }
            TokenKind::Do => {
                self.advance();
                self.statement()?;
                self.expect(&TokenKind::While)?;
                self.expect(&TokenKind::LeftParen)?;
                self.expression()?;
                self.expect(&TokenKind::RightParen)?;
                self.eat(&TokenKind::Semicolon);
                StmtKind::DoWhile
            }
            TokenKind::For => {
                self.advance();
                self.for_tail()?;
                StmtKind::For
            }
            TokenKind::Try => {
                self.advance();
                self.block()?;
                if self.eat(&TokenKind::Catch) {
                    if self.eat(&TokenKind::LeftParen) {
                        self.expect_ident()?;
                        self.expect(&TokenKind::RightParen)?;
                    }
                    self.block()?;
                }
                if self.eat(&TokenKind::Finally) {
                    self.block()?;
                }
                StmtKind::Try
            }
            _ => {
                let expr = self.expression()?;
                self.eat(&TokenKind::Semicolon);
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt {
            kind,
            span: Span::new(start, self.prev_end()),
        })
    }

    fn block(&mut self) -> Result<(), SyntaxError> {
        self.expect(&TokenKind::LeftBrace)?;
        while !self.at(&TokenKind::RightBrace) {
            if self.at(&TokenKind::Eof) {
                return Err(self.unexpected());
            }
            self.statement()?;
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(())
    }

    fn var_declarators(&mut self) -> Result<(), SyntaxError> {
        loop {
            self.expect_ident()?;
            if self.eat(&TokenKind::Eq) {
                self.assignment()?;
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(())
    }

    fn function_tail(&mut self, name_required: bool) -> Result<(), SyntaxError> {
        if matches!(self.peek_kind(), TokenKind::Ident(_)) {
            self.advance();
        } else if name_required {
            return Err(self.unexpected());
        }
        self.expect(&TokenKind::LeftParen)?;
        while !self.at(&TokenKind::RightParen) {
            self.expect_ident()?;
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen)?;
        self.block()
    }

    fn for_tail(&mut self) -> Result<(), SyntaxError> {
        self.expect(&TokenKind::LeftParen)?;
        // Initializer
        match self.peek_kind() {
            TokenKind::Semicolon => {}
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                self.advance();
                self.expect_ident()?;
                if self.eat(&TokenKind::In) {
                    self.expression()?;
                    self.expect(&TokenKind::RightParen)?;
                    return self.statement().map(|_| ());
                }
                if self.eat(&TokenKind::Eq) {
                    self.assignment()?;
                }
                while self.eat(&TokenKind::Comma) {
                    self.expect_ident()?;
                    if self.eat(&TokenKind::Eq) {
                        self.assignment()?;
                    }
                }
            }
            _ => {
                // The relational level consumes `in`, so `for (k in obj)`
                // arrives here with the whole header already parsed.
                self.expression()?;
                if self.at(&TokenKind::RightParen) {
                    self.advance();
                    return self.statement().map(|_| ());
                }
            }
        }
        self.expect(&TokenKind::Semicolon)?;
        if !self.at(&TokenKind::Semicolon) {
            self.expression()?;
        }
        self.expect(&TokenKind::Semicolon)?;
        if !self.at(&TokenKind::RightParen) {
            self.expression()?;
        }
        self.expect(&TokenKind::RightParen)?;
        self.statement().map(|_| ())
    }

    // ── Expressions ──────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let first = self.assignment()?;
        if !self.at(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut parts = vec![first];
        while self.eat(&TokenKind::Comma) {
            parts.push(self.assignment()?);
        }
        Ok(self.expr(ExprKind::Sequence(parts), start))
    }

    fn assignment(&mut self) -> Result<Expr, SyntaxError> {
        if let Some(arrow) = self.try_arrow()? {
            return Ok(arrow);
        }
        let start = self.peek_span().start;
        let target = self.conditional()?;
        if self.at_assignment_op() {
            self.advance();
            let value = self.assignment()?;
            return Ok(self.expr(
                ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                start,
            ));
        }
        Ok(target)
    }

    fn at_assignment_op(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Eq
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::PercentEq
                | TokenKind::AmpEq
                | TokenKind::PipeEq
                | TokenKind::CaretEq
                | TokenKind::ShlEq
                | TokenKind::ShrEq
                | TokenKind::UShrEq
        )
    }

    /// Detect an arrow function at the current position; parses and
    /// returns it wholesale (the validator rejects it by kind).
    fn try_arrow(&mut self) -> Result<Option<Expr>, SyntaxError> {
        let start = self.peek_span().start;
        match self.peek_kind() {
            TokenKind::Ident(_) => {
                if self.tokens.get(self.pos + 1).map(|t| &t.kind) == Some(&TokenKind::Arrow) {
                    self.advance();
                    self.advance();
                    self.arrow_body()?;
                    return Ok(Some(self.expr(ExprKind::Arrow, start)));
                }
                Ok(None)
            }
            TokenKind::LeftParen => {
                let Some(close) = self.matching_paren(self.pos) else {
                    return Ok(None);
                };
                if self.tokens.get(close + 1).map(|t| &t.kind) != Some(&TokenKind::Arrow) {
                    return Ok(None);
                }
                // Parameter list is skipped, not analyzed
                self.pos = close + 2;
                self.arrow_body()?;
                Ok(Some(self.expr(ExprKind::Arrow, start)))
            }
            _ => Ok(None),
        }
    }

    fn arrow_body(&mut self) -> Result<(), SyntaxError> {
        if self.at(&TokenKind::LeftBrace) {
            self.block()
        } else {
            self.assignment().map(|_| ())
        }
    }

    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
        }
        None
    }

    fn conditional(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let test = self.logical_or()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.assignment()?;
        Ok(self.expr(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            start,
        ))
    }

    fn logical_or(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let mut left = self.logical_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.logical_and()?;
            left = self.expr(
                ExprKind::Logical {
                    op: LogicalOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let mut left = self.bit_or()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.bit_or()?;
            left = self.expr(
                ExprKind::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                start,
            );
        }
        Ok(left)
    }

    fn bit_or(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[(TokenKind::Pipe, BinaryOp::BitOr)],
            Self::bit_xor,
        )
    }

    fn bit_xor(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[(TokenKind::Caret, BinaryOp::BitXor)],
            Self::bit_and,
        )
    }

    fn bit_and(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[(TokenKind::Amp, BinaryOp::BitAnd)],
            Self::equality,
        )
    }

    fn equality(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                (TokenKind::EqEqEq, BinaryOp::StrictEq),
                (TokenKind::BangEqEq, BinaryOp::StrictNotEq),
                (TokenKind::EqEq, BinaryOp::Eq),
                (TokenKind::BangEq, BinaryOp::NotEq),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                (TokenKind::LessEq, BinaryOp::LessEq),
                (TokenKind::GreaterEq, BinaryOp::GreaterEq),
                (TokenKind::Less, BinaryOp::Less),
                (TokenKind::Greater, BinaryOp::Greater),
                (TokenKind::In, BinaryOp::In),
                (TokenKind::Instanceof, BinaryOp::Instanceof),
            ],
            Self::shift,
        )
    }

    fn shift(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                (TokenKind::UShr, BinaryOp::UShr),
                (TokenKind::Shr, BinaryOp::Shr),
                (TokenKind::Shl, BinaryOp::Shl),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Sub),
            ],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_level(
            &[
                (TokenKind::Star, BinaryOp::Mul),
                (TokenKind::Slash, BinaryOp::Div),
                (TokenKind::Percent, BinaryOp::Mod),
            ],
            Self::unary,
        )
    }

    fn binary_level(
        &mut self,
        ops: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, SyntaxError>,
    ) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let right = next(self)?;
                    left = self.expr(
                        ExprKind::Binary {
                            op: *op,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        start,
                    );
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let op = match self.peek_kind() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            return Ok(self.expr(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                start,
            ));
        }
        if matches!(self.peek_kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            self.advance();
            let operand = self.unary()?;
            return Ok(self.expr(
                ExprKind::Update {
                    operand: Box::new(operand),
                },
                start,
            ));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let expr = self.call_member(true)?;
        if matches!(self.peek_kind(), TokenKind::PlusPlus | TokenKind::MinusMinus) {
            self.advance();
            return Ok(self.expr(
                ExprKind::Update {
                    operand: Box::new(expr),
                },
                start,
            ));
        }
        Ok(expr)
    }

    fn call_member(&mut self, allow_call: bool) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let mut expr = self.primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_ident()?;
                    expr = self.expr(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                        start,
                    );
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(&TokenKind::RightBracket)?;
                    expr = self.expr(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        start,
                    );
                }
                TokenKind::LeftParen if allow_call => {
                    let args = self.arguments()?;
                    expr = self.expr(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        start,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut args = Vec::new();
        if !self.at(&TokenKind::RightParen) {
            loop {
                args.push(self.assignment()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.peek_span().start;
        let kind = match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                ExprKind::Number(n)
            }
            TokenKind::String(s) => {
                self.advance();
                ExprKind::String(s)
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::Null => {
                self.advance();
                ExprKind::Null
            }
            TokenKind::Undefined => {
                self.advance();
                ExprKind::Undefined
            }
            TokenKind::This => {
                self.advance();
                ExprKind::This
            }
            TokenKind::Ident(name) => {
                self.advance();
                ExprKind::Ident(name)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(inner);
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.at(&TokenKind::RightBracket) {
                    elements.push(self.assignment()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RightBracket)?;
                ExprKind::Array(elements)
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut properties = Vec::new();
                while !self.at(&TokenKind::RightBrace) {
                    properties.push(self.object_property()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RightBrace)?;
                ExprKind::Object(properties)
            }
            TokenKind::New => {
                self.advance();
                let callee = self.call_member(false)?;
                let args = if self.at(&TokenKind::LeftParen) {
                    self.arguments()?
                } else {
                    Vec::new()
                };
                ExprKind::New {
                    callee: Box::new(callee),
                    args,
                }
            }
            TokenKind::Function => {
                self.advance();
                self.function_tail(false)?;
                ExprKind::Function
            }
            _ => return Err(self.unexpected()),
        };
        Ok(self.expr(kind, start))
    }

    fn object_property(&mut self) -> Result<(PropertyKey, Expr), SyntaxError> {
        let start = self.peek_span().start;
        let key = match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                PropertyKey::Ident(name)
            }
            TokenKind::String(s) => {
                self.advance();
                PropertyKey::String(s)
            }
            TokenKind::Number(n) => {
                self.advance();
                PropertyKey::Number(n)
            }
            _ => return Err(self.unexpected()),
        };
        if self.eat(&TokenKind::Colon) {
            let value = self.assignment()?;
            return Ok((key, value));
        }
        // Shorthand `{ f }` reads the identifier of the same name
        match &key {
            PropertyKey::Ident(name) => {
                let value = self.expr(ExprKind::Ident(name.clone()), start);
                Ok((key, value))
            }
            _ => Err(self.unexpected()),
        }
    }

    // ── Token helpers ────────────────────────────────────────────────────────

    fn expr(&self, kind: ExprKind, start: usize) -> Expr {
        Expr {
            kind,
            span: Span::new(start, self.prev_end()),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_span(&self) -> Span {
        self.peek().span
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, SyntaxError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_ident(&mut self) -> Result<String, SyntaxError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn unexpected(&self) -> SyntaxError {
        let token = self.peek();
        SyntaxError::new(
            format!("Unexpected token '{}'", token.kind),
            token.span.start,
        )
    }
}

/// Lex and parse an expression string.
pub fn parse_source(source: &str) -> Result<Program, SyntaxError> {
    let tokens = crate::lexer::Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}
