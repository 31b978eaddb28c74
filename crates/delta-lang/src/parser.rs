//! Recursive-descent parser
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! program     := statement*
//! statement   := "def" IDENT "(" params? ")" "=" expr ";" | IDENT "=" expr ";"
//! expr        := or ("?" expr ":" expr)?
//! or          := and ("||" and)*
//! and         := equality ("&&" equality)*
//! equality    := comparison (("==" | "!=") comparison)*
//! comparison  := additive (("<" | "<=" | ">" | ">=") additive)*
//! additive    := multiplicative (("+" | "-") multiplicative)*
//! multiplicative := unary (("*" | "/" | "%") unary)*
//! unary       := ("-" | "!") unary | postfix
//! postfix     := primary ("[" expr "]")*
//! primary     := literal | IDENT | IDENT "(" args? ")" | "(" expr ")" | "{" args? "}"
//! ```

use crate::ast::{Assignment, AstNode, BinaryOp, Expr, FunctionDef, UnaryOp};
use crate::error::{ParseError, Span};
use crate::lexer::{tokenize, Token, TokenKind};

/// Parse a whole program
///
/// # Errors
/// Returns the first lexical or syntax error.
pub fn parse_program(source: &str) -> Result<Vec<AstNode>, ParseError> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut program = Vec::new();
    while !parser.at_end() {
        program.push(parser.statement()?);
    }
    Ok(program)
}

/// Parse a single expression (no trailing `;`)
///
/// # Errors
/// Returns the first lexical or syntax error, or an error if input remains.
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(tokenize(source)?);
    let expr = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            expected: "end of input".into(),
            found: token.kind.to_string(),
            span: token.span,
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn end_span(&self) -> Span {
        self.tokens.last().map(|t| t.span).unwrap_or_default()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Span, ParseError> {
        match self.advance() {
            Some(token) if &token.kind == kind => Ok(token.span),
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: kind.to_string(),
                found: token.kind.to_string(),
                span: token.span,
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: kind.to_string(),
                span: self.end_span(),
            }),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, Span), ParseError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => Ok((name, span)),
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: what.into(),
                found: token.kind.to_string(),
                span: token.span,
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: what.into(),
                span: self.end_span(),
            }),
        }
    }

    fn statement(&mut self) -> Result<AstNode, ParseError> {
        if self.eat(&TokenKind::Def) {
            return self.function_def();
        }
        let (target, _) = self.expect_ident("statement")?;
        self.expect(&TokenKind::Assign)?;
        let value = self.expr()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(AstNode::Assign(Assignment { target, value }))
    }

    fn function_def(&mut self) -> Result<AstNode, ParseError> {
        let (name, _) = self.expect_ident("function name")?;
        self.expect(&TokenKind::ParenOpen)?;
        let mut params: Vec<String> = Vec::new();
        if !self.eat(&TokenKind::ParenClose) {
            loop {
                let (param, span) = self.expect_ident("parameter name")?;
                if params.contains(&param) {
                    return Err(ParseError::DuplicateParameter { name: param, span });
                }
                params.push(param);
                if self.eat(&TokenKind::ParenClose) {
                    break;
                }
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.expect(&TokenKind::Assign)?;
        let body = self.expr()?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(AstNode::Function(FunctionDef { name, params, body }))
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let cond = self.binary(1)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.expr()?;
        self.expect(&TokenKind::Colon)?;
        let otherwise = self.expr()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Precedence climbing over left-associative infix operators
    fn binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_kind().and_then(binary_op) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(precedence + 1)?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Bang) => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;

        // Fold negative literals so `-5` stays a literal and i64::MIN is reachable
        if op == UnaryOp::Neg {
            match self.peek().cloned() {
                Some(Token {
                    kind: TokenKind::Int(value),
                    span,
                }) if !self.is_postfix_at(self.pos + 1) => {
                    self.pos += 1;
                    let negated = 0i64.checked_sub_unsigned(value).ok_or(ParseError::InvalidNumber {
                        literal: format!("-{value}"),
                        span,
                    })?;
                    return Ok(Expr::Int(negated));
                }
                Some(Token {
                    kind: TokenKind::Double(value),
                    ..
                }) if !self.is_postfix_at(self.pos + 1) => {
                    self.pos += 1;
                    return Ok(Expr::Double(-value));
                }
                _ => {}
            }
        }

        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn is_postfix_at(&self, pos: usize) -> bool {
        matches!(
            self.tokens.get(pos).map(|t| &t.kind),
            Some(TokenKind::BracketOpen)
        )
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while self.eat(&TokenKind::BracketOpen) {
            let index = self.expr()?;
            self.expect(&TokenKind::BracketClose)?;
            expr = Expr::Index {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::UnexpectedEof {
                expected: "expression".into(),
                span: self.end_span(),
            });
        };

        match token.kind {
            TokenKind::Null => Ok(Expr::Null),
            TokenKind::True => Ok(Expr::Bool(true)),
            TokenKind::False => Ok(Expr::Bool(false)),
            TokenKind::Int(value) => i64::try_from(value)
                .map(Expr::Int)
                .map_err(|_| ParseError::InvalidNumber {
                    literal: value.to_string(),
                    span: token.span,
                }),
            TokenKind::Double(value) => Ok(Expr::Double(value)),
            TokenKind::Str(value) => Ok(Expr::Str(value)),
            TokenKind::Ident(name) => {
                if self.eat(&TokenKind::ParenOpen) {
                    let args = self.list(&TokenKind::ParenClose)?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            TokenKind::ParenOpen => {
                let inner = self.expr()?;
                self.expect(&TokenKind::ParenClose)?;
                Ok(inner)
            }
            TokenKind::BraceOpen => Ok(Expr::Array(self.list(&TokenKind::BraceClose)?)),
            other => Err(ParseError::UnexpectedToken {
                expected: "expression".into(),
                found: other.to_string(),
                span: token.span,
            }),
        }
    }

    /// Comma-separated expressions up to and including `close`
    fn list(&mut self, close: &TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expr()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&TokenKind::Comma)?;
        }
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::EqualEqual => BinaryOp::Eq,
        TokenKind::NotEqual => BinaryOp::Ne,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::LessEqual => BinaryOp::Le,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::GreaterEqual => BinaryOp::Ge,
        TokenKind::AndAnd => BinaryOp::And,
        TokenKind::OrOr => BinaryOp::Or,
        _ => return None,
    };
    Some(op)
}
