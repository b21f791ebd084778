//! Recursive descent parser for the expression language.
//!
//! Precedence, loosest first: assignment, ternary, `??`, `||`, `&&`,
//! equality, comparison, additive, multiplicative, unary, postfix.

use crate::error::{EvalError, EvalResult, Span};
use crate::expr::{AssignOp, BinaryOp, Expr, UnaryOp};
use crate::lexer::{tokenize, unquote, Token};
use crate::value::Value;

/// Parse a complete expression
pub fn parse_expression(source: &str) -> EvalResult<Expr> {
    let mut parser = ExprParser::new(source)?;
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a comma separated argument list, possibly empty
pub fn parse_arguments(source: &str) -> EvalResult<Vec<Expr>> {
    let mut parser = ExprParser::new(source)?;
    let mut arguments = Vec::new();
    while !parser.is_at_end() {
        arguments.push(parser.parse_expression()?);
        if !parser.match_token(&Token::Comma) {
            break;
        }
    }
    parser.expect_end()?;
    Ok(arguments)
}

/// `init; condition; step` of a counting loop, each part optional
#[derive(Debug, Clone, PartialEq)]
pub struct ForHeader {
    pub init: Option<Expr>,
    pub condition: Option<Expr>,
    pub step: Option<Expr>,
}

pub fn parse_for_header(source: &str) -> EvalResult<ForHeader> {
    let mut parser = ExprParser::new(source)?;

    let init = parser.parse_optional(&Token::Semicolon)?;
    parser.expect(&Token::Semicolon)?;
    let condition = parser.parse_optional(&Token::Semicolon)?;
    parser.expect(&Token::Semicolon)?;
    let step = if parser.is_at_end() {
        None
    } else {
        Some(parser.parse_expression()?)
    };
    parser.expect_end()?;

    Ok(ForHeader {
        init,
        condition,
        step,
    })
}

/// `iterable as $value` or `iterable as $key => $value`
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachHeader {
    pub iterable: Expr,
    pub key: Option<String>,
    pub value: String,
}

pub fn parse_foreach_header(source: &str) -> EvalResult<ForeachHeader> {
    let mut parser = ExprParser::new(source)?;

    let iterable = parser.parse_expression()?;
    parser.expect(&Token::As)?;
    let first = parser.expect_variable()?;
    let header = if parser.match_token(&Token::Arrow) {
        ForeachHeader {
            iterable,
            key: Some(first),
            value: parser.expect_variable()?,
        }
    } else {
        ForeachHeader {
            iterable,
            key: None,
            value: first,
        }
    };
    parser.expect_end()?;

    Ok(header)
}

pub struct ExprParser<'src> {
    tokens: Vec<(Token<'src>, Span)>,
    pos: usize,
    source_len: usize,
}

impl<'src> ExprParser<'src> {
    pub fn new(source: &'src str) -> EvalResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source_len: source.len(),
        })
    }

    pub fn parse_expression(&mut self) -> EvalResult<Expr> {
        self.parse_assignment()
    }

    fn parse_optional(&mut self, terminator: &Token) -> EvalResult<Option<Expr>> {
        if self.check(terminator) {
            return Ok(None);
        }
        self.parse_expression().map(Some)
    }

    fn parse_assignment(&mut self) -> EvalResult<Expr> {
        let target = self.parse_conditional()?;

        let operator = match self.peek() {
            Some((Token::Assign, _)) => AssignOp::Set,
            Some((Token::PlusAssign, _)) => AssignOp::Add,
            Some((Token::MinusAssign, _)) => AssignOp::Subtract,
            _ => return Ok(target),
        };
        if !target.is_place() {
            return Err(EvalError::InvalidAssignment {
                span: target.span(),
            });
        }
        self.advance();

        let value = self.parse_assignment()?;
        let span = target.span().start..value.span().end;
        Ok(Expr::Assign {
            target: Box::new(target),
            operator,
            value: Box::new(value),
            span,
        })
    }

    fn parse_conditional(&mut self) -> EvalResult<Expr> {
        let condition = self.parse_coalesce()?;
        if !self.match_token(&Token::Question) {
            return Ok(condition);
        }

        let then = self.parse_assignment()?;
        self.expect(&Token::Colon)?;
        let otherwise = self.parse_assignment()?;
        let span = condition.span().start..otherwise.span().end;

        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            span,
        })
    }

    /// Right associative: `a ?? b ?? c` is `a ?? (b ?? c)`
    fn parse_coalesce(&mut self) -> EvalResult<Expr> {
        let left = self.parse_or()?;
        if !self.match_token(&Token::Coalesce) {
            return Ok(left);
        }
        let right = self.parse_coalesce()?;
        Ok(binary(left, BinaryOp::Coalesce, right))
    }

    fn parse_or(&mut self) -> EvalResult<Expr> {
        self.parse_binary(Self::parse_and, |token| match token {
            Token::Or => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> EvalResult<Expr> {
        self.parse_binary(Self::parse_equality, |token| match token {
            Token::And => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> EvalResult<Expr> {
        self.parse_binary(Self::parse_comparison, |token| match token {
            Token::Eq => Some(BinaryOp::Equals),
            Token::NotEq => Some(BinaryOp::NotEquals),
            Token::StrictEq => Some(BinaryOp::StrictEquals),
            Token::StrictNotEq => Some(BinaryOp::StrictNotEquals),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> EvalResult<Expr> {
        self.parse_binary(Self::parse_additive, |token| match token {
            Token::Less => Some(BinaryOp::LessThan),
            Token::LessEq => Some(BinaryOp::LessThanOrEqual),
            Token::Greater => Some(BinaryOp::GreaterThan),
            Token::GreaterEq => Some(BinaryOp::GreaterThanOrEqual),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> EvalResult<Expr> {
        self.parse_binary(Self::parse_multiplicative, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> EvalResult<Expr> {
        self.parse_binary(Self::parse_unary, |token| match token {
            Token::Star => Some(BinaryOp::Multiply),
            Token::Slash => Some(BinaryOp::Divide),
            Token::Percent => Some(BinaryOp::Modulo),
            _ => None,
        })
    }

    /// One left associative precedence level
    fn parse_binary(
        &mut self,
        operand: fn(&mut Self) -> EvalResult<Expr>,
        operator: fn(&Token) -> Option<BinaryOp>,
    ) -> EvalResult<Expr> {
        let mut left = operand(self)?;

        while let Some(op) = self.peek().and_then(|(token, _)| operator(token)) {
            self.advance();
            let right = operand(self)?;
            left = binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        let Some((token, span)) = self.peek().cloned() else {
            return self.parse_postfix();
        };

        let operator = match token {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Negate,
            Token::Increment | Token::Decrement => {
                self.advance();
                let target = self.parse_unary()?;
                return update(target, token == Token::Increment, true, span.start);
            }
            _ => return self.parse_postfix(),
        };
        self.advance();

        let operand = self.parse_unary()?;
        let span = span.start..operand.span().end;
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_postfix(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek().cloned() {
                Some((Token::Dot, _)) => {
                    self.advance();
                    let (property, end) = self.expect_property()?;
                    let span = expr.span().start..end;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        span,
                    };
                }
                Some((Token::LBracket, _)) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let end = self.expect(&Token::RBracket)?.end;
                    let span = expr.span().start..end;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        span,
                    };
                }
                Some((token @ (Token::Increment | Token::Decrement), span)) => {
                    self.advance();
                    let start = expr.span().start;
                    let mut updated = update(expr, token == Token::Increment, false, start)?;
                    if let Expr::Update { span: s, .. } = &mut updated {
                        s.end = span.end;
                    }
                    expr = updated;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        let Some((token, span)) = self.peek().cloned() else {
            return Err(EvalError::SyntaxError {
                message: "unexpected end of expression".to_string(),
                span: self.eof_span(),
            });
        };

        match token {
            Token::Number(value) => {
                self.advance();
                Ok(literal(Value::Number(value), span))
            }
            Token::String(raw) => {
                self.advance();
                Ok(literal(Value::String(unquote(raw)), span))
            }
            Token::True | Token::False => {
                self.advance();
                Ok(literal(Value::Bool(token == Token::True), span))
            }
            Token::Null => {
                self.advance();
                Ok(literal(Value::Null, span))
            }
            Token::Variable(name) => {
                self.advance();
                Ok(Expr::Variable {
                    name: name.to_string(),
                    span,
                })
            }
            Token::Ident(function) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let arguments = self.parse_list(&Token::RParen)?;
                let end = self.expect(&Token::RParen)?.end;
                Ok(Expr::Call {
                    function: function.to_string(),
                    arguments,
                    span: span.start..end,
                })
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                self.advance();
                let items = self.parse_list(&Token::RBracket)?;
                let end = self.expect(&Token::RBracket)?.end;
                Ok(Expr::Array {
                    items,
                    span: span.start..end,
                })
            }
            Token::LBrace => {
                self.advance();
                self.parse_map(span.start)
            }
            other => Err(EvalError::SyntaxError {
                message: format!("expected expression, found '{}'", other),
                span,
            }),
        }
    }

    /// Comma separated expressions up to (not including) `close`
    fn parse_list(&mut self, close: &Token) -> EvalResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_expression()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_map(&mut self, start: usize) -> EvalResult<Expr> {
        let mut entries = Vec::new();

        while !self.check(&Token::RBrace) {
            let key = match self.peek().cloned() {
                Some((Token::String(raw), _)) => unquote(raw),
                Some((Token::Ident(name), _)) => name.to_string(),
                Some((Token::Number(n), _)) => Value::Number(n).to_string(),
                _ => {
                    return Err(EvalError::SyntaxError {
                        message: format!("expected map key, found {}", self.describe_current()),
                        span: self.current_span(),
                    })
                }
            };
            self.advance();
            self.expect(&Token::Colon)?;
            entries.push((key, self.parse_expression()?));

            if !self.match_token(&Token::Comma) {
                break;
            }
        }

        let end = self.expect(&Token::RBrace)?.end;
        Ok(Expr::Map {
            entries,
            span: start..end,
        })
    }

    fn expect_property(&mut self) -> EvalResult<(String, usize)> {
        let name = match self.peek() {
            Some((Token::Ident(name), span)) => Some((name.to_string(), span.end)),
            Some((token @ (Token::True | Token::False | Token::Null | Token::As), span)) => {
                Some((token.to_string(), span.end))
            }
            _ => None,
        };

        match name {
            Some(found) => {
                self.advance();
                Ok(found)
            }
            None => Err(EvalError::SyntaxError {
                message: format!("expected property name, found {}", self.describe_current()),
                span: self.current_span(),
            }),
        }
    }

    fn expect_variable(&mut self) -> EvalResult<String> {
        match self.peek() {
            Some((Token::Variable(name), _)) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(EvalError::SyntaxError {
                message: format!("expected variable, found {}", self.describe_current()),
                span: self.current_span(),
            }),
        }
    }

    fn expect(&mut self, token: &Token) -> EvalResult<Span> {
        match self.peek() {
            Some((t, span)) if t == token => {
                let span = span.clone();
                self.advance();
                Ok(span)
            }
            _ => Err(EvalError::SyntaxError {
                message: format!("expected '{}', found {}", token, self.describe_current()),
                span: self.current_span(),
            }),
        }
    }

    pub fn expect_end(&self) -> EvalResult<()> {
        match self.peek() {
            None => Ok(()),
            Some((token, span)) => Err(EvalError::SyntaxError {
                message: format!("unexpected '{}'", token),
                span: span.clone(),
            }),
        }
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token: &Token) -> bool {
        matches!(self.peek(), Some((t, _)) if t == token)
    }

    fn peek(&self) -> Option<&(Token<'src>, Span)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_span(&self) -> Span {
        self.peek()
            .map(|(_, span)| span.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    fn eof_span(&self) -> Span {
        self.source_len..self.source_len
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some((token, _)) => format!("'{}'", token),
            None => "end of expression".to_string(),
        }
    }
}

fn literal(value: Value, span: Span) -> Expr {
    Expr::Literal { value, span }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    let span = left.span().start..right.span().end;
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        span,
    }
}

fn update(target: Expr, increment: bool, prefix: bool, start: usize) -> EvalResult<Expr> {
    if !target.is_place() {
        return Err(EvalError::InvalidAssignment {
            span: target.span(),
        });
    }
    let span = start..target.span().end;
    Ok(Expr::Update {
        target: Box::new(target),
        increment,
        prefix,
        span,
    })
}
