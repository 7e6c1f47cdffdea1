//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Turns the lexer's token stream into an Expression tree.
//! CONTEXT: Second stage of formula parsing. Binary operators are handled by
//! precedence climbing over a binding-power table; there are no function
//! calls, comparisons or string literals.
//!
//! GRAMMAR:
//!   expression --> operand ( binop operand )*      (binop: + - * /, left assoc)
//!   operand    --> "-" operand | atom
//!   atom       --> NUMBER | IDENTIFIER | QUOTED_IDENTIFIER | "(" expression ")"

use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::lexer::Lexer;
use crate::token::Token;

/// A formula that could not be parsed.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Binary operator for a token together with its binding power.
/// Higher binds tighter.
fn binary_operator(token: &Token) -> Option<(BinaryOperator, u8)> {
    match token {
        Token::Plus => Some((BinaryOperator::Add, 1)),
        Token::Minus => Some((BinaryOperator::Subtract, 1)),
        Token::Asterisk => Some((BinaryOperator::Multiply, 2)),
        Token::Slash => Some((BinaryOperator::Divide, 2)),
        _ => None,
    }
}

/// Deepest nesting of parentheses and unary minus a formula may use.
pub const MAX_DEPTH: usize = 128;

/// Single-token lookahead parser over a [`Lexer`].
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let lookahead = lexer.next_token();
        Self {
            lexer,
            lookahead,
            depth: 0,
        }
    }

    /// Parse the whole input. Trailing tokens are an error.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        if self.lookahead == Token::EOF {
            return Err(ParseError::new("Empty expression"));
        }

        let expr = self.expression(0)?;

        match &self.lookahead {
            Token::EOF => Ok(expr),
            Token::Illegal(ch) => Err(ParseError::new(format!("Illegal character: {}", ch))),
            other => Err(ParseError::new(format!(
                "Unexpected token after expression: {}",
                other
            ))),
        }
    }

    /// Consume the lookahead and return it.
    fn bump(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.lookahead, next)
    }

    /// Runs `inner` one nesting level deeper, failing past `MAX_DEPTH`.
    fn nested(&mut self, inner: impl FnOnce(&mut Self) -> ParseResult<Expression>) -> ParseResult<Expression> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new(format!(
                "Expression is nested more than {} levels deep",
                MAX_DEPTH
            )));
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    /// Parse operators binding tighter than `min_power`.
    fn expression(&mut self, min_power: u8) -> ParseResult<Expression> {
        let mut lhs = self.operand()?;

        while let Some((op, power)) = binary_operator(&self.lookahead) {
            if power <= min_power {
                break;
            }
            self.bump();
            let rhs = self.expression(power)?;
            lhs = Expression::BinaryOp {
                left: Box::new(lhs),
                op,
                right: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn operand(&mut self) -> ParseResult<Expression> {
        if self.lookahead != Token::Minus {
            return self.atom();
        }
        self.bump();
        let operand = self.nested(Self::operand)?;
        Ok(Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(operand),
        })
    }

    fn atom(&mut self) -> ParseResult<Expression> {
        match self.bump() {
            Token::Number(n) => Ok(Expression::Number(n)),
            Token::Identifier(name) | Token::QuotedIdentifier(name) => {
                if self.lookahead == Token::LParen {
                    return Err(ParseError::new(format!(
                        "Function calls are not supported: {}(...)",
                        name
                    )));
                }
                Ok(Expression::Column(name))
            }
            Token::LParen => {
                let inner = self.nested(|p| p.expression(0))?;
                match self.bump() {
                    Token::RParen => Ok(inner),
                    found => Err(ParseError::new(format!("Expected ), found {}", found))),
                }
            }
            Token::EOF => Err(ParseError::new("Unexpected end of expression")),
            Token::Illegal(ch) => Err(ParseError::new(format!("Illegal character: {}", ch))),
            token => Err(ParseError::new(format!("Unexpected token: {}", token))),
        }
    }
}

/// Parse a formula string in one call.
pub fn parse(input: &str) -> ParseResult<Expression> {
    Parser::new(input).parse()
}
