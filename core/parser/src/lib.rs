//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the summary-formula parser.
//! CONTEXT: Converts a caller-supplied formula string such as
//! `revenue - cost * 1.1` into an expression tree over column identifiers.
//! The grammar is closed: it never evaluates arbitrary code.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Evaluator (step-engine)
//!
//! Accepted: + - * / with the usual precedence, unary minus, parentheses,
//! numeric literals, bare identifiers (revenue, Q1.sales) and quoted
//! identifiers for headers with spaces ('Unit Price').

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;


pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult, Parser, MAX_DEPTH};
pub use token::Token;
