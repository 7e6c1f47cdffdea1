//! FILENAME: core/parser/src/token.rs
//! PURPOSE: The token vocabulary shared by the lexer and the parser.

/// One lexical unit of a formula.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Number(f64),
    /// Bare column name: `revenue`, `Q1.sales`.
    Identifier(String),
    /// Quoted column name for headers with spaces: 'Unit Price'
    QuotedIdentifier(String),

    Plus,
    Minus,
    Asterisk,
    Slash,
    LParen,
    RParen,

    /// End of input.
    EOF,
    /// A character outside the grammar. Reported by the parser, not the lexer.
    Illegal(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Token::Number(n) => return write!(f, "{}", n),
            Token::Identifier(name) => name.as_str(),
            Token::QuotedIdentifier(name) => return write!(f, "'{}'", name),
            Token::Illegal(ch) => return write!(f, "illegal '{}'", ch),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Asterisk => "*",
            Token::Slash => "/",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::EOF => "end of input",
        };
        f.write_str(symbol)
    }
}
