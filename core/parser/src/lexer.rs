//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a formula string into Tokens.
//! CONTEXT: First stage of formula parsing. The lexer never fails; anything it
//! cannot read comes back as Token::Illegal and the parser reports it.
//!
//! TOKENS:
//! - Single char: + - * / ( )
//! - Numbers: 42, 3.5, .25
//! - Bare identifiers: revenue, Q1.sales
//! - Quoted identifiers: 'Unit Price', 'Owner''s Cost'

use crate::token::Token;

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { src: input, pos: 0 }
    }

    /// The next token. Returns `Token::EOF` forever once input is exhausted.
    pub fn next_token(&mut self) -> Token {
        self.take_while(char::is_whitespace);

        let Some(ch) = self.peek() else {
            return Token::EOF;
        };
        self.pos += ch.len_utf8();

        match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Asterisk,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '\'' => self.quoted(),
            c if c.is_ascii_digit() || c == '.' => self.number(c),
            c if c.is_alphabetic() || c == '_' => {
                let start = self.pos - c.len_utf8();
                self.take_while(|c| c.is_alphanumeric() || c == '_' || c == '.');
                Token::Identifier(self.src[start..self.pos].to_string())
            }
            c => Token::Illegal(c),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    /// Advance past every char matching `pred`; returns the consumed slice.
    fn take_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let src: &'a str = self.src;
        let rest = &src[self.pos..];
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Body of a quoted identifier; the opening quote is already consumed.
    /// `''` inside the quotes is a literal quote.
    fn quoted(&mut self) -> Token {
        let mut name = String::new();
        loop {
            name.push_str(self.take_while(|c| c != '\''));
            if self.peek().is_none() {
                return Token::Illegal('\'');
            }
            self.pos += 1;
            if self.peek() == Some('\'') {
                self.pos += 1;
                name.push('\'');
            } else {
                return Token::QuotedIdentifier(name);
            }
        }
    }

    fn number(&mut self, first: char) -> Token {
        let start = self.pos - 1;
        let mut seen_dot = first == '.';
        self.take_while(|c| {
            if c == '.' && !seen_dot {
                seen_dot = true;
                return true;
            }
            c.is_ascii_digit()
        });
        self.src[start..self.pos]
            .parse::<f64>()
            .map_or(Token::Illegal(first), Token::Number)
    }
}
