// SPDX-License-Identifier: MIT

//! Tokenizer for the condition/action script language. Deliberately tiny:
//! identifiers, numbers, strings, a handful of operators and keywords —
//! enough to express dotted-path comparisons and a couple of tool calls,
//! nothing resembling a general-purpose scripting language.

use crate::error::{SandboxError, SandboxResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    String(String),
    True,
    False,
    Null,
    Let,
    If,
    Else,
    Dot,
    Comma,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    AndAnd,
    OrOr,
    Eof,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    pub fn tokenize(mut self) -> SandboxResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> SandboxResult<Token> {
        self.skip_whitespace();
        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };

        match c {
            b'.' => {
                self.advance();
                Ok(Token::Dot)
            }
            b',' => {
                self.advance();
                Ok(Token::Comma)
            }
            b';' => {
                self.advance();
                Ok(Token::Semicolon)
            }
            b'(' => {
                self.advance();
                Ok(Token::LParen)
            }
            b')' => {
                self.advance();
                Ok(Token::RParen)
            }
            b'{' => {
                self.advance();
                Ok(Token::LBrace)
            }
            b'}' => {
                self.advance();
                Ok(Token::RBrace)
            }
            b'+' => {
                self.advance();
                Ok(Token::Plus)
            }
            b'-' => {
                self.advance();
                Ok(Token::Minus)
            }
            b'*' => {
                self.advance();
                Ok(Token::Star)
            }
            b'/' => {
                self.advance();
                Ok(Token::Slash)
            }
            b'=' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    Ok(Token::EqEq)
                } else {
                    Ok(Token::Eq)
                }
            }
            b'!' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    Ok(Token::NotEq)
                } else {
                    Ok(Token::Bang)
                }
            }
            b'<' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    Ok(Token::LtEq)
                } else {
                    Ok(Token::Lt)
                }
            }
            b'>' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    Ok(Token::GtEq)
                } else {
                    Ok(Token::Gt)
                }
            }
            b'&' => {
                self.advance();
                if self.peek() == Some(b'&') {
                    self.advance();
                    Ok(Token::AndAnd)
                } else {
                    Err(SandboxError::Lex {
                        pos: self.pos,
                        message: "expected '&&'".into(),
                    })
                }
            }
            b'|' => {
                self.advance();
                if self.peek() == Some(b'|') {
                    self.advance();
                    Ok(Token::OrOr)
                } else {
                    Err(SandboxError::Lex {
                        pos: self.pos,
                        message: "expected '||'".into(),
                    })
                }
            }
            b'"' => self.string_literal(),
            c if c.is_ascii_digit() => self.number_literal(),
            c if c.is_ascii_alphabetic() || c == b'_' => Ok(self.ident_or_keyword()),
            other => Err(SandboxError::Lex {
                pos: self.pos,
                message: format!("unexpected byte {:?}", other as char),
            }),
        }
    }

    fn string_literal(&mut self) -> SandboxResult<Token> {
        let start = self.pos;
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n') => s.push('\n'),
                    Some(b't') => s.push('\t'),
                    Some(b'"') => s.push('"'),
                    Some(b'\\') => s.push('\\'),
                    Some(other) => s.push(other as char),
                    None => {
                        return Err(SandboxError::Lex {
                            pos: start,
                            message: "unterminated string escape".into(),
                        })
                    }
                },
                Some(c) => s.push(c as char),
                None => {
                    return Err(SandboxError::Lex {
                        pos: start,
                        message: "unterminated string literal".into(),
                    })
                }
            }
        }
        Ok(Token::String(s))
    }

    fn number_literal(&mut self) -> SandboxResult<Token> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| SandboxError::Lex {
                pos: start,
                message: format!("invalid number literal {text:?}"),
            })
    }

    fn ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        match text {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "let" => Token::Let,
            "if" => Token::If,
            "else" => Token::Else,
            other => Token::Ident(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_dotted_comparison() {
        let tokens = Lexer::new(r#"event.new_state.state == "Home""#).tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("event".into()),
                Token::Dot,
                Token::Ident("new_state".into()),
                Token::Dot,
                Token::Ident("state".into()),
                Token::EqEq,
                Token::String("Home".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn tokenizes_call_and_keywords() {
        let tokens = Lexer::new("if true { notify(\"hi\") } else { false }").tokenize().unwrap();
        assert!(tokens.contains(&Token::If));
        assert!(tokens.contains(&Token::Ident("notify".into())));
    }
}
