// SPDX-License-Identifier: MIT

//! Recursive-descent parser over the lexer's token stream, standard
//! precedence climbing for operators (`||` loosest, unary tightest).

use crate::ast::{BinaryOp, Expr, Program, Stmt, UnaryOp};
use crate::error::{SandboxError, SandboxResult};
use crate::lexer::{Lexer, Token};
use crate::value::Value;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn parse(src: &str) -> SandboxResult<Program> {
        let tokens = Lexer::new(src).tokenize()?;
        let mut parser = Self { tokens, pos: 0 };
        parser.program()
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> SandboxResult<()> {
        let actual = self.advance();
        if &actual == expected {
            Ok(())
        } else {
            Err(SandboxError::Parse(format!(
                "expected {expected:?}, found {actual:?}"
            )))
        }
    }

    fn program(&mut self) -> SandboxResult<Program> {
        let mut statements = Vec::new();
        while self.peek() != &Token::Eof {
            statements.push(self.statement()?);
        }
        Ok(Program { statements })
    }

    fn statement(&mut self) -> SandboxResult<Stmt> {
        if self.peek() == &Token::Let {
            self.advance();
            let name = match self.advance() {
                Token::Ident(name) => name,
                other => return Err(SandboxError::Parse(format!("expected identifier, found {other:?}"))),
            };
            self.expect(&Token::Eq)?;
            let value = self.expr()?;
            if self.peek() == &Token::Semicolon {
                self.advance();
            }
            Ok(Stmt::Let(name, value))
        } else {
            let expr = self.expr()?;
            if self.peek() == &Token::Semicolon {
                self.advance();
            }
            Ok(Stmt::Expr(expr))
        }
    }

    fn expr(&mut self) -> SandboxResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> SandboxResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.peek() == &Token::OrOr {
            self.advance();
            let rhs = self.and_expr()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> SandboxResult<Expr> {
        let mut lhs = self.equality()?;
        while self.peek() == &Token::AndAnd {
            self.advance();
            let rhs = self.equality()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> SandboxResult<Expr> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.comparison()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> SandboxResult<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> SandboxResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> SandboxResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> SandboxResult<Expr> {
        match self.peek() {
            Token::Bang => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)))
            }
            Token::Minus => {
                self.advance();
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> SandboxResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = match self.advance() {
                        Token::Ident(name) => name,
                        other => {
                            return Err(SandboxError::Parse(format!(
                                "expected field name, found {other:?}"
                            )))
                        }
                    };
                    expr = Expr::Field(Box::new(expr), name);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> SandboxResult<Expr> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::String(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => {
                if self.peek() == &Token::LParen {
                    self.advance();
                    let args = self.call_args()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::If => {
                let cond = self.expr()?;
                self.expect(&Token::LBrace)?;
                let then_branch = self.expr()?;
                self.expect(&Token::RBrace)?;
                self.expect(&Token::Else)?;
                self.expect(&Token::LBrace)?;
                let else_branch = self.expr()?;
                self.expect(&Token::RBrace)?;
                Ok(Expr::If(
                    Box::new(cond),
                    Box::new(then_branch),
                    Box::new(else_branch),
                ))
            }
            other => Err(SandboxError::Parse(format!("unexpected token {other:?}"))),
        }
    }

    fn call_args(&mut self) -> SandboxResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek() == &Token::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => break,
                other => return Err(SandboxError::Parse(format!("expected ',' or ')', found {other:?}"))),
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_equality_as_single_expression_statement() {
        let program = Parser::parse(r#"event.new_state.state == "Home""#).unwrap();
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Stmt::Expr(Expr::Binary(BinaryOp::Eq, _, _))));
    }

    #[test]
    fn parses_let_binding_then_trailing_expression() {
        let program = Parser::parse("let x = 1 + 2; x > 2").unwrap();
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0], Stmt::Let(_, _)));
    }

    #[test]
    fn parses_if_else_expression() {
        let program = Parser::parse("if event.ok { true } else { false }").unwrap();
        assert!(matches!(program.statements[0], Stmt::Expr(Expr::If(_, _, _))));
    }
}
