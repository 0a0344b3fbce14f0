//! Recursive-descent parser for the statement language.
//!
//! Precedence, loosest first: `or`/`|`, `and`/`&`, `not`/`!`, comparisons,
//! `+ -`, `* / %`, unary `-`, then postfix indexing and method calls.

use crate::ast::{Args, BinOp, Expr, Lit, Stmt, UnOp};
use crate::error::{Result, ScriptError};
use crate::lexer::{Spanned, Token, tokenize};

/// Parse a full program (one statement per line) into an AST.
pub fn parse_program(source: &str) -> Result<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut stmts = Vec::new();
    loop {
        parser.skip_newlines();
        if parser.at_end() {
            break;
        }
        stmts.push(parser.statement()?);
        if !parser.at_end() {
            parser.expect(&Token::Newline, "end of statement")?;
        }
    }
    Ok(stmts)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or(0, |s| s.line)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        self.pos += 1;
        token
    }

    fn check(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<()> {
        if self.check(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}, found {:?}", self.peek())))
        }
    }

    fn error(&self, message: String) -> ScriptError {
        ScriptError::Syntax {
            line: self.line(),
            message,
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Token::Newline) {
            self.pos += 1;
        }
    }

    fn statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        if self.check(&Token::Assign) {
            let value = self.expression()?;
            Ok(Stmt::Assign {
                target: expr,
                value,
            })
        } else {
            Ok(Stmt::Expr(expr))
        }
    }

    fn expression(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while self.check(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.not_expr()?;
        while self.check(&Token::And) {
            let rhs = self.not_expr()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.check(&Token::Not) {
            let expr = self.not_expr()?;
            Ok(Expr::Unary {
                op: UnOp::Not,
                expr: Box::new(expr),
            })
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.check(&Token::Minus) {
            let expr = self.unary()?;
            Ok(Expr::Unary {
                op: UnOp::Neg,
                expr: Box::new(expr),
            })
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        // A bare identifier immediately followed by `(` is a free function.
        if let Expr::Ident(name) = &expr {
            if self.peek() == Some(&Token::LParen) {
                let name = name.clone();
                self.pos += 1;
                let args = self.arguments()?;
                expr = Expr::Call { name, args };
            }
        }

        loop {
            if self.check(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index {
                    recv: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.check(&Token::Dot) {
                let mut name = self.ident("method name")?;
                // Namespaced methods read as dotted names: `.str.upper()`.
                while self.peek() == Some(&Token::Dot)
                    && matches!(self.peek_at(1), Some(Token::Ident(_)))
                {
                    self.pos += 1;
                    name.push('.');
                    name.push_str(&self.ident("method name")?);
                }
                self.expect(&Token::LParen, "'(' after method name")?;
                let args = self.arguments()?;
                expr = Expr::MethodCall {
                    recv: Box::new(expr),
                    name,
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Int(v)) => Ok(Expr::Literal(Lit::Int(v))),
            Some(Token::Float(v)) => Ok(Expr::Literal(Lit::Float(v))),
            Some(Token::Str(v)) => Ok(Expr::Literal(Lit::Str(v))),
            Some(Token::True) => Ok(Expr::Literal(Lit::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Lit::Bool(false))),
            Some(Token::None) => Ok(Expr::Literal(Lit::Null)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::Lambda) => {
                let param = self.ident("lambda parameter")?;
                self.expect(&Token::Colon, "':' after lambda parameter")?;
                let body = self.expression()?;
                Ok(Expr::Lambda {
                    param,
                    body: Box::new(body),
                })
            }
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.check(&Token::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if !self.check(&Token::Comma) {
                            break;
                        }
                        if self.peek() == Some(&Token::RBracket) {
                            break;
                        }
                    }
                    self.expect(&Token::RBracket, "']'")?;
                }
                Ok(Expr::List(items))
            }
            Some(Token::LBrace) => {
                let mut entries = Vec::new();
                if !self.check(&Token::RBrace) {
                    loop {
                        let key = self.expression()?;
                        self.expect(&Token::Colon, "':' in dict literal")?;
                        let value = self.expression()?;
                        entries.push((key, value));
                        if !self.check(&Token::Comma) {
                            break;
                        }
                        if self.peek() == Some(&Token::RBrace) {
                            break;
                        }
                    }
                    self.expect(&Token::RBrace, "'}'")?;
                }
                Ok(Expr::Dict(entries))
            }
            other => Err(self.error(format!("unexpected token: {other:?}"))),
        }
    }

    fn arguments(&mut self) -> Result<Args> {
        let mut args = Args::default();
        if self.check(&Token::RParen) {
            return Ok(args);
        }
        loop {
            // `name=expr` keyword argument (two-token lookahead keeps this
            // apart from a positional comparison like `a == b`).
            if let (Some(Token::Ident(name)), Some(Token::Assign)) =
                (self.peek(), self.peek_at(1))
            {
                let name = name.clone();
                self.pos += 2;
                let value = self.expression()?;
                args.keywords.push((name, value));
            } else {
                if !args.keywords.is_empty() {
                    return Err(
                        self.error("positional argument after keyword argument".to_string())
                    );
                }
                args.positional.push(self.expression()?);
            }
            if !self.check(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "')'")?;
        Ok(args)
    }

    fn ident(&mut self, what: &str) -> Result<String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(self.error(format!("expected {what}, found {other:?}"))),
        }
    }
}
