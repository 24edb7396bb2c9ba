//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, lowest first:
//! ```text
//! expr | filter:arg:arg     → filter chain
//! a ? b : c                → ternary
//! ||  &&                   → logical
//! == != === !==            → equality
//! < > <= >=                → relational
//! + -   * / %              → arithmetic
//! ! - +                    → unary
//! a.b  a[b]  f(x)          → postfix
//! ```

use serde_json::Value;

use super::lexer::{self, Spanned, Token};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Filter {
        input: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
}

impl BinaryOp {
    fn from_punct(punct: &str) -> Option<Self> {
        Some(match punct {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "<=" => Self::Le,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "===" => Self::StrictEq,
            "!==" => Self::StrictNe,
            "&&" => Self::And,
            "||" => Self::Or,
            _ => return None,
        })
    }
}

/// Parse a complete expression; trailing tokens are an error.
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = lexer::tokenize(input)?;
    let mut parser = Parser { input, tokens, pos: 0 };
    if parser.tokens.is_empty() {
        return Err(lexer::syntax(input, 1, "empty expression".to_string()));
    }
    let expr = parser.filter_chain()?;
    if let Some(extra) = parser.peek() {
        return Err(lexer::syntax(
            input,
            extra.column,
            format!("unexpected {}", describe(&extra.token)),
        ));
    }
    Ok(expr)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Spanned { token: Token::Punct(p), .. }) if *p == punct)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.peek_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{punct}'")))
        }
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: String) -> crate::error::TypeaheadError {
        let column = match self.peek() {
            Some(token) => token.column,
            None => self.input.chars().count() + 1,
        };
        let found = self
            .peek()
            .map(|t| describe(&t.token))
            .unwrap_or_else(|| "end of input".to_string());
        lexer::syntax(self.input, column, format!("{message}, found {found}"))
    }

    fn ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(Spanned { token: Token::Ident(name), .. }) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("expected identifier".to_string())),
        }
    }

    fn filter_chain(&mut self) -> Result<Expr> {
        let mut expr = self.ternary()?;
        while self.eat_punct("|") {
            let name = self.ident()?;
            let mut args = Vec::new();
            while self.eat_punct(":") {
                args.push(self.ternary()?);
            }
            expr = Expr::Filter {
                input: Box::new(expr),
                name,
                args,
            };
        }
        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr> {
        let test = self.binary(0)?;
        if self.eat_punct("?") {
            let then = self.ternary()?;
            self.expect_punct(":")?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary(Box::new(test), Box::new(then), Box::new(otherwise)));
        }
        Ok(test)
    }

    /// Precedence climbing over the binary operator levels.
    fn binary(&mut self, level: usize) -> Result<Expr> {
        const LEVELS: &[&[&str]] = &[
            &["||"],
            &["&&"],
            &["==", "!=", "===", "!=="],
            &["<", ">", "<=", ">="],
            &["+", "-"],
            &["*", "/", "%"],
        ];

        if level == LEVELS.len() {
            return self.unary();
        }

        let mut left = self.binary(level + 1)?;
        loop {
            let op = match self.peek() {
                Some(Spanned { token: Token::Punct(p), .. }) if LEVELS[level].contains(p) => *p,
                _ => break,
            };
            self.pos += 1;
            let right = self.binary(level + 1)?;
            let op = BinaryOp::from_punct(op)
                .ok_or_else(|| self.error(format!("unknown operator '{op}'")))?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = if self.eat_punct("!") {
            UnaryOp::Not
        } else if self.eat_punct("-") {
            UnaryOp::Neg
        } else if self.eat_punct("+") {
            UnaryOp::Plus
        } else {
            return self.postfix();
        };
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let name = self.ident()?;
                expr = Expr::Member(Box::new(expr), name);
            } else if self.eat_punct("[") {
                let index = self.filter_chain()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.peek_punct("(") {
                let name = match expr {
                    Expr::Ident(name) => name,
                    _ => return Err(self.error("only named functions can be called".to_string())),
                };
                self.pos += 1;
                let args = self.list(")")?;
                expr = Expr::Call(name, args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn list(&mut self, close: &str) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat_punct(close) {
            return Ok(items);
        }
        loop {
            items.push(self.filter_chain()?);
            if self.eat_punct(close) {
                return Ok(items);
            }
            self.expect_punct(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.eat_punct("(") {
            let expr = self.filter_chain()?;
            self.expect_punct(")")?;
            return Ok(expr);
        }
        if self.eat_punct("[") {
            return Ok(Expr::Array(self.list("]")?));
        }
        if self.eat_punct("{") {
            return self.object();
        }

        let Some(spanned) = self.next() else {
            return Err(self.error("expected expression".to_string()));
        };
        match spanned.token {
            Token::Number(n) => Ok(Expr::Literal(super::eval::number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" | "undefined" => Expr::Literal(Value::Null),
                _ => Expr::Ident(name),
            }),
            Token::Punct(p) => {
                self.pos -= 1;
                Err(self.error(format!("unexpected '{p}'")))
            }
        }
    }

    fn object(&mut self) -> Result<Expr> {
        let mut entries = Vec::new();
        if self.eat_punct("}") {
            return Ok(Expr::Object(entries));
        }
        loop {
            let key = match self.peek().map(|t| &t.token) {
                Some(Token::Ident(name)) | Some(Token::Str(name)) => name.clone(),
                _ => return Err(self.error("expected object key".to_string())),
            };
            self.pos += 1;
            self.expect_punct(":")?;
            entries.push((key, self.ternary()?));
            if self.eat_punct("}") {
                return Ok(Expr::Object(entries));
            }
            self.expect_punct(",")?;
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("number {n}"),
        Token::Str(s) => format!("string '{s}'"),
        Token::Ident(name) => format!("'{name}'"),
        Token::Punct(p) => format!("'{p}'"),
    }
}
