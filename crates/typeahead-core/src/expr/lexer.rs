//! Tokenizer for the expression language.

use crate::error::{Result, TypeaheadError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

/// A token with the 1-based column it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub column: usize,
}

// Longest operators first so `===` wins over `==`.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!",
    "?", ":", ".", ",", "(", ")", "[", "]", "{", "}", "|",
];

pub fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

pub fn is_ident_part(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let column = i + 1;

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<f64>().map_err(|_| syntax(input, column, format!("invalid number '{text}'")))?;
            tokens.push(Spanned { token: Token::Number(value), column });
            continue;
        }

        if ch == '\'' || ch == '"' {
            let quote = ch;
            let mut value = String::new();
            i += 1;
            loop {
                match chars.get(i).copied() {
                    None => return Err(syntax(input, column, "unterminated string".to_string())),
                    Some(c) if c == quote => {
                        i += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = chars
                            .get(i + 1)
                            .ok_or_else(|| syntax(input, i + 1, "dangling escape".to_string()))?;
                        value.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => *other,
                        });
                        i += 2;
                    }
                    Some(c) => {
                        value.push(c);
                        i += 1;
                    }
                }
            }
            tokens.push(Spanned { token: Token::Str(value), column });
            continue;
        }

        if is_ident_start(ch) {
            let start = i;
            while i < chars.len() && is_ident_part(chars[i]) {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            tokens.push(Spanned { token: Token::Ident(name), column });
            continue;
        }

        let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
        match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            Some(op) => {
                tokens.push(Spanned { token: Token::Punct(*op), column });
                i += op.chars().count();
            }
            None => return Err(syntax(input, column, format!("unexpected character '{ch}'"))),
        }
    }

    Ok(tokens)
}

pub fn syntax(expr: &str, column: usize, message: String) -> TypeaheadError {
    TypeaheadError::Syntax {
        expr: expr.to_string(),
        column,
        message,
    }
}
