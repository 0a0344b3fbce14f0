//! Tokenizer for the statement language.
//!
//! Statements are newline-separated. `#` starts a comment that runs to the
//! end of the line, which is how `#sq_action:` trailer tags are ignored by
//! the interpreter while staying visible in the log file.

use crate::error::{Result, ScriptError};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Lambda,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Newline,
}

/// A token plus the 1-based source line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1usize;

    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' | '\t' | '\r' => {
                chars.next();
            }
            '\n' => {
                chars.next();
                // Collapse runs of blank lines into one separator.
                if !matches!(tokens.last(), None | Some(Spanned { token: Token::Newline, .. })) {
                    tokens.push(Spanned {
                        token: Token::Newline,
                        line,
                    });
                }
                line += 1;
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        if !matches!(
                            tokens.last(),
                            None | Some(Spanned { token: Token::Newline, .. })
                        ) {
                            tokens.push(Spanned {
                                token: Token::Newline,
                                line,
                            });
                        }
                        line += 1;
                        break;
                    }
                }
            }
            '\'' | '"' => {
                let token = read_string(&mut chars, line)?;
                tokens.push(Spanned { token, line });
            }
            '0'..='9' => {
                let token = read_number(&mut chars, line)?;
                tokens.push(Spanned { token, line });
            }
            c if c.is_alphabetic() || c == '_' => {
                let token = read_ident(&mut chars);
                tokens.push(Spanned { token, line });
            }
            _ => {
                let token = read_punct(&mut chars, line)?;
                tokens.push(Spanned { token, line });
            }
        }
    }
    Ok(tokens)
}

fn read_string<I>(chars: &mut std::iter::Peekable<I>, line: usize) -> Result<Token>
where
    I: Iterator<Item = char>,
{
    let quote = chars.next().unwrap_or('\'');
    let mut out = String::new();
    loop {
        match chars.next() {
            Some(c) if c == quote => return Ok(Token::Str(out)),
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                // Keep unknown escapes verbatim so regex snippets like
                // '\s+' survive the round trip.
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => {
                    return Err(ScriptError::Syntax {
                        line,
                        message: "unterminated string literal".to_string(),
                    });
                }
            },
            Some('\n') | None => {
                return Err(ScriptError::Syntax {
                    line,
                    message: "unterminated string literal".to_string(),
                });
            }
            Some(c) => out.push(c),
        }
    }
}

fn read_number<I>(chars: &mut std::iter::Peekable<I>, line: usize) -> Result<Token>
where
    I: Iterator<Item = char>,
{
    let mut raw = String::new();
    let mut is_float = false;
    while let Some(&c) = chars.peek() {
        match c {
            '0'..='9' => {
                raw.push(c);
                chars.next();
            }
            '.' => {
                if is_float {
                    break;
                }
                is_float = true;
                raw.push(c);
                chars.next();
            }
            'e' | 'E' => {
                is_float = true;
                raw.push(c);
                chars.next();
                if let Some(&sign @ ('+' | '-')) = chars.peek() {
                    raw.push(sign);
                    chars.next();
                }
            }
            _ => break,
        }
    }
    if is_float {
        raw.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| ScriptError::Syntax {
                line,
                message: format!("invalid number literal: {raw}"),
            })
    } else {
        raw.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| ScriptError::Syntax {
                line,
                message: format!("invalid number literal: {raw}"),
            })
    }
}

fn read_ident<I>(chars: &mut std::iter::Peekable<I>) -> Token
where
    I: Iterator<Item = char>,
{
    let mut raw = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            raw.push(c);
            chars.next();
        } else {
            break;
        }
    }
    match raw.as_str() {
        "True" | "true" => Token::True,
        "False" | "false" => Token::False,
        "None" | "null" => Token::None,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "lambda" => Token::Lambda,
        _ => Token::Ident(raw),
    }
}

fn read_punct<I>(chars: &mut std::iter::Peekable<I>, line: usize) -> Result<Token>
where
    I: Iterator<Item = char>,
{
    let c = chars.next().unwrap_or('\0');
    let token = match c {
        '=' => {
            if chars.peek() == Some(&'=') {
                chars.next();
                Token::Eq
            } else {
                Token::Assign
            }
        }
        '!' => {
            if chars.peek() == Some(&'=') {
                chars.next();
                Token::Ne
            } else {
                Token::Not
            }
        }
        '<' => {
            if chars.peek() == Some(&'=') {
                chars.next();
                Token::Le
            } else {
                Token::Lt
            }
        }
        '>' => {
            if chars.peek() == Some(&'=') {
                chars.next();
                Token::Ge
            } else {
                Token::Gt
            }
        }
        '&' => Token::And,
        '|' => Token::Or,
        '+' => Token::Plus,
        '-' => Token::Minus,
        '*' => Token::Star,
        '/' => Token::Slash,
        '%' => Token::Percent,
        '(' => Token::LParen,
        ')' => Token::RParen,
        '[' => Token::LBracket,
        ']' => Token::RBracket,
        '{' => Token::LBrace,
        '}' => Token::RBrace,
        ',' => Token::Comma,
        ':' => Token::Colon,
        '.' => Token::Dot,
        other => {
            return Err(ScriptError::Syntax {
                line,
                message: format!("unexpected character: {other:?}"),
            });
        }
    };
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_assignment() {
        let tokens = tokenize("tables['T'] = 1  #sq_action:Add").unwrap();
        let kinds: Vec<&Token> = tokens.iter().map(|t| &t.token).collect();
        assert_eq!(
            kinds,
            vec![
                &Token::Ident("tables".into()),
                &Token::LBracket,
                &Token::Str("T".into()),
                &Token::RBracket,
                &Token::Assign,
                &Token::Int(1),
            ]
        );
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        let tokens = tokenize("1 # comment == junk\n2").unwrap();
        let kinds: Vec<&Token> = tokens.iter().map(|t| &t.token).collect();
        assert_eq!(kinds, vec![&Token::Int(1), &Token::Newline, &Token::Int(2)]);
    }

    #[test]
    fn test_lenient_escapes_keep_backslash() {
        let tokens = tokenize(r"'\s+'").unwrap();
        assert_eq!(tokens[0].token, Token::Str("\\s+".to_string()));
    }

    #[test]
    fn test_operators() {
        let tokens = tokenize("a == b != c <= d >= e & f | g").unwrap();
        let ops: Vec<&Token> = tokens
            .iter()
            .map(|t| &t.token)
            .filter(|t| !matches!(t, Token::Ident(_)))
            .collect();
        assert_eq!(
            ops,
            vec![
                &Token::Eq,
                &Token::Ne,
                &Token::Le,
                &Token::Ge,
                &Token::And,
                &Token::Or
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(tokenize("'abc").is_err());
    }
}
