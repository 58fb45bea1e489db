//! # Filter Lexer
//!
//! Splits a filter expression into tokens, keeping the byte offset of each
//! token for error reporting.

use super::errors::{FilterError, FilterResult};

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare `.`
    Dot,
    /// `.name`
    Field(String),
    /// Identifier or keyword
    Ident(String),
    Str(String),
    Num(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Pipe,
    Comma,
    Colon,
    Semicolon,
    Question,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eof,
}

impl Token {
    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Dot => "'.'".to_string(),
            Token::Field(name) => format!("'.{}'", name),
            Token::Ident(name) => format!("'{}'", name),
            Token::Str(s) => format!("string {:?}", s),
            Token::Num(n) => format!("number {}", n),
            Token::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Pipe => "|",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::Question => "?",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            _ => "",
        }
    }
}

/// A token and its byte offset in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokenize a filter expression. The last token is always `Eof`.
pub fn tokenize(source: &str) -> FilterResult<Vec<Spanned>> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (position, c) = chars[i];
        let peek = chars.get(i + 1).map(|&(_, c)| c);

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, consumed) = match (c, peek) {
            ('.', Some(n)) if is_ident_start(n) => {
                let name = take_while(&chars[i + 1..], is_ident_char);
                let len = name.chars().count() + 1;
                (Token::Field(name), len)
            }
            ('.', _) => (Token::Dot, 1),
            ('=', Some('=')) => (Token::Eq, 2),
            ('!', Some('=')) => (Token::Ne, 2),
            ('<', Some('=')) => (Token::Le, 2),
            ('>', Some('=')) => (Token::Ge, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            ('|', _) => (Token::Pipe, 1),
            (',', _) => (Token::Comma, 1),
            (':', _) => (Token::Colon, 1),
            (';', _) => (Token::Semicolon, 1),
            ('?', _) => (Token::Question, 1),
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('"', _) => lex_string(&chars[i..], position)?,
            (c, _) if c.is_ascii_digit() => lex_number(&chars[i..], position)?,
            (c, _) if is_ident_start(c) => {
                let name = take_while(&chars[i..], is_ident_char);
                let len = name.chars().count();
                (Token::Ident(name), len)
            }
            (c, _) => {
                return Err(FilterError::parse(
                    position,
                    format!("unexpected character '{}'", c),
                ))
            }
        };

        tokens.push(Spanned { token, position });
        i += consumed;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        position: source.len(),
    });
    Ok(tokens)
}

fn take_while(chars: &[(usize, char)], pred: fn(char) -> bool) -> String {
    chars.iter().map(|&(_, c)| c).take_while(|&c| pred(c)).collect()
}

fn lex_number(chars: &[(usize, char)], position: usize) -> FilterResult<(Token, usize)> {
    let mut text = String::new();
    let mut seen_dot = false;
    let mut seen_exp = false;

    for (idx, &(_, c)) in chars.iter().enumerate() {
        let prev = if idx > 0 { Some(chars[idx - 1].1) } else { None };
        let accept = match c {
            '0'..='9' => true,
            '.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                true
            }
            'e' | 'E' if !seen_exp => {
                seen_exp = true;
                true
            }
            '+' | '-' => matches!(prev, Some('e') | Some('E')),
            _ => false,
        };
        if !accept {
            break;
        }
        text.push(c);
    }

    let value: f64 = text
        .parse()
        .map_err(|_| FilterError::parse(position, format!("invalid number '{}'", text)))?;
    Ok((Token::Num(value), text.chars().count()))
}

fn lex_string(chars: &[(usize, char)], position: usize) -> FilterResult<(Token, usize)> {
    let mut value = String::new();
    let mut i = 1;

    while i < chars.len() {
        let c = chars[i].1;
        match c {
            '"' => return Ok((Token::Str(value), i + 1)),
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .map(|&(_, c)| c)
                    .ok_or_else(|| FilterError::parse(position, "unterminated string"))?;
                match escaped {
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    '/' => value.push('/'),
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    'u' => {
                        let hex: String = chars
                            .iter()
                            .skip(i + 2)
                            .take(4)
                            .map(|&(_, c)| c)
                            .collect();
                        let code = u32::from_str_radix(&hex, 16)
                            .ok()
                            .filter(|_| hex.len() == 4)
                            .and_then(char::from_u32)
                            .ok_or_else(|| {
                                FilterError::parse(chars[i].0, "invalid unicode escape")
                            })?;
                        value.push(code);
                        i += 4;
                    }
                    other => {
                        return Err(FilterError::parse(
                            chars[i].0,
                            format!("invalid escape '\\{}'", other),
                        ))
                    }
                }
                i += 2;
            }
            c => {
                value.push(c);
                i += 1;
            }
        }
    }

    Err(FilterError::parse(position, "unterminated string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_path_tokens() {
        assert_eq!(
            kinds(".a.b[0]"),
            vec![
                Token::Field("a".into()),
                Token::Field("b".into()),
                Token::LBracket,
                Token::Num(0.0),
                Token::RBracket,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds(". == 1 != <= >= < >"),
            vec![
                Token::Dot,
                Token::Eq,
                Token::Num(1.0),
                Token::Ne,
                Token::Le,
                Token::Ge,
                Token::Lt,
                Token::Gt,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\nA""#),
            vec![Token::Str("a\"b\nA".into()), Token::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1.5 2e3 10"),
            vec![
                Token::Num(1.5),
                Token::Num(2000.0),
                Token::Num(10.0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("  .a | b").unwrap();
        assert_eq!(tokens[0].position, 2);
        assert_eq!(tokens[1].position, 5);
        assert_eq!(tokens[2].position, 7);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(tokenize("\"open"), Err(FilterError::Parse { .. })));
        assert!(matches!(
            tokenize(".a & .b"),
            Err(FilterError::Parse { position: 3, .. })
        ));
    }
}
