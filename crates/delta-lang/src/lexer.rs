//! Tokenizer
//!
//! Hand-written single pass over the characters; `//` comments and
//! whitespace are skipped, every token records where it started.

use crate::error::{ParseError, Span};
use std::fmt;

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// Unsigned integer literal; sign is applied by the parser
    Int(u64),
    Double(f64),
    Str(String),
    Def,
    True,
    False,
    Null,
    ParenOpen,
    ParenClose,
    BraceOpen,
    BraceClose,
    BracketOpen,
    BracketClose,
    Comma,
    Semicolon,
    Question,
    Colon,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    Bang,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier `{name}`"),
            Self::Int(value) => write!(f, "integer `{value}`"),
            Self::Double(value) => write!(f, "number `{value}`"),
            Self::Str(_) => write!(f, "string literal"),
            Self::Def => write!(f, "`def`"),
            Self::True => write!(f, "`true`"),
            Self::False => write!(f, "`false`"),
            Self::Null => write!(f, "`null`"),
            Self::ParenOpen => write!(f, "`(`"),
            Self::ParenClose => write!(f, "`)`"),
            Self::BraceOpen => write!(f, "`{{`"),
            Self::BraceClose => write!(f, "`}}`"),
            Self::BracketOpen => write!(f, "`[`"),
            Self::BracketClose => write!(f, "`]`"),
            Self::Comma => write!(f, "`,`"),
            Self::Semicolon => write!(f, "`;`"),
            Self::Question => write!(f, "`?`"),
            Self::Colon => write!(f, "`:`"),
            Self::Assign => write!(f, "`=`"),
            Self::Plus => write!(f, "`+`"),
            Self::Minus => write!(f, "`-`"),
            Self::Star => write!(f, "`*`"),
            Self::Slash => write!(f, "`/`"),
            Self::Percent => write!(f, "`%`"),
            Self::EqualEqual => write!(f, "`==`"),
            Self::NotEqual => write!(f, "`!=`"),
            Self::Less => write!(f, "`<`"),
            Self::LessEqual => write!(f, "`<=`"),
            Self::Greater => write!(f, "`>`"),
            Self::GreaterEqual => write!(f, "`>=`"),
            Self::AndAnd => write!(f, "`&&`"),
            Self::OrOr => write!(f, "`||`"),
            Self::Bang => write!(f, "`!`"),
        }
    }
}

/// Token with its start position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

struct Cursor<'src> {
    chars: std::iter::Peekable<std::str::Chars<'src>>,
    line: u32,
    column: u32,
}

impl<'src> Cursor<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }
}

/// Split source text into tokens
///
/// # Errors
/// Returns [`ParseError`] on unknown characters, unterminated strings and
/// malformed numbers.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();

    while let Some(ch) = cursor.peek() {
        if ch.is_whitespace() {
            cursor.bump();
            continue;
        }

        let span = cursor.span();
        let kind = match ch {
            '/' => {
                cursor.bump();
                if cursor.eat('/') {
                    while let Some(c) = cursor.peek() {
                        if c == '\n' {
                            break;
                        }
                        cursor.bump();
                    }
                    continue;
                }
                TokenKind::Slash
            }
            '0'..='9' => lex_number(&mut cursor, span)?,
            '"' => lex_string(&mut cursor, span)?,
            c if c.is_alphabetic() || c == '_' => lex_word(&mut cursor),
            _ => {
                cursor.bump();
                lex_symbol(ch, &mut cursor).ok_or(ParseError::UnexpectedChar { found: ch, span })?
            }
        };
        tokens.push(Token { kind, span });
    }

    Ok(tokens)
}

fn lex_symbol(ch: char, cursor: &mut Cursor<'_>) -> Option<TokenKind> {
    let kind = match ch {
        '(' => TokenKind::ParenOpen,
        ')' => TokenKind::ParenClose,
        '{' => TokenKind::BraceOpen,
        '}' => TokenKind::BraceClose,
        '[' => TokenKind::BracketOpen,
        ']' => TokenKind::BracketClose,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        '?' => TokenKind::Question,
        ':' => TokenKind::Colon,
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '%' => TokenKind::Percent,
        '=' if cursor.eat('=') => TokenKind::EqualEqual,
        '=' => TokenKind::Assign,
        '!' if cursor.eat('=') => TokenKind::NotEqual,
        '!' => TokenKind::Bang,
        '<' if cursor.eat('=') => TokenKind::LessEqual,
        '<' => TokenKind::Less,
        '>' if cursor.eat('=') => TokenKind::GreaterEqual,
        '>' => TokenKind::Greater,
        '&' if cursor.eat('&') => TokenKind::AndAnd,
        '|' if cursor.eat('|') => TokenKind::OrOr,
        _ => return None,
    };
    Some(kind)
}

fn lex_number(cursor: &mut Cursor<'_>, span: Span) -> Result<TokenKind, ParseError> {
    let mut literal = String::new();
    let mut is_double = false;

    while let Some(c) = cursor.peek() {
        match c {
            '0'..='9' => literal.push(c),
            '.' if !is_double => {
                is_double = true;
                literal.push(c);
            }
            'e' | 'E' => {
                is_double = true;
                literal.push(c);
                cursor.bump();
                if let Some(sign @ ('+' | '-')) = cursor.peek() {
                    literal.push(sign);
                    cursor.bump();
                }
                continue;
            }
            _ => break,
        }
        cursor.bump();
    }

    let invalid = || ParseError::InvalidNumber {
        literal: literal.clone(),
        span,
    };
    if is_double {
        literal.parse::<f64>().map(TokenKind::Double).map_err(|_| invalid())
    } else {
        literal.parse::<u64>().map(TokenKind::Int).map_err(|_| invalid())
    }
}

fn lex_string(cursor: &mut Cursor<'_>, span: Span) -> Result<TokenKind, ParseError> {
    cursor.bump();
    let mut value = String::new();
    loop {
        match cursor.bump() {
            None => return Err(ParseError::UnterminatedString { span }),
            Some('"') => return Ok(TokenKind::Str(value)),
            Some('\\') => match cursor.bump() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some(other) => value.push(other),
                None => return Err(ParseError::UnterminatedString { span }),
            },
            Some(other) => value.push(other),
        }
    }
}

fn lex_word(cursor: &mut Cursor<'_>) -> TokenKind {
    let mut word = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            cursor.bump();
        } else {
            break;
        }
    }
    match word.as_str() {
        "def" => TokenKind::Def,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        _ => TokenKind::Ident(word),
    }
}
