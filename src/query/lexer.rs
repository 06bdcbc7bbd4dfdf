// SPDX-License-Identifier: MIT

//! Tokenizer for search expressions
//!
//! Offsets are counted in characters from the start of the untrimmed source.

use super::error::{ParseError, ParseErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `~`
    Not,
    Literal {
        text: String,
        quoted: bool,
    },
}

impl TokenKind {
    /// Short human-readable form used in error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::And => "'&&'".to_string(),
            TokenKind::Or => "'||'".to_string(),
            TokenKind::Not => "'~'".to_string(),
            TokenKind::Literal { text, quoted: true } => format!("literal '{}'", text),
            TokenKind::Literal { text, .. } => format!("literal {}", text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Characters that end a bare literal
fn is_reserved(c: char) -> bool {
    matches!(c, '(' | ')' | '&' | '|' | '~' | '\'')
}

/// Split `source` into tokens, skipping whitespace between them
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let kind = match c {
            '(' => {
                i += 1;
                TokenKind::LParen
            }
            ')' => {
                i += 1;
                TokenKind::RParen
            }
            '~' => {
                i += 1;
                TokenKind::Not
            }
            '&' | '|' => {
                // Only the doubled form is an operator
                if chars.get(i + 1) != Some(&c) {
                    let expected = if c == '&' { "'&&'" } else { "'||'" };
                    return Err(ParseError::unexpected(format!("'{}'", c), start, expected));
                }
                i += 2;
                if c == '&' {
                    TokenKind::And
                } else {
                    TokenKind::Or
                }
            }
            '\'' => {
                let body = start + 1;
                let len = chars[body..]
                    .iter()
                    .position(|&ch| ch == '\'')
                    .ok_or_else(|| {
                        ParseError::new(ParseErrorKind::UnterminatedLiteral, start, "closing \"'\"")
                    })?;
                if len == 0 {
                    return Err(ParseError::unexpected("''", start, "a non-empty literal"));
                }
                i = body + len + 1;
                TokenKind::Literal {
                    text: chars[body..body + len].iter().collect(),
                    quoted: true,
                }
            }
            _ => {
                while i < chars.len() && !chars[i].is_whitespace() && !is_reserved(chars[i]) {
                    i += 1;
                }
                TokenKind::Literal {
                    text: chars[start..i].iter().collect(),
                    quoted: false,
                }
            }
        };

        tokens.push(Token {
            kind,
            offset: start,
        });
    }

    Ok(tokens)
}
