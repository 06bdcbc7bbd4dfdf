// SPDX-License-Identifier: MIT

//! Recursive-descent compiler for search expressions
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! OrExpr  := AndExpr ( '||' AndExpr )*
//! AndExpr := NotExpr ( '&&' NotExpr )*
//! NotExpr := '~'? Primary
//! Primary := '(' OrExpr ')' | Literal
//! ```
//!
//! A single `~` binds to the primary right after it, so `~~x` is rejected;
//! write `~(~x)` instead.
//!
//! Chains of `&&`/`||` are parsed in a loop. Only groups recurse, and they
//! nest at most [`MAX_NESTING`] deep.

use std::str::FromStr;

use super::ast::Expression;
use super::error::{ParseError, ParseErrorKind};
use super::lexer::{tokenize, Token, TokenKind};

const EXPECT_OPERAND: &str = "a literal or '('";
const EXPECT_OPERATOR: &str = "'&&', '||' or end of input";
const EXPECT_GROUP_END: &str = "'&&', '||' or ')'";
const EXPECT_SHALLOWER: &str = "at most 128 nested groups";

/// Deepest accepted nesting of parenthesised groups
pub const MAX_NESTING: usize = 128;

/// Compile a search expression into an AST
pub fn compile(source: &str) -> Result<Expression, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::EmptyExpression,
            0,
            EXPECT_OPERAND,
        ));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.chars().count(),
        depth: 0,
    };
    let expr = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        return Err(match token.kind {
            TokenKind::RParen => ParseError::new(
                ParseErrorKind::UnexpectedCloseParen,
                token.offset,
                EXPECT_OPERATOR,
            ),
            _ => ParseError::unexpected(token.kind.describe(), token.offset, EXPECT_OPERATOR),
        });
    }

    Ok(expr)
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        compile(s)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Character length of the source, reported for errors at end of input
    end: usize,
    /// Groups currently open
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn previous(&self) -> Option<&Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expression::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expression::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if self.eat(&TokenKind::Not) {
            return Ok(Expression::not(self.parse_primary()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let follows_operator = matches!(
            self.previous().map(|t| &t.kind),
            Some(TokenKind::And | TokenKind::Or | TokenKind::Not)
        );

        let token = match self.peek() {
            Some(token) => token.clone(),
            None if follows_operator => {
                return Err(ParseError::new(
                    ParseErrorKind::MissingOperand,
                    self.end,
                    EXPECT_OPERAND,
                ));
            }
            // Input never ends at an operand position except right after '('
            None => {
                let open = self.previous().map(|t| t.offset).unwrap_or(0);
                return Err(ParseError::new(ParseErrorKind::UnclosedGroup, open, "')'"));
            }
        };

        match token.kind {
            TokenKind::Literal { text, quoted } => {
                self.pos += 1;
                Ok(Expression::Literal { text, quoted })
            }
            TokenKind::LParen => {
                if self.depth == MAX_NESTING {
                    return Err(ParseError::unexpected(
                        "'('",
                        token.offset,
                        EXPECT_SHALLOWER,
                    ));
                }
                self.pos += 1;
                self.depth += 1;
                let inner = self.parse_or()?;
                self.depth -= 1;
                if self.eat(&TokenKind::RParen) {
                    return Ok(inner);
                }
                match self.peek() {
                    Some(other) => Err(ParseError::unexpected(
                        other.kind.describe(),
                        other.offset,
                        EXPECT_GROUP_END,
                    )),
                    None => Err(ParseError::new(
                        ParseErrorKind::UnclosedGroup,
                        token.offset,
                        "')'",
                    )),
                }
            }
            TokenKind::RParen | TokenKind::And | TokenKind::Or if follows_operator => Err(
                ParseError::new(ParseErrorKind::MissingOperand, token.offset, EXPECT_OPERAND),
            ),
            TokenKind::RParen if self.pos == 0 => Err(ParseError::new(
                ParseErrorKind::UnexpectedCloseParen,
                token.offset,
                EXPECT_OPERAND,
            )),
            other => Err(ParseError::unexpected(
                other.describe(),
                token.offset,
                EXPECT_OPERAND,
            )),
        }
    }
}
