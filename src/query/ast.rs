// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for search expressions
//!
//! `a && b && c` compiles to a left-deep tree, so tree depth grows with the
//! length of a flat chain. Every walk over the tree in this crate (drop,
//! clone, equality, display, evaluation) runs on an explicit stack.

use std::fmt;
use std::mem;

/// A compiled search expression
///
/// Parentheses only steer precedence while parsing, so there is no group node.
#[derive(Debug)]
pub enum Expression {
    /// Substring pattern matched against the body
    Literal { text: String, quoted: bool },
    /// Logical NOT
    Not(Box<Expression>),
    /// Logical AND
    And(Box<Expression>, Box<Expression>),
    /// Logical OR
    Or(Box<Expression>, Box<Expression>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binary {
    And,
    Or,
}

enum Frame<'a, T> {
    Not,
    Right(Binary, &'a Expression),
    Combine(Binary, T),
}

impl Expression {
    pub fn literal(text: impl Into<String>) -> Self {
        Expression::Literal {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Expression::Literal {
            text: text.into(),
            quoted: true,
        }
    }

    pub fn not(operand: Expression) -> Self {
        Expression::Not(Box::new(operand))
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or(Box::new(left), Box::new(right))
    }

    fn binary(op: Binary, left: Expression, right: Expression) -> Self {
        match op {
            Binary::And => Expression::and(left, right),
            Binary::Or => Expression::or(left, right),
        }
    }

    /// Literal texts in pre-order (left to right as written)
    pub fn literals(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Expression::Literal { text, .. } => out.push(text.as_str()),
                Expression::Not(inner) => stack.push(inner.as_ref()),
                Expression::And(left, right) | Expression::Or(left, right) => {
                    stack.push(right.as_ref());
                    stack.push(left.as_ref());
                }
            }
        }
        out
    }

    /// Build a new tree with every literal text passed through `f`.
    ///
    /// Used by callers to apply a case policy to an already compiled tree.
    pub fn map_literals<F>(&self, f: F) -> Expression
    where
        F: Fn(&str) -> String,
    {
        self.fold(
            |text, quoted| Expression::Literal {
                text: f(text),
                quoted,
            },
            Expression::not,
            Expression::binary,
        )
    }

    /// Post-order fold, children left to right.
    pub(crate) fn fold<'a, T>(
        &'a self,
        mut leaf: impl FnMut(&'a str, bool) -> T,
        mut not: impl FnMut(T) -> T,
        mut binary: impl FnMut(Binary, T, T) -> T,
    ) -> T {
        let mut frames: Vec<Frame<'a, T>> = Vec::new();
        let mut node = self;
        loop {
            let mut value = loop {
                match node {
                    Expression::Literal { text, quoted } => break leaf(text.as_str(), *quoted),
                    Expression::Not(inner) => {
                        frames.push(Frame::Not);
                        node = inner.as_ref();
                    }
                    Expression::And(left, right) => {
                        frames.push(Frame::Right(Binary::And, right.as_ref()));
                        node = left.as_ref();
                    }
                    Expression::Or(left, right) => {
                        frames.push(Frame::Right(Binary::Or, right.as_ref()));
                        node = left.as_ref();
                    }
                }
            };

            loop {
                match frames.pop() {
                    None => return value,
                    Some(Frame::Not) => value = not(value),
                    Some(Frame::Right(op, right)) => {
                        frames.push(Frame::Combine(op, value));
                        node = right;
                        break;
                    }
                    Some(Frame::Combine(op, left)) => value = binary(op, left, value),
                }
            }
        }
    }

    /// Move the children out, leaving empty literals behind
    fn detach_children(&mut self, out: &mut Vec<Expression>) {
        match self {
            Expression::Literal { .. } => {}
            Expression::Not(inner) => out.push(mem::replace(inner.as_mut(), Expression::empty())),
            Expression::And(left, right) | Expression::Or(left, right) => {
                out.push(mem::replace(left.as_mut(), Expression::empty()));
                out.push(mem::replace(right.as_mut(), Expression::empty()));
            }
        }
    }

    fn empty() -> Self {
        Expression::Literal {
            text: String::new(),
            quoted: false,
        }
    }
}

impl Drop for Expression {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

impl Clone for Expression {
    fn clone(&self) -> Self {
        self.map_literals(str::to_string)
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        let mut pairs = vec![(self, other)];
        while let Some(pair) = pairs.pop() {
            match pair {
                (
                    Expression::Literal { text, quoted },
                    Expression::Literal {
                        text: other_text,
                        quoted: other_quoted,
                    },
                ) => {
                    if text != other_text || quoted != other_quoted {
                        return false;
                    }
                }
                (Expression::Not(a), Expression::Not(b)) => pairs.push((a.as_ref(), b.as_ref())),
                (Expression::And(a1, a2), Expression::And(b1, b2))
                | (Expression::Or(a1, a2), Expression::Or(b1, b2)) => {
                    pairs.push((a2.as_ref(), b2.as_ref()));
                    pairs.push((a1.as_ref(), b1.as_ref()));
                }
                _ => return false,
            }
        }
        true
    }
}

impl Eq for Expression {}

enum Piece<'a> {
    Node(&'a Expression, bool),
    Text(&'static str),
}

/// Renders canonical source that compiles back to an equal tree.
///
/// Binary nodes are parenthesised, except a left operand that repeats its
/// parent's operator: `a && b && c` renders as `(a && b && c)`.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pieces = vec![Piece::Node(self, true)];
        while let Some(piece) = pieces.pop() {
            let (node, grouped) = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Node(node, grouped) => (node, grouped),
            };
            match node {
                Expression::Literal { text, quoted: true } => write!(f, "'{}'", text)?,
                Expression::Literal { text, quoted: false } => f.write_str(text)?,
                Expression::Not(inner) => {
                    if matches!(inner.as_ref(), Expression::Not(_)) {
                        f.write_str("~(")?;
                        pieces.push(Piece::Text(")"));
                    } else {
                        f.write_str("~")?;
                    }
                    pieces.push(Piece::Node(inner.as_ref(), true));
                }
                Expression::And(left, right) | Expression::Or(left, right) => {
                    let (operator, chained) = match node {
                        Expression::And(..) => (" && ", matches!(left.as_ref(), Expression::And(..))),
                        _ => (" || ", matches!(left.as_ref(), Expression::Or(..))),
                    };
                    if grouped {
                        f.write_str("(")?;
                        pieces.push(Piece::Text(")"));
                    }
                    pieces.push(Piece::Node(right.as_ref(), true));
                    pieces.push(Piece::Text(operator));
                    pieces.push(Piece::Node(left.as_ref(), !chained));
                }
            }
        }
        Ok(())
    }
}
