// SPDX-License-Identifier: MIT

//! Boolean search expressions over opaque text
//!
//! Expressions combine substring literals with `&&`, `||`, `~` and
//! parentheses:
//! - `password`
//! - `quake && ~earthquake`
//! - `php && ~(sudo || Linux || '<body>')`
//!
//! Groups nest at most [`MAX_NESTING`] deep. Flat chains have no length limit.
//!
//! Matching is case-sensitive; callers wanting case-insensitive search fold
//! both the literals and the body before evaluating.

mod ast;
mod error;
mod evaluator;
mod lexer;
mod parser;

pub use ast::Expression;
pub use error::{ParseError, ParseErrorKind};
pub use evaluator::{evaluate, first_matching_literal};
pub use parser::{compile, MAX_NESTING};
