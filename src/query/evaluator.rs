// SPDX-License-Identifier: MIT

//! Search expression evaluator
//!
//! Evaluation is pure: the body is borrowed for the duration of the call and
//! the tree is never mutated, so one compiled expression can be shared across
//! threads and evaluated against many bodies.

use super::ast::{Binary, Expression};

/// Right operands waiting on the verdict of their left sibling
enum Pending<'a> {
    Not,
    And(&'a Expression),
    Or(&'a Expression),
}

/// Evaluate an expression against a text body
pub fn evaluate(expr: &Expression, body: &str) -> bool {
    let mut pending = Vec::new();
    let mut node = expr;
    loop {
        let mut verdict = loop {
            match node {
                Expression::Literal { text, .. } => break body.contains(text.as_str()),
                Expression::Not(inner) => {
                    pending.push(Pending::Not);
                    node = inner.as_ref();
                }
                Expression::And(left, right) => {
                    pending.push(Pending::And(right.as_ref()));
                    node = left.as_ref();
                }
                Expression::Or(left, right) => {
                    pending.push(Pending::Or(right.as_ref()));
                    node = left.as_ref();
                }
            }
        };

        // A true left operand of `&&` (false for `||`) hands the verdict to
        // the right operand; otherwise the left verdict stands.
        loop {
            match pending.pop() {
                None => return verdict,
                Some(Pending::Not) => verdict = !verdict,
                Some(Pending::And(right)) if verdict => {
                    node = right;
                    break;
                }
                Some(Pending::Or(right)) if !verdict => {
                    node = right;
                    break;
                }
                Some(Pending::And(_) | Pending::Or(_)) => {}
            }
        }
    }
}

/// The leftmost literal that makes a true verdict true.
///
/// Only literals found in the body and sitting on a branch that decides the
/// verdict count; a literal under `~` never does. Returns `None` when the
/// verdict is false, and also when it holds purely through negation (`~x`).
pub fn first_matching_literal<'a>(expr: &'a Expression, body: &str) -> Option<&'a str> {
    let (verdict, witness) = expr.fold(
        |text, _| {
            let found = body.contains(text);
            (found, found.then_some(text))
        },
        |(verdict, _)| (!verdict, None),
        |op, (left, left_witness), (right, right_witness)| match op {
            Binary::And if left && right => (true, left_witness.or(right_witness)),
            Binary::And => (false, None),
            Binary::Or => {
                let from_left = if left { left_witness } else { None };
                let from_right = if right { right_witness } else { None };
                (left || right, from_left.or(from_right))
            }
        },
    );
    if verdict {
        witness
    } else {
        None
    }
}
