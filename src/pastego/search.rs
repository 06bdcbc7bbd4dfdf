// SPDX-License-Identifier: MIT

//! Configured search alternatives
//!
//! A search list is a comma-separated set of expressions, e.g.
//! `password, quake && ~earthquake`. A paste matches when any alternative
//! evaluates true.

use super::error::{PastegoError, Result};
use crate::query::{compile, evaluate, first_matching_literal, Expression};
use serde::Serialize;

/// One compiled alternative
#[derive(Debug, Clone)]
pub struct SearchTerm {
    source: String,
    expr: Expression,
}

impl SearchTerm {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    /// Label used when the verdict holds only through negation
    fn fallback_label(&self) -> String {
        self.source
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

/// Why a body matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// The literal that justified the match
    pub label: String,
    /// Source of the alternative that matched
    pub expression: String,
}

#[derive(Debug, Clone)]
pub struct SearchSet {
    terms: Vec<SearchTerm>,
    case_insensitive: bool,
}

impl SearchSet {
    /// Compile every alternative of a comma-separated list.
    ///
    /// Fails on the first alternative that does not compile.
    pub fn parse(list: &str, case_insensitive: bool) -> Result<Self> {
        let mut terms = Vec::new();
        for alternative in split_alternatives(list) {
            let source = alternative.trim();
            if source.is_empty() {
                continue;
            }
            let expr = compile(source).map_err(|e| PastegoError::query(source, e))?;
            let expr = if case_insensitive {
                expr.map_literals(fold_case)
            } else {
                expr
            };
            terms.push(SearchTerm {
                source: source.to_string(),
                expr,
            });
        }

        if terms.is_empty() {
            return Err(PastegoError::config("no search expressions given"));
        }

        Ok(Self {
            terms,
            case_insensitive,
        })
    }

    pub fn terms(&self) -> &[SearchTerm] {
        &self.terms
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// First alternative, in configured order, that matches `body`
    pub fn find_match(&self, body: &str) -> Option<SearchMatch> {
        let folded;
        let body = if self.case_insensitive {
            folded = fold_case(body);
            folded.as_str()
        } else {
            body
        };

        self.terms.iter().find_map(|term| {
            if !evaluate(&term.expr, body) {
                return None;
            }
            let label = first_matching_literal(&term.expr, body)
                .map(str::to_string)
                .unwrap_or_else(|| term.fallback_label());
            Some(SearchMatch {
                label,
                expression: term.source.clone(),
            })
        })
    }
}

fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Split on commas that are not inside a quoted literal
fn split_alternatives(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            ',' if !in_quote => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ParseErrorKind;

    #[test]
    fn test_split_alternatives() {
        assert_eq!(
            split_alternatives("a, b && c,d"),
            vec!["a", " b && c", "d"]
        );
        assert_eq!(split_alternatives("'x, y' || z"), vec!["'x, y' || z"]);
    }

    #[test]
    fn test_parse_skips_empty_alternatives() {
        let set = SearchSet::parse("password,, quake && ~earthquake ,", false).unwrap();
        let sources: Vec<&str> = set.terms().iter().map(|t| t.source()).collect();
        assert_eq!(sources, vec!["password", "quake && ~earthquake"]);
    }

    #[test]
    fn test_parse_reports_bad_alternative() {
        let err = SearchSet::parse("password, a &&", false).unwrap_err();
        match err {
            PastegoError::Query { expression, source } => {
                assert_eq!(expression, "a &&");
                assert_eq!(source.kind, ParseErrorKind::MissingOperand);
            }
            other => panic!("Expected Query error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(matches!(
            SearchSet::parse(" , ", false),
            Err(PastegoError::Config(_))
        ));
    }

    #[test]
    fn test_find_match_in_order() {
        let set = SearchSet::parse("password, quake && ~earthquake", false).unwrap();
        let found = set.find_match("my password is: quake").unwrap();
        assert_eq!(found.label, "password");
        assert_eq!(found.expression, "password");

        let found = set.find_match("quakelive was good").unwrap();
        assert_eq!(found.label, "quake");
        assert_eq!(found.expression, "quake && ~earthquake");

        assert!(set.find_match("an earthquake").is_none());
    }

    #[test]
    fn test_case_sensitive_by_default() {
        let set = SearchSet::parse("Password", false).unwrap();
        assert!(set.find_match("my password").is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let set = SearchSet::parse("PassWord && ~JAVA", true).unwrap();
        assert!(set.is_case_insensitive());
        let found = set.find_match("My PASSWORD is secret").unwrap();
        assert_eq!(found.label, "password");
        assert_eq!(found.expression, "PassWord && ~JAVA");
        assert!(set.find_match("password for Java").is_none());
    }

    #[test]
    fn test_negation_only_falls_back_to_first_word() {
        let set = SearchSet::parse("~java && ~rust", false).unwrap();
        let found = set.find_match("plain text").unwrap();
        assert_eq!(found.label, "~java");
    }
}
