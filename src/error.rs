//! Errors that abort loading a grammar or building an ATN.
//!
//! Problems with the grammar itself (bad escapes, empty loops, conflicting lexer commands, ...)
//! are not errors in this sense. They are reported as [`Diagnostic`](crate::tool::Diagnostic)s
//! through the [`ErrorManager`](crate::tool::ErrorManager) and construction carries on.

use std::path::PathBuf;
use thiserror::Error;

/// Loading a grammar description from disk failed.
#[derive(Debug, Error)]
pub struct ParsingError {
    path: PathBuf,
    msg: String,
}

impl ParsingError {
    pub(crate) fn new<P: Into<PathBuf>, S: Into<String>>(path: P, msg: S) -> Self {
        Self {
            path: path.into(),
            msg: msg.into(),
        }
    }

    /// The message describing what is wrong with the file.
    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl std::fmt::Display for ParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParsingError in {}: {}", self.path.display(), self.msg)
    }
}

/// The rules handed to the [`GrammarBuilder`](crate::grammar::GrammarBuilder) do not form a grammar.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// No rules were added.
    #[error("The grammar does not contain any rules")]
    EmptyGrammar,

    /// Two rules share a name.
    #[error("The rule '{0}' is defined more than once")]
    DuplicateRule(String),

    /// A rule reference that does not resolve.
    #[error("The rule '{rule}' is referenced by '{referenced_by}' but never defined")]
    MissingRule {
        /// The undefined rule.
        rule: String,
        /// The rule containing the reference.
        referenced_by: String,
    },

    /// A token reference in a parser grammar without implicit tokens that was never declared.
    #[error("The token '{token}' is referenced by '{referenced_by}' but never defined")]
    MissingToken {
        /// The undeclared token.
        token: String,
        /// The rule containing the reference.
        referenced_by: String,
    },

    /// A lexer-only construct in a parser grammar.
    #[error("The rule '{rule}' is not allowed in a {kind} grammar: {reason}")]
    MisplacedElement {
        /// The offending rule.
        rule: String,
        /// The grammar kind.
        kind: &'static str,
        /// What is wrong.
        reason: String,
    },
}

/// Construction of the ATN had to be aborted.
///
/// These indicate a factory bug or an AST that upstream validation should have rejected,
/// never a mistake that a grammar author can be told about.
#[derive(Debug, Error)]
pub enum AtnError {
    /// The factory got into a state it cannot continue from.
    #[error("internal error: {0}")]
    Internal(String),

    /// A rule reference named a rule the grammar does not have.
    #[error("internal error: rule {0} undefined")]
    UndefinedRule(String),

    /// An element that only exists in the other kind of grammar.
    #[error("internal error: {element} is not allowed in {grammar_kind} grammars")]
    UnsupportedElement {
        /// Kind of the element.
        element: &'static str,
        /// Kind of the grammar.
        grammar_kind: &'static str,
    },
}
