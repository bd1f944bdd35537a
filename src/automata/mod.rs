//! The ATN factories.
//!
//! A factory turns the rules of a [`Grammar`](crate::grammar::Grammar) into an
//! [`Atn`](crate::atn::Atn). [`ParserAtnFactory`] handles parser grammars,
//! [`LexerAtnFactory`] lexer grammars. Both report problems with the grammar to
//! an [`ErrorManager`](crate::tool::ErrorManager) and only fail if the
//! grammar is internally inconsistent.
//!
//! ```ignore
//! let mut errors = ErrorManager::new();
//! let atn = LexerAtnFactory::new(&grammar, &mut errors)
//!     .with_templates(TargetTemplates::empty().with("setText", CommandTemplate::with_argument("setText(<arg>);")))
//!     .create_atn()?;
//!
//! for diagnostic in errors.diagnostics() {
//!     eprintln!("{}", diagnostic.message());
//! }
//! ```

mod builder;
mod charset;
mod commands;
mod factory;
mod lexer;
mod tail_epsilon;

pub use builder::AtnBuilder;
pub use commands::{template_name, CommandTemplate, CommandTemplates, TargetTemplates};
pub use factory::*;
pub use lexer::*;

use crate::{
    atn::Atn,
    error::AtnError,
    grammar::{Grammar, GrammarKind},
    tool::ErrorManager,
};

/// Build the ATN of `grammar` with the factory that fits its kind and the default options.
pub fn create_atn(grammar: &Grammar, errors: &mut ErrorManager) -> Result<Atn, AtnError> {
    match grammar.kind() {
        GrammarKind::Lexer => LexerAtnFactory::new(grammar, errors).create_atn(),
        GrammarKind::Parser => ParserAtnFactory::new(grammar, errors).create_atn(),
    }
}
