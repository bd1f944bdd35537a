//! This library builds augmented transition networks (ATNs) for lexer and parser grammars.
//!
//! It consists of
//! - __frontend__: Describe a grammar with a [`GrammarBuilder`](grammar::GrammarBuilder), either in code or
//!   by loading a JSON description from disk.
//! - __factories__: Turn the rules of a grammar into an ATN with the [`automata`] module, reporting
//!   problems with the grammar to an [`ErrorManager`](tool::ErrorManager).
//! - __backend__: Inspect the result with the [`AtnPrinter`](atn::AtnPrinter) or render it
//!   with the `dot` backend.
//!
//! ## Getting Started
//! The first step always is to load a grammar. To do this use the [`Grammar::lexer()`](grammar::Grammar::lexer)
//! or [`Grammar::parser()`](grammar::Grammar::parser) method that will give you access to a
//! [`GrammarBuilder`](grammar::GrammarBuilder) like this:
//! ```ignore
//! let grammar = Grammar::lexer("Expr")
//!     // Load rules from a grammar description
//!     .json_grammar("expr-lexer.json")?
//!     // Or add them in code
//!     .rule(Rule::new("WS", vec![
//!         Alternative::new(vec![Element::char_set("[ \\t]")]).with_commands(vec![LexerCommand::new("skip")]),
//!     ]))
//!     .build()?;
//! ```
//! Then, create the ATN and look at what was reported:
//! ```ignore
//! let mut errors = ErrorManager::new();
//! let atn = automata::create_atn(&grammar, &mut errors)?;
//!
//! for diagnostic in errors.diagnostics() {
//!     eprintln!("{}", diagnostic);
//! }
//!
//! backends::dot::DotGenerator::new().generate("expr-lexer.dot", &grammar, &atn)?;
//! ```
//! And that's it.

#![deny(missing_docs)]

pub(crate) mod parser;

pub mod atn;
pub mod automata;
pub mod backends;
pub mod error;
pub mod grammar;
pub mod misc;
pub mod tool;
