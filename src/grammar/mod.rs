//! The grammar frontend: the rule ASTs the factories walk and the symbol
//! tables they look names up in.
//!
//! Build a grammar in code:
//! ```ignore
//! let grammar = Grammar::parser("Expr")
//!     .rule(Rule::new("expr", vec![
//!         Alternative::new(vec![Element::token_ref("INT"), Element::literal("'+'"), Element::rule_ref("expr")]),
//!         Alternative::new(vec![Element::token_ref("INT")]),
//!     ]))
//!     .build()?;
//! ```
//! and inspect it like this:
//! ```ignore
//! for rule in grammar.rules() {
//!     for alt in rule.block().alts() {
//!         for element in alt.elements() {
//!             println!("{}: {} ({})", rule.name(), element.text(), element.kind_name());
//!         }
//!     }
//! }
//! ```

mod ast;
mod builder;
mod definition;

pub use ast::*;
pub use builder::*;
pub use definition::*;
