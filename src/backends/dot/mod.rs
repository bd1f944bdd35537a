//! Render an ATN as a Graphviz graph.
//!
//! Use it like so:
//! ```ignore
//! let atn = create_atn(&grammar, &mut errors)?;
//!
//! // Everything
//! DotGenerator::new().generate("atn.dot", &grammar, &atn)?;
//!
//! // Only the states reachable from rule `expr`
//! DotGenerator::new().rule("expr").generate("expr.dot", &grammar, &atn)?;
//! ```

mod generator;

pub use generator::DotGenerator;
