//! Backends turn a finished ATN into something else.
//!
//! Currently there is only one backend:
//! - `dot`: Render an ATN as a Graphviz graph

pub mod dot;
