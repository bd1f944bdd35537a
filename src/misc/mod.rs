//! Value types and text helpers shared by the grammar frontend and the ATN factories.

mod interval_set;
pub mod case;
pub mod char_support;
pub mod escape;

pub use interval_set::*;
