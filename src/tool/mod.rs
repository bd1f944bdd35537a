//! Diagnostics reported while building an ATN.
//!
//! Use it like so:
//! ```ignore
//! let mut errors = ErrorManager::new();
//! let atn = LexerAtnFactory::new(&grammar, &mut errors).create_atn()?;
//!
//! for diagnostic in errors.diagnostics() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

mod error_kind;
mod error_manager;

pub use error_kind::*;
pub use error_manager::*;
