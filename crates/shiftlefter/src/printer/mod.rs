//! The two printers (components K and L): a lossless token re-concatenator
//! and a normalizing canonical formatter.
//!
//! The two printers deliberately never share code. Lossless printing is a
//! property of the token stream alone; canonical printing is a property of
//! the AST alone. Mixing the two would let a canonical bug quietly break
//! the lossless round-trip guarantee.

pub mod canonical;
pub mod lossless;

pub use canonical::{canonical, Error as CanonicalError};
pub use lossless::print_tokens;
