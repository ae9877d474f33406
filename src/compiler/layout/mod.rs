//! Computes the bit offset and size of every field of every declared type.
//!
//! Sizing produces a [`TypeTable`] holding one [`TypeNode`] per declared type.
//! Named types are sized once and later references reuse the stored node.

mod cycles;
mod error;
mod node;
mod sizer;

pub use cycles::check_cycles;
pub use error::LayoutError;
pub use node::{storage_bits, NodeKind, TypeNode, TypeOf, TypeTable};
pub use sizer::{size_types, DEFAULT_REGISTER_SIZE};
