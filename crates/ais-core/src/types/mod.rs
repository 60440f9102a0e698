//! Core data types: canonical vessel updates, registry records and the
//! identity types that tie them together.

pub mod enums;
pub mod update;
pub mod vessel;

pub use enums::*;
pub use update::*;
pub use vessel::*;
