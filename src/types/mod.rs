//! Domain types for the inspection workflow

mod inspection;
mod machine;

pub use inspection::*;
pub use machine::*;
