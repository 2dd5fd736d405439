pub mod catalog;
pub mod orders;

pub use catalog::*;
pub use orders::*;
