mod health_check;

pub mod authentication;
pub mod orders;
pub mod products;

pub use health_check::*;
