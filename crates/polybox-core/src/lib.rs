#![doc = include_str!("../README.md")]

mod error;
mod reduce;
mod types;

pub use error::*;
pub use reduce::*;
pub use types::*;
