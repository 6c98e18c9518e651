//! Turns uploaded PDF bytes into the plain text the extraction strategies
//! consume.

pub mod reader;

#[cfg(test)]
pub mod fixtures;

pub use reader::read_text;
