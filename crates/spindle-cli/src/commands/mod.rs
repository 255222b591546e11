//! CLI command implementations.

pub mod assemble;
pub mod blocks;
pub mod check;
pub mod common;
pub mod compile;
