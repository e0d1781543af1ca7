//! Row types and the table set.

pub mod rows;
pub mod tables;
