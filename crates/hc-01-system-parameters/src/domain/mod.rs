//! Parameter names, defaults, the honor-node set and the column catalog.

pub mod catalog;
pub mod defaults;
pub mod names;
pub mod nodes;
