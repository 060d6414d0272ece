//! Scene graph of renderer parameters
//!
//! A tree of named, typed configuration nodes that a panorama source reads
//! its parameters from. Nodes track modification stamps so the render loop
//! only re-verifies and re-commits when something actually changed.

pub mod node;
pub mod overrides;

pub use node::{Node, NodeError, NodeType, NodeValue, TimeStamp};
pub use overrides::{split_overrides, NodeOverride};
