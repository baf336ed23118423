//! Indexing structures for efficient fuzzy search
//!
//! - BK-tree: range queries and corrections over a metric space
//! - Record: persisted form of a tree (JSON or bincode)
//! - Builder: the construction modes of a tree

pub mod bktree;
pub mod builder;
pub mod record;

pub use bktree::*;
pub use builder::*;
pub use record::*;
