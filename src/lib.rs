//! bkindex - BK-tree index for approximate string matching
//!
//! A Rust library with optional Python bindings for finding strings close to
//! a query under an edit distance.
//!
//! # Features
//! - BK-tree with range queries, corrections and soft delete
//! - Levenshtein distance with optional keyboard-aware substitution costs
//! - Case-insensitive comparison
//! - JSON and binary persistence of the tree structure
//!
//! # Example
//! ```
//! use bkindex::BkTree;
//!
//! let mut tree = BkTree::new("book");
//! tree.insert("books").unwrap();
//! tree.insert("cake").unwrap();
//!
//! let matches = tree.range_query("bo", 2);
//! assert!(matches[&2].contains("book"));
//! assert_eq!(tree.suggest_correction("boks").as_deref(), Some("books"));
//! ```

pub mod algorithms;
pub mod error;
pub mod indexing;

#[cfg(feature = "python")]
mod python;

pub use algorithms::{
    keyboard::Keyboard, levenshtein::WeightedLevenshtein, normalize::CaseMode, EditDistance,
};
pub use error::{IndexError, Result};
pub use indexing::{BkNode, BkTree, BuildOptions, Neighbors, NodeRecord, TreeRecord, TreeSource};
