//! Persisted form of a BK-tree
//!
//! ```json
//! {
//!   "root": "book",
//!   "nodes": [
//!     { "value": "book", "active": true, "links": { "1": "books", "4": "cake" } },
//!     { "value": "books", "active": true, "links": {} },
//!     { "value": "cake", "active": false, "links": {} }
//!   ]
//! }
//! ```
//!
//! Reconstruction trusts the stored edge distances: the metric given when
//! loading is only used for later inserts and queries, so it must be the one
//! the tree was built with.

use super::bktree::{BkNode, BkTree, NodeId, SharedMetric};
use crate::error::{IndexError, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use tracing::debug;

fn default_active() -> bool {
    true
}

/// Serializable tree: the root value and every node with its links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub root: String,
    pub nodes: Vec<NodeRecord>,
}

/// Serializable node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub value: String,
    #[serde(default = "default_active", alias = "is_active")]
    pub active: bool,
    /// Edge distance to child value
    #[serde(default)]
    pub links: BTreeMap<usize, String>,
}

impl NodeRecord {
    pub fn new(value: impl Into<String>, active: bool) -> Self {
        Self {
            value: value.into(),
            active,
            links: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_link(mut self, distance: usize, child: impl Into<String>) -> Self {
        self.links.insert(distance, child.into());
        self
    }
}

impl BkTree {
    /// Export the tree. Nodes are listed in insertion order.
    pub fn to_record(&self) -> TreeRecord {
        let nodes = self.nodes();
        TreeRecord {
            root: self.root().value().to_string(),
            nodes: nodes
                .iter()
                .map(|node| NodeRecord {
                    value: node.value().to_string(),
                    active: node.is_active(),
                    links: node
                        .links()
                        .into_iter()
                        .map(|(distance, child)| (distance, nodes[child.index()].value().to_string()))
                        .collect(),
                })
                .collect(),
        }
    }

    /// Rebuild a tree from a record.
    ///
    /// The whole record is validated before anything is built:
    /// - at least one node, otherwise [`IndexError::EmptyInput`]
    /// - unique node values, otherwise [`IndexError::AlreadyExists`]
    /// - the root and every linked child defined as nodes, otherwise
    ///   [`IndexError::MissingReference`]
    /// - every node reachable from the root through exactly one parent,
    ///   otherwise [`IndexError::InvalidArgument`]
    ///
    /// Edge distances are not recomputed.
    pub fn from_record(record: &TreeRecord, metric: SharedMetric) -> Result<Self> {
        if record.nodes.is_empty() {
            return Err(IndexError::EmptyInput("tree record has no nodes"));
        }

        let mut lookup = AHashMap::with_capacity(record.nodes.len());
        let mut nodes = Vec::with_capacity(record.nodes.len());
        for (index, node) in record.nodes.iter().enumerate() {
            if lookup.insert(node.value.clone(), NodeId::new(index)).is_some() {
                return Err(IndexError::AlreadyExists(node.value.clone()));
            }
            nodes.push(BkNode::new(node.value.clone(), node.active));
        }

        let root = *lookup
            .get(record.root.as_str())
            .ok_or_else(|| IndexError::MissingReference(record.root.clone()))?;

        let mut has_parent = vec![false; nodes.len()];
        for (index, node) in record.nodes.iter().enumerate() {
            for (&distance, child_value) in &node.links {
                let child = *lookup
                    .get(child_value.as_str())
                    .ok_or_else(|| IndexError::MissingReference(child_value.clone()))?;
                if child == root {
                    return Err(IndexError::InvalidArgument(format!(
                        "root `{child_value}` cannot be linked as a child"
                    )));
                }
                if std::mem::replace(&mut has_parent[child.index()], true) {
                    return Err(IndexError::InvalidArgument(format!(
                        "node `{child_value}` is linked from more than one parent"
                    )));
                }
                nodes[index].attach(distance, child);
            }
        }

        let reachable = count_reachable(&nodes, root);
        if reachable != nodes.len() {
            return Err(IndexError::InvalidArgument(format!(
                "{} of {} nodes are not reachable from root `{}`",
                nodes.len() - reachable,
                nodes.len(),
                record.root
            )));
        }

        debug!(nodes = nodes.len(), root = %record.root, "reconstructed BK-tree from record");
        Ok(Self::from_parts(nodes, lookup, root, metric))
    }

    /// Serialize the record as JSON
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let record = self.to_record();
        let json = if pretty {
            serde_json::to_string_pretty(&record)?
        } else {
            serde_json::to_string(&record)?
        };
        Ok(json)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.to_record())?;
        Ok(())
    }

    pub fn from_json<R: Read>(reader: R, metric: SharedMetric) -> Result<Self> {
        let record: TreeRecord = serde_json::from_reader(reader)?;
        Self::from_record(&record, metric)
    }

    /// Serialize the record to bytes using bincode.
    ///
    /// Note: The metric is NOT serialized. When deserializing,
    /// you must provide the metric the tree was built with.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.to_record())?)
    }

    /// Deserialize a tree from bytes produced by [`BkTree::to_bytes`]
    pub fn from_bytes(data: &[u8], metric: SharedMetric) -> Result<Self> {
        let record: TreeRecord = bincode::deserialize(data)?;
        Self::from_record(&record, metric)
    }
}

/// Each node has at most one parent at this point, so a plain walk terminates.
fn count_reachable(nodes: &[BkNode], root: NodeId) -> usize {
    let mut stack = vec![root];
    let mut count = 0;
    while let Some(id) = stack.pop() {
        count += 1;
        stack.extend(nodes[id.index()].links().into_iter().map(|(_, child)| child));
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::bktree::default_metric;

    fn sample_tree() -> BkTree {
        let mut tree = BkTree::new("book");
        tree.insert_all(["books", "cake", "cook", "boo"]).unwrap();
        tree.deactivate("cake").unwrap();
        tree
    }

    #[test]
    fn test_record_shape() {
        let record = sample_tree().to_record();
        assert_eq!(record.root, "book");
        assert_eq!(record.nodes.len(), 5);
        assert_eq!(record.nodes[0], NodeRecord::new("book", true).with_link(1, "books").with_link(4, "cake"));
        assert!(!record.nodes[2].active);
    }

    #[test]
    fn test_record_round_trip() {
        let tree = sample_tree();
        let restored = BkTree::from_record(&tree.to_record(), default_metric()).unwrap();

        assert_eq!(restored.values(), tree.values());
        assert_eq!(restored.to_record(), tree.to_record());
        assert_eq!(restored.deleted_count(), 1);
        for radius in 0..4 {
            assert_eq!(restored.range_query("bock", radius), tree.range_query("bock", radius));
        }
    }

    #[test]
    fn test_json_round_trip() {
        let tree = sample_tree();
        let json = tree.to_json(true).unwrap();
        assert!(json.contains("\"active\": false"));

        let restored = BkTree::from_json(json.as_bytes(), default_metric()).unwrap();
        assert_eq!(restored.to_record(), tree.to_record());

        let mut buffer = Vec::new();
        tree.write_json(&mut buffer).unwrap();
        let restored = BkTree::from_json(buffer.as_slice(), default_metric()).unwrap();
        assert_eq!(restored.to_string(), tree.to_string());
    }

    #[test]
    fn test_bytes_round_trip() {
        let tree = sample_tree();
        let bytes = tree.to_bytes().unwrap();
        let restored = BkTree::from_bytes(&bytes, default_metric()).unwrap();
        assert_eq!(restored.to_record(), tree.to_record());

        assert!(matches!(
            BkTree::from_bytes(&bytes[..3], default_metric()),
            Err(IndexError::Encoding(_))
        ));
    }

    #[test]
    fn test_accepts_is_active_and_missing_fields() {
        let json = r#"{
            "root": "node",
            "nodes": [
                {"value": "node", "is_active": true, "links": {"2": "subnode"}},
                {"value": "subnode", "is_active": false}
            ]
        }"#;
        let tree = BkTree::from_json(json.as_bytes(), default_metric()).unwrap();
        assert_eq!(tree.child("node", 2).unwrap().value(), "subnode");
        assert!(!tree.lookup("subnode").unwrap().is_active());
    }

    #[test]
    fn test_missing_reference() {
        let record = TreeRecord {
            root: "book".into(),
            nodes: vec![NodeRecord::new("book", true).with_link(1, "books")],
        };
        let err = BkTree::from_record(&record, default_metric()).unwrap_err();
        assert!(matches!(err, IndexError::MissingReference(ref v) if v == "books"));

        let record = TreeRecord {
            root: "cake".into(),
            nodes: vec![NodeRecord::new("book", true)],
        };
        let err = BkTree::from_record(&record, default_metric()).unwrap_err();
        assert!(matches!(err, IndexError::MissingReference(ref v) if v == "cake"));
    }

    #[test]
    fn test_empty_and_duplicate_records() {
        let empty = TreeRecord { root: String::new(), nodes: Vec::new() };
        assert!(matches!(
            BkTree::from_record(&empty, default_metric()),
            Err(IndexError::EmptyInput(_))
        ));

        let duplicate = TreeRecord {
            root: "a".into(),
            nodes: vec![NodeRecord::new("a", true), NodeRecord::new("a", false)],
        };
        assert!(matches!(
            BkTree::from_record(&duplicate, default_metric()),
            Err(IndexError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_rejects_broken_structure() {
        let two_parents = TreeRecord {
            root: "a".into(),
            nodes: vec![
                NodeRecord::new("a", true).with_link(1, "b").with_link(2, "c"),
                NodeRecord::new("b", true).with_link(1, "c"),
                NodeRecord::new("c", true),
            ],
        };
        assert!(matches!(
            BkTree::from_record(&two_parents, default_metric()),
            Err(IndexError::InvalidArgument(_))
        ));

        let unreachable = TreeRecord {
            root: "a".into(),
            nodes: vec![
                NodeRecord::new("a", true),
                NodeRecord::new("b", true).with_link(1, "c"),
                NodeRecord::new("c", true).with_link(1, "b"),
            ],
        };
        assert!(matches!(
            BkTree::from_record(&unreachable, default_metric()),
            Err(IndexError::InvalidArgument(_))
        ));

        let links_root = TreeRecord {
            root: "a".into(),
            nodes: vec![NodeRecord::new("a", true).with_link(0, "a")],
        };
        assert!(matches!(
            BkTree::from_record(&links_root, default_metric()),
            Err(IndexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_reconstructed_tree_accepts_inserts() {
        let tree = sample_tree();
        let mut restored = BkTree::from_record(&tree.to_record(), default_metric()).unwrap();
        restored.insert("cooks").unwrap();
        assert!(restored.range_query("cooks", 0)[&0].contains("cooks"));
    }
}
