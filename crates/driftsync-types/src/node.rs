//! The endpoint's uniform record for a directory or file.

use serde::{Deserialize, Serialize};

/// Kind of filesystem entry a [`Node`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A directory carrying a stable UUID
    Collection,
    /// A file carrying a content etag
    Leaf,
}

/// Uniform record describing a filesystem entry under a sync root.
///
/// Paths are engine-form: forward-slash separated, not leading-slashed,
/// Unicode-NFC when sourced from a macOS host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub path: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Stable identity for collections, read from the folder sidecar.
    /// Empty for leaves until the engine assigns one.
    #[serde(default)]
    pub uuid: String,
    /// MD5 hex digest of the content for leaves; empty for collections.
    #[serde(default)]
    pub etag: String,
    pub size: u64,
    /// Modification time, seconds since the Unix epoch
    pub mtime: i64,
    /// Raw file mode bits
    pub mode: u32,
}

impl Node {
    /// Build a collection node with no stat metadata yet.
    pub fn collection(path: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            node_type: NodeType::Collection,
            uuid: uuid.into(),
            etag: String::new(),
            size: 0,
            mtime: 0,
            mode: 0,
        }
    }

    /// Build a leaf node with no stat metadata yet.
    pub fn leaf(path: impl Into<String>, etag: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            node_type: NodeType::Leaf,
            uuid: String::new(),
            etag: etag.into(),
            size: 0,
            mtime: 0,
            mode: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type == NodeType::Leaf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_helpers() {
        assert!(Node::leaf("a.txt", "d41d8cd9").is_leaf());
        assert!(!Node::collection("a", "u1").is_leaf());
    }

    #[test]
    fn test_node_serializes_type_tag() {
        let node = Node::collection("photos", "u1");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "collection");
        assert_eq!(json["uuid"], "u1");
    }
}
