//! Page-inspection seam.
//!
//! The core never touches a live page. Whatever inspects the page hands over
//! its findings through [`PageSource`]; [`PageSnapshot`] is the serialized
//! form used by the CLI and the Node bindings.

use serde::{Deserialize, Serialize};

/// A raw text node as read from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNode {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl SourceNode {
    pub fn new(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            text: Some(text.into()),
        }
    }

    /// A content block without a role tag.
    pub fn block(text: impl Into<String>) -> Self {
        Self {
            role: None,
            text: Some(text.into()),
        }
    }
}

/// Reading a node from the page failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to read source node: {0}")]
pub struct SourceError(pub String);

/// Outcome of reading one node.
pub type NodeRead = Result<SourceNode, SourceError>;

/// Everything the core needs from an inspected chat page.
pub trait PageSource {
    /// The document title as reported by the page.
    fn title(&self) -> String;

    /// The current chat URL.
    fn url(&self) -> String;

    /// Hrefs of anchors on the page.
    fn links(&self) -> Vec<String>;

    /// Inner text of short header/nav/main elements.
    fn label_candidates(&self) -> Vec<String>;

    /// Role-tagged message nodes in document order.
    fn role_nodes(&self) -> Vec<NodeRead>;

    /// Coarse content blocks in document order, used when no role nodes exist.
    fn content_blocks(&self) -> Vec<NodeRead>;
}

impl<P: PageSource + ?Sized> PageSource for &P {
    fn title(&self) -> String {
        (*self).title()
    }

    fn url(&self) -> String {
        (*self).url()
    }

    fn links(&self) -> Vec<String> {
        (*self).links()
    }

    fn label_candidates(&self) -> Vec<String> {
        (*self).label_candidates()
    }

    fn role_nodes(&self) -> Vec<NodeRead> {
        (*self).role_nodes()
    }

    fn content_blocks(&self) -> Vec<NodeRead> {
        (*self).content_blocks()
    }
}

/// A node as captured in a snapshot; `error` records a failed read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SnapshotNode {
    /// Replay the captured read.
    pub fn read(&self) -> NodeRead {
        match &self.error {
            Some(reason) => Err(SourceError(reason.clone())),
            None => Ok(SourceNode {
                role: self.role.clone(),
                text: self.text.clone(),
            }),
        }
    }
}

impl From<SourceNode> for SnapshotNode {
    fn from(node: SourceNode) -> Self {
        Self {
            role: node.role,
            text: node.text,
            error: None,
        }
    }
}

/// A captured page, serialized as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub label_candidates: Vec<String>,
    #[serde(default)]
    pub role_nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub content_blocks: Vec<SnapshotNode>,
}

impl PageSnapshot {
    /// Parse a snapshot from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl PageSource for PageSnapshot {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn links(&self) -> Vec<String> {
        self.links.clone()
    }

    fn label_candidates(&self) -> Vec<String> {
        self.label_candidates.clone()
    }

    fn role_nodes(&self) -> Vec<NodeRead> {
        self.role_nodes.iter().map(SnapshotNode::read).collect()
    }

    fn content_blocks(&self) -> Vec<NodeRead> {
        self.content_blocks.iter().map(SnapshotNode::read).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_json() {
        let json = r#"{
            "title": "Borrowing",
            "url": "https://chatgpt.com/c/42",
            "role_nodes": [
                {"role": "user", "text": "Hi"},
                {"role": "assistant"},
                {"error": "detached node"}
            ]
        }"#;
        let snapshot = PageSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.title(), "Borrowing");
        assert!(snapshot.links().is_empty());
        assert!(snapshot.content_blocks().is_empty());

        let nodes = snapshot.role_nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], Ok(SourceNode::new(Some("user"), "Hi")));
        assert_eq!(nodes[1].as_ref().unwrap().text, None);
        assert_eq!(nodes[2], Err(SourceError("detached node".to_string())));
    }
}
