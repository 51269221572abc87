//! Message extraction and transcript assembly.

use serde::{Deserialize, Serialize};

use crate::chunk::chunk_text;
use crate::helpers::normalize;
use crate::source::{NodeRead, PageSource, SourceNode};
use crate::Turn;

/// Role assigned to nodes without a usable role label.
pub const UNKNOWN_ROLE: &str = "unknown";

/// Separator between rendered messages in the full transcript.
pub const TRANSCRIPT_SEPARATOR: &str = "\n\n---\n\n";

/// A single extracted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub index: usize,
    pub role: String,
    pub text: String,
}

impl RawMessage {
    pub fn new(index: usize, role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            index,
            role: role.into(),
            text: text.into(),
        }
    }
}

/// One size-bounded block of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkedMessage {
    pub msg_index: usize,
    pub chunk_index: usize,
    pub chunk_count: usize,
    pub role: String,
    pub text: String,
}

impl Turn for RawMessage {
    fn role(&self) -> &str {
        &self.role
    }

    fn text(&self) -> &str {
        &self.text
    }
}

impl Turn for ChunkedMessage {
    fn role(&self) -> &str {
        &self.role
    }

    fn text(&self) -> &str {
        &self.text
    }
}

/// Messages extracted from a page, whole and chunked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub raw_messages: Vec<RawMessage>,
    pub messages: Vec<ChunkedMessage>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.raw_messages.is_empty()
    }

    /// Index of the last extracted message, 0 when nothing was found.
    pub fn last_message_index(&self) -> usize {
        self.raw_messages.last().map(|m| m.index).unwrap_or(0)
    }
}

/// Expand one message into its chunk blocks.
///
/// Always yields at least one block for a message with text.
fn chunk_message(message: &RawMessage, max_chars: usize) -> Vec<ChunkedMessage> {
    let mut chunks = chunk_text(&message.text, max_chars);
    if chunks.is_empty() {
        chunks.push(message.text.clone());
    }
    let chunk_count = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| ChunkedMessage {
            msg_index: message.index,
            chunk_index,
            chunk_count,
            role: message.role.clone(),
            text,
        })
        .collect()
}

/// Extract messages from node reads in document order.
///
/// Nodes that failed to read, have no text, or normalize to nothing are
/// skipped and do not consume an index. Missing or blank roles become
/// [`UNKNOWN_ROLE`].
pub fn extract_messages<I>(nodes: I, max_chars: usize) -> Extraction
where
    I: IntoIterator<Item = NodeRead>,
{
    let mut extraction = Extraction::default();

    for (position, read) in nodes.into_iter().enumerate() {
        let node = match read {
            Ok(node) => node,
            Err(e) => {
                tracing::debug!("Skipping node {}: {}", position, e);
                continue;
            }
        };
        let SourceNode { role, text } = node;
        let Some(text) = text else {
            tracing::debug!("Skipping node {}: no text", position);
            continue;
        };

        let text = normalize(&text);
        if text.is_empty() {
            continue;
        }

        let role = role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| UNKNOWN_ROLE.to_string());

        let message = RawMessage::new(extraction.raw_messages.len(), role, text);
        extraction.messages.extend(chunk_message(&message, max_chars));
        extraction.raw_messages.push(message);
    }

    extraction
}

/// Extract messages from an inspected page.
///
/// Role-tagged nodes are used when the page has any; otherwise the coarser
/// content blocks are extracted, all with role [`UNKNOWN_ROLE`].
pub fn extract_from_source<S: PageSource>(source: &S, max_chars: usize) -> Extraction {
    let role_nodes = source.role_nodes();
    if !role_nodes.is_empty() {
        return extract_messages(role_nodes, max_chars);
    }

    tracing::debug!("No role-tagged nodes, falling back to content blocks");
    let blocks = source.content_blocks().into_iter().map(|read| {
        read.map(|node| SourceNode {
            role: None,
            text: node.text,
        })
    });
    extract_messages(blocks, max_chars)
}

/// Join messages into a single labelled transcript.
///
/// Each message renders as `ROLE:\n<text>`; messages are separated by
/// [`TRANSCRIPT_SEPARATOR`] and the result is normalized.
pub fn build_full_text<T: Turn>(messages: &[T]) -> String {
    let rendered: Vec<String> = messages
        .iter()
        .map(|m| {
            let role = if m.role().is_empty() {
                UNKNOWN_ROLE
            } else {
                m.role()
            };
            format!("{}:\n{}", role.to_uppercase(), m.text())
        })
        .collect();
    normalize(&rendered.join(TRANSCRIPT_SEPARATOR))
}

/// Chunk blocks belonging to messages newer than `last_known_index`.
///
/// `None` means nothing has been delivered yet, so every block is new.
pub fn messages_after(
    messages: &[ChunkedMessage],
    last_known_index: Option<usize>,
) -> Vec<&ChunkedMessage> {
    messages
        .iter()
        .filter(|m| last_known_index.map_or(true, |last| m.msg_index > last))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{PageSnapshot, SnapshotNode, SourceError};
    use crate::DEFAULT_MAX_CHARS;

    fn node(role: &str, text: &str) -> NodeRead {
        Ok(SourceNode::new(Some(role), text))
    }

    #[test]
    fn test_extract_empty() {
        let extraction = extract_messages(Vec::<NodeRead>::new(), DEFAULT_MAX_CHARS);
        assert!(extraction.raw_messages.is_empty());
        assert!(extraction.messages.is_empty());
        assert_eq!(extraction.last_message_index(), 0);
    }

    #[test]
    fn test_extract_skips_empty_without_consuming_index() {
        let nodes = vec![
            node("user", "Hi"),
            node("assistant", ""),
            node("assistant", "Hello there"),
        ];
        let extraction = extract_messages(nodes, DEFAULT_MAX_CHARS);
        assert_eq!(
            extraction.raw_messages,
            vec![
                RawMessage::new(0, "user", "Hi"),
                RawMessage::new(1, "assistant", "Hello there"),
            ]
        );
        assert_eq!(extraction.messages.len(), 2);
        assert_eq!(extraction.last_message_index(), 1);
    }

    #[test]
    fn test_extract_skips_malformed_nodes() {
        let nodes = vec![
            Err(SourceError("detached".to_string())),
            Ok(SourceNode {
                role: Some("user".to_string()),
                text: None,
            }),
            node("user", "  \u{200B}\n "),
            Ok(SourceNode::new(None, "orphan")),
            node("  ", "blank role"),
        ];
        let extraction = extract_messages(nodes, DEFAULT_MAX_CHARS);
        assert_eq!(
            extraction.raw_messages,
            vec![
                RawMessage::new(0, UNKNOWN_ROLE, "orphan"),
                RawMessage::new(1, UNKNOWN_ROLE, "blank role"),
            ]
        );
    }

    #[test]
    fn test_chunk_expansion_invariants() {
        let long = format!("{}\n\n{}", "a".repeat(25), "b".repeat(8));
        let nodes = vec![node("user", "short"), node("assistant", &long)];
        let extraction = extract_messages(nodes, 10);

        for raw in &extraction.raw_messages {
            let blocks: Vec<_> = extraction
                .messages
                .iter()
                .filter(|m| m.msg_index == raw.index)
                .collect();
            assert!(!blocks.is_empty());
            for (i, block) in blocks.iter().enumerate() {
                assert_eq!(block.chunk_index, i);
                assert_eq!(block.chunk_count, blocks.len());
                assert_eq!(block.role, raw.role);
                assert!(block.text.chars().count() <= 10);
            }
        }

        let assistant: Vec<&str> = extraction
            .messages
            .iter()
            .filter(|m| m.msg_index == 1)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(assistant, vec!["aaaaaaaaaa", "aaaaaaaaaa", "aaaaa", "bbbbbbbb"]);
    }

    #[test]
    fn test_extract_from_source_fallback() {
        let snapshot = PageSnapshot {
            content_blocks: vec![
                SnapshotNode::from(SourceNode::new(Some("user"), "First block")),
                SnapshotNode::from(SourceNode::block("")),
                SnapshotNode::from(SourceNode::block("Second block")),
            ],
            ..Default::default()
        };
        let extraction = extract_from_source(&snapshot, DEFAULT_MAX_CHARS);
        assert_eq!(extraction.raw_messages.len(), 2);
        assert!(extraction.raw_messages.iter().all(|m| m.role == UNKNOWN_ROLE));
        assert_eq!(extraction.raw_messages[1].index, 1);
    }

    #[test]
    fn test_role_nodes_take_precedence() {
        let snapshot = PageSnapshot {
            role_nodes: vec![SnapshotNode::from(SourceNode::new(Some("user"), ""))],
            content_blocks: vec![SnapshotNode::from(SourceNode::block("ignored"))],
            ..Default::default()
        };
        // Role nodes exist, so blocks are not consulted even though nothing survives.
        assert!(extract_from_source(&snapshot, DEFAULT_MAX_CHARS).is_empty());
    }

    #[test]
    fn test_build_full_text() {
        let messages = vec![
            RawMessage::new(0, "user", "Hi"),
            RawMessage::new(1, "assistant", "Hello"),
        ];
        assert_eq!(
            build_full_text(&messages),
            "USER:\nHi\n\n---\n\nASSISTANT:\nHello"
        );
        assert_eq!(build_full_text::<RawMessage>(&[]), "");
    }

    #[test]
    fn test_messages_after() {
        let nodes = vec![node("user", "one"), node("assistant", "two"), node("user", "three")];
        let extraction = extract_messages(nodes, DEFAULT_MAX_CHARS);

        assert_eq!(messages_after(&extraction.messages, None).len(), 3);
        let fresh = messages_after(&extraction.messages, Some(0));
        assert_eq!(
            fresh.iter().map(|m| m.msg_index).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(messages_after(&extraction.messages, Some(2)).is_empty());
    }
}
