//! Core extraction logic for chat transcripts.
//!
//! This crate turns the raw text nodes of an inspected chat page into
//! normalized messages, size-bounded chunk blocks, a labelled full-text
//! transcript and a stable identity fingerprint, so a downstream consumer can
//! deduplicate conversations and append only new messages.

/// Trait for anything that reads as a conversation turn.
///
/// Implemented by extracted and chunked messages so transcript assembly and
/// fingerprinting work over either.
pub trait Turn {
    /// Speaker label, e.g. `user` or `assistant`.
    fn role(&self) -> &str;

    /// Message text.
    fn text(&self) -> &str;
}

// Blanket implementation for references to Turns
impl<T: Turn + ?Sized> Turn for &T {
    fn role(&self) -> &str {
        (*self).role()
    }

    fn text(&self) -> &str {
        (*self).text()
    }
}

mod chunk;
mod conversation;
mod error;
mod fingerprint;
mod helpers;
pub mod pipeline;
pub mod source;

pub use chunk::{chunk_text, PARAGRAPH_SEPARATOR};
pub use conversation::{
    build_full_text, extract_from_source, extract_messages, messages_after, ChunkedMessage,
    Extraction, RawMessage, TRANSCRIPT_SEPARATOR, UNKNOWN_ROLE,
};
pub use error::{Error, Result};
pub use fingerprint::{conversation_fingerprint, fingerprint, fingerprint_seed};
pub use helpers::{
    find_share_url, guess_project, guess_title, normalize, normalize_opt, DEFAULT_PROJECT,
    DEFAULT_TITLE,
};
pub use pipeline::{
    build_identity, collect, discover_snapshot_files, process_all_snapshots, process_snapshot,
    write_jsonl_output, CollectFailure, CollectResponse, ConversationPayload, ExtractConfig,
    IdentityPayload, PipelineResult, SnapshotResult,
};
pub use source::{NodeRead, PageSnapshot, PageSource, SourceError, SourceNode};

/// Default maximum characters per chunk block
pub const DEFAULT_MAX_CHARS: usize = 1800;

/// Default number of leading messages in the identity seed
pub const FINGERPRINT_TURNS: usize = 6;

/// Default summary length in characters
pub const SUMMARY_CHARS: usize = 800;
