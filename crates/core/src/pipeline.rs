//! Pipeline for turning inspected pages into delivery payloads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::conversation::{build_full_text, extract_from_source, ChunkedMessage, RawMessage};
use crate::error::{Error, Result};
use crate::fingerprint::conversation_fingerprint;
use crate::helpers::{
    find_share_url, guess_project, guess_title, take_chars, DEFAULT_PROJECT, DEFAULT_TITLE,
};
use crate::source::{PageSnapshot, PageSource};
use crate::{DEFAULT_MAX_CHARS, FINGERPRINT_TURNS, SUMMARY_CHARS};

/// Configuration for extraction and identity building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Maximum characters per chunk block.
    pub max_chars: usize,
    /// Number of leading messages that make up the identity seed.
    pub fingerprint_turns: usize,
    /// Characters of the transcript kept as summary.
    pub summary_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            fingerprint_turns: FINGERPRINT_TURNS,
            summary_chars: SUMMARY_CHARS,
        }
    }
}

impl ExtractConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chars == 0 {
            return Err(Error::InvalidConfig("max_chars must be greater than 0".into()));
        }
        if self.fingerprint_turns == 0 {
            return Err(Error::InvalidConfig(
                "fingerprint_turns must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Successful collection of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPayload {
    pub ok: bool,
    pub title: String,
    pub project: String,
    pub chat_url: String,
    pub share_url: String,
    pub message_count: usize,
    pub last_message_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_count: Option<usize>,
    pub messages: Vec<ChunkedMessage>,
    pub full_text: String,
    /// Whole messages, kept for fingerprinting but not sent downstream.
    #[serde(skip)]
    pub raw_messages: Vec<RawMessage>,
}

/// Failed collection, reported to the caller instead of raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectFailure {
    pub ok: bool,
    pub error: String,
}

/// Outcome of [`collect`], serialized as either payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CollectResponse {
    Collected(Box<ConversationPayload>),
    Failed(CollectFailure),
}

impl CollectResponse {
    fn failed(error: &Error) -> Self {
        CollectResponse::Failed(CollectFailure {
            ok: false,
            error: error.to_string(),
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CollectResponse::Collected(_))
    }

    pub fn into_result(self) -> std::result::Result<ConversationPayload, CollectFailure> {
        match self {
            CollectResponse::Collected(payload) => Ok(*payload),
            CollectResponse::Failed(failure) => Err(failure),
        }
    }
}

/// Collect a conversation from an inspected page.
///
/// Never fails outright: an empty page yields a failure response carrying
/// the user-facing message.
pub fn collect<S: PageSource>(source: &S, config: &ExtractConfig) -> CollectResponse {
    if let Err(e) = config.validate() {
        return CollectResponse::failed(&e);
    }

    let extraction = extract_from_source(source, config.max_chars);
    let full_text = build_full_text(&extraction.raw_messages);
    if full_text.is_empty() {
        return CollectResponse::failed(&Error::EmptyInput);
    }

    let last_message_index = extraction.last_message_index();
    debug_assert_eq!(last_message_index + 1, extraction.raw_messages.len());

    CollectResponse::Collected(Box::new(ConversationPayload {
        ok: true,
        title: guess_title(&source.title()),
        project: guess_project(source.label_candidates()),
        chat_url: source.url(),
        share_url: find_share_url(&source.url(), source.links()),
        message_count: extraction.raw_messages.len(),
        last_message_index,
        block_count: Some(extraction.messages.len()),
        messages: extraction.messages,
        full_text,
        raw_messages: extraction.raw_messages,
    }))
}

/// Payload consumed by the fingerprint-dedupe collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityPayload {
    pub fingerprint: String,
    pub title: String,
    pub project: String,
    pub chat_url: String,
    pub share_url: String,
    pub summary: String,
    pub message_count: usize,
    pub last_message_index: usize,
    pub messages: Vec<ChunkedMessage>,
    pub conversation_text: String,
}

impl IdentityPayload {
    /// Fingerprint a collected conversation and build its identity payload.
    pub fn from_collected(payload: ConversationPayload, config: &ExtractConfig) -> Result<Self> {
        let fingerprint = conversation_fingerprint(
            &payload.project,
            &payload.title,
            &payload.raw_messages,
            config.fingerprint_turns,
        )?;

        let title = if payload.title.is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            payload.title
        };
        let project = if payload.project.is_empty() {
            DEFAULT_PROJECT.to_string()
        } else {
            payload.project
        };

        Ok(Self {
            fingerprint,
            title,
            project,
            chat_url: payload.chat_url,
            share_url: payload.share_url,
            summary: take_chars(&payload.full_text, config.summary_chars).to_string(),
            message_count: payload.message_count,
            last_message_index: payload.last_message_index,
            messages: payload.messages,
            conversation_text: payload.full_text,
        })
    }
}

/// Collect a page and build its identity payload in one step.
pub fn build_identity<S: PageSource>(source: &S, config: &ExtractConfig) -> Result<IdentityPayload> {
    config.validate()?;
    match collect(source, config).into_result() {
        Ok(payload) => IdentityPayload::from_collected(payload, config),
        Err(_) => Err(Error::EmptyInput),
    }
}

/// Result of processing a single snapshot file.
#[derive(Debug)]
pub struct SnapshotResult {
    pub identity: IdentityPayload,
    pub source_path: String,
}

/// Counts reported after writing batch output.
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub total_snapshots: usize,
    pub unique_conversations: usize,
    pub duplicate_snapshots: usize,
    pub total_messages: usize,
    pub total_blocks: usize,
}

/// One row of the block export.
#[derive(Debug, Serialize)]
struct BlockRow<'a> {
    fingerprint: &'a str,
    msg_index: usize,
    chunk_index: usize,
    chunk_count: usize,
    role: &'a str,
    text: &'a str,
}

/// Discover all snapshot files in a directory.
///
/// `skip_dir` (typically the output directory) is pruned from the walk so
/// written output is never read back as a snapshot.
pub fn discover_snapshot_files(root: &Path, skip_dir: Option<&Path>) -> Vec<PathBuf> {
    let skip = skip_dir.and_then(|dir| dir.canonicalize().ok());
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| match &skip {
            Some(skip) if e.file_type().is_dir() => {
                e.path().canonicalize().map_or(true, |path| &path != skip)
            }
            _ => true,
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

/// Process a single snapshot file.
pub fn process_snapshot(path: &Path, config: &ExtractConfig) -> Result<IdentityPayload> {
    let json = std::fs::read_to_string(path)?;
    let snapshot = PageSnapshot::from_json(&json)?;
    build_identity(&snapshot, config)
}

/// Process all snapshots in a directory in parallel.
///
/// Snapshots that fail are logged and counted; they never abort the batch.
/// Files under `skip_dir` are ignored.
pub fn process_all_snapshots(
    root: &Path,
    skip_dir: Option<&Path>,
    config: &ExtractConfig,
) -> Result<Vec<SnapshotResult>> {
    config.validate()?;
    let files = discover_snapshot_files(root, skip_dir);

    if files.is_empty() {
        return Err(Error::NoSnapshots(root.to_path_buf()));
    }

    let total_files = files.len();
    let processed_count = AtomicUsize::new(0);
    let error_count = AtomicUsize::new(0);

    let results: Vec<SnapshotResult> = files
        .into_par_iter()
        .filter_map(|path| {
            let result = process_snapshot(&path, config);
            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

            match result {
                Ok(identity) => {
                    if count % 100 == 0 || count == total_files {
                        tracing::info!("Processed {}/{} snapshots", count, total_files);
                    }
                    Some(SnapshotResult {
                        identity,
                        source_path: path.to_string_lossy().to_string(),
                    })
                }
                Err(e) => {
                    error_count.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Error processing {:?}: {}", path, e);
                    None
                }
            }
        })
        .collect();

    let errors = error_count.load(Ordering::Relaxed);
    if errors > 0 {
        tracing::warn!("{} snapshots failed to process", errors);
    }

    Ok(results)
}

/// Keep one payload per fingerprint, preferring the most complete capture.
///
/// Ties keep the snapshot whose path sorts first. Output is ordered by
/// source path.
pub fn dedupe_by_fingerprint(results: Vec<SnapshotResult>) -> Vec<SnapshotResult> {
    let mut latest: HashMap<String, SnapshotResult> = HashMap::new();
    for result in results {
        let key = result.identity.fingerprint.clone();
        match latest.get(&key) {
            Some(existing) if !is_more_complete(&result, existing) => {
                tracing::debug!("Dropping duplicate capture {}", result.source_path);
            }
            _ => {
                latest.insert(key, result);
            }
        }
    }
    let mut unique: Vec<SnapshotResult> = latest.into_values().collect();
    unique.sort_by(|a, b| a.source_path.cmp(&b.source_path));
    unique
}

fn is_more_complete(candidate: &SnapshotResult, existing: &SnapshotResult) -> bool {
    let a = &candidate.identity;
    let b = &existing.identity;
    (a.last_message_index, a.messages.len(), std::cmp::Reverse(&candidate.source_path))
        > (b.last_message_index, b.messages.len(), std::cmp::Reverse(&existing.source_path))
}

/// Write deduplicated conversations to JSONL and their blocks to CSV.
pub fn write_jsonl_output(
    results: Vec<SnapshotResult>,
    output_dir: &Path,
) -> Result<PipelineResult> {
    use std::fs::File;
    use std::io::{BufWriter, Write};

    std::fs::create_dir_all(output_dir)?;

    let total_snapshots = results.len();
    let unique = dedupe_by_fingerprint(results);

    let mut jsonl = BufWriter::new(File::create(output_dir.join("conversations.jsonl"))?);
    let mut blocks = csv::Writer::from_path(output_dir.join("blocks.csv"))?;

    let mut total_messages = 0;
    let mut total_blocks = 0;

    for result in &unique {
        let identity = &result.identity;
        writeln!(jsonl, "{}", serde_json::to_string(identity)?)?;

        for m in &identity.messages {
            blocks.serialize(BlockRow {
                fingerprint: &identity.fingerprint,
                msg_index: m.msg_index,
                chunk_index: m.chunk_index,
                chunk_count: m.chunk_count,
                role: &m.role,
                text: &m.text,
            })?;
        }

        total_messages += identity.message_count;
        total_blocks += identity.messages.len();
    }

    jsonl.flush()?;
    blocks.flush()?;

    Ok(PipelineResult {
        total_snapshots,
        unique_conversations: unique.len(),
        duplicate_snapshots: total_snapshots - unique.len(),
        total_messages,
        total_blocks,
    })
}
