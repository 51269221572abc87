//! Node.js bindings for the chat transcript extractor.
//!
//! A browser-extension host hands over page snapshots as JSON and receives
//! the delivery payloads back as JSON strings, so field names stay exactly
//! as the downstream consumer expects them.

use napi::bindgen_prelude::*;
use napi_derive::napi;

use chat_transcript_core::{ExtractConfig, PageSnapshot, RawMessage};

/// A message passed in for transcript assembly.
#[napi(object)]
pub struct TranscriptMessage {
    pub role: Option<String>,
    pub text: String,
}

/// Extraction options. All fields are optional; unspecified values use core defaults.
#[napi(object)]
pub struct ExtractOptions {
    /// Maximum characters per chunk block.
    pub max_chars: Option<u32>,
    /// Leading messages used for the fingerprint.
    pub fingerprint_turns: Option<u32>,
    /// Characters of transcript kept as summary.
    pub summary_chars: Option<u32>,
}

fn to_config(options: Option<ExtractOptions>) -> ExtractConfig {
    let defaults = ExtractConfig::default();
    match options {
        Some(opts) => ExtractConfig {
            max_chars: opts.max_chars.map(|v| v as usize).unwrap_or(defaults.max_chars),
            fingerprint_turns: opts
                .fingerprint_turns
                .map(|v| v as usize)
                .unwrap_or(defaults.fingerprint_turns),
            summary_chars: opts
                .summary_chars
                .map(|v| v as usize)
                .unwrap_or(defaults.summary_chars),
        },
        None => defaults,
    }
}

fn parse_snapshot(snapshot_json: &str) -> Result<PageSnapshot> {
    PageSnapshot::from_json(snapshot_json)
        .map_err(|e| Error::from_reason(format!("Invalid page snapshot: {}", e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::from_reason(e.to_string()))
}

/// Normalize extracted text.
#[napi]
pub fn normalize(text: Option<String>) -> String {
    chat_transcript_core::normalize_opt(text.as_deref())
}

/// Split text into blocks of at most `maxChars` characters.
///
/// @param maxChars - Defaults to 1800.
#[napi]
pub fn chunk_text(text: String, max_chars: Option<u32>) -> Result<Vec<String>> {
    let max_chars = max_chars
        .map(|v| v as usize)
        .unwrap_or(chat_transcript_core::DEFAULT_MAX_CHARS);
    if max_chars == 0 {
        return Err(Error::from_reason("maxChars must be greater than 0"));
    }
    Ok(chat_transcript_core::chunk_text(&text, max_chars))
}

/// Join messages into a labelled full-text transcript.
#[napi]
pub fn build_full_text(messages: Vec<TranscriptMessage>) -> String {
    let messages: Vec<RawMessage> = messages
        .into_iter()
        .enumerate()
        .map(|(index, m)| RawMessage::new(index, m.role.unwrap_or_default(), m.text))
        .collect();
    chat_transcript_core::build_full_text(&messages)
}

/// Hash an identity seed into its decimal fingerprint.
#[napi]
pub fn fingerprint(seed: String) -> String {
    chat_transcript_core::fingerprint(&seed)
}

/// Collect a conversation from a page snapshot.
///
/// Returns the collection payload as JSON: `{ ok: true, ... }` on success or
/// `{ ok: false, error }` when the page holds no conversation text.
///
/// @param snapshotJson - The page snapshot as JSON.
#[napi]
pub fn collect_chat(snapshot_json: String, options: Option<ExtractOptions>) -> Result<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let response = chat_transcript_core::collect(&snapshot, &to_config(options));
    to_json(&response)
}

/// Build the fingerprinted identity payload for a page snapshot.
///
/// Throws when the page holds no conversation text or not enough of it to
/// identify the conversation.
///
/// @param snapshotJson - The page snapshot as JSON.
#[napi]
pub fn build_identity_payload(
    snapshot_json: String,
    options: Option<ExtractOptions>,
) -> Result<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let identity = chat_transcript_core::build_identity(&snapshot, &to_config(options))
        .map_err(|e| Error::from_reason(e.to_string()))?;
    to_json(&identity)
}
