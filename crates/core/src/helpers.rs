//! Helper functions for text normalization and page metadata guessing.

use regex::Regex;
use std::sync::LazyLock;

// Whitespace patterns
static CRLF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r[\r \t]*\n").unwrap());
static TRAILING_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static EXCESS_NEWLINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static SHARE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^/]*/share/").unwrap());
static PROJECT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9 _-]{3,30}$").unwrap());

/// Title used when the page title is missing or only names the product.
pub const DEFAULT_TITLE: &str = "ChatGPT Conversation";

/// Project label used when no candidate looks like a project tag.
pub const DEFAULT_PROJECT: &str = "General";

/// UI labels that are never a project name.
const PROJECT_BLACKLIST: &[&str] = &[
    "ChatGPT",
    "Search",
    "New chat",
    "Settings",
    "Help",
    "Upgrade",
    "Share",
    "Copy",
    "Edit",
    "Regenerate",
    "Stop generating",
    "Table",
    "By Project",
    "By Status",
];

/// Normalize extracted text.
///
/// Strips zero-width spaces and byte-order marks, converts CRLF to LF, drops
/// trailing spaces/tabs before each newline, collapses runs of 3+ newlines to
/// a single blank line and trims the result. A CR followed only by more CRs,
/// spaces or tabs before the LF counts as part of the line ending, so a second
/// pass never finds a new CRLF.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let s = text.replace(['\u{200B}', '\u{FEFF}'], "");
    let s = CRLF_RE.replace_all(&s, "\n");
    let s = TRAILING_WS_RE.replace_all(&s, "\n");
    let s = EXCESS_NEWLINES_RE.replace_all(&s, "\n\n");
    s.trim().to_string()
}

/// Normalize optional text; `None` yields an empty string.
pub fn normalize_opt(text: Option<&str>) -> String {
    text.map(normalize).unwrap_or_default()
}

/// Take at most `max_chars` characters from the start of `text`.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Guess a conversation title from the document title.
pub fn guess_title(document_title: &str) -> String {
    let title = document_title.trim();
    if title.is_empty() || title.to_lowercase().contains("chatgpt") {
        return DEFAULT_TITLE.to_string();
    }
    title.to_string()
}

/// Find a public share link for the conversation.
///
/// The page URL wins when it already points at a share path; otherwise the
/// first link on the page containing `/share/` is used.
pub fn find_share_url<I, S>(page_url: &str, links: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if SHARE_PATH_RE.is_match(page_url) {
        return page_url.to_string();
    }
    links
        .into_iter()
        .find(|href| href.as_ref().contains("/share/"))
        .map(|href| href.as_ref().to_string())
        .unwrap_or_default()
}

/// Best-effort project label detection.
///
/// Picks the first short, tag-like candidate that is not generic UI text.
/// Falls back to [`DEFAULT_PROJECT`]. Results are heuristic only.
pub fn guess_project<I, S>(candidates: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for candidate in candidates {
        let text = candidate.as_ref().trim();
        if text.is_empty() || text.chars().count() > 60 {
            continue;
        }
        if PROJECT_BLACKLIST.contains(&text) {
            continue;
        }
        if text.to_lowercase().contains("chatgpt") || text.chars().count() < 3 {
            continue;
        }
        if PROJECT_TAG_RE.is_match(text) {
            return text.to_string();
        }
    }
    DEFAULT_PROJECT.to_string()
}
