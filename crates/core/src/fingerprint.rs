//! Conversation identity fingerprint.
//!
//! The fingerprint is a 31-multiplier rolling hash over UTF-16 code units with
//! 32-bit wraparound, rendered as an unsigned decimal string. It is not a
//! cryptographic hash; only determinism is guaranteed.

use crate::error::{Error, Result};
use crate::helpers::normalize;
use crate::Turn;

/// Hash a seed string into its decimal fingerprint.
pub fn fingerprint(seed: &str) -> String {
    let hash = seed
        .encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)));
    (hash as u32).to_string()
}

/// Build the canonical identity seed for a conversation.
///
/// The seed is the normalized project label, the normalized title and the
/// first `max_turns` turns rendered as `role:text`, one per line, normalized
/// again as a whole. Fails with [`Error::InsufficientIdentity`] when there
/// are no turns or the seed is empty.
pub fn fingerprint_seed<T: Turn>(
    project: &str,
    title: &str,
    turns: &[T],
    max_turns: usize,
) -> Result<String> {
    let first_turns = turns
        .iter()
        .take(max_turns)
        .map(|t| format!("{}:{}", t.role(), normalize(t.text())))
        .collect::<Vec<_>>()
        .join("\n");
    if first_turns.is_empty() {
        return Err(Error::InsufficientIdentity);
    }

    let seed = normalize(&format!(
        "{}\n{}\n{}",
        normalize(project),
        normalize(title),
        first_turns
    ));
    if seed.is_empty() {
        return Err(Error::InsufficientIdentity);
    }
    Ok(seed)
}

/// Fingerprint a conversation from its project, title and opening turns.
pub fn conversation_fingerprint<T: Turn>(
    project: &str,
    title: &str,
    turns: &[T],
    max_turns: usize,
) -> Result<String> {
    fingerprint_seed(project, title, turns, max_turns).map(|seed| fingerprint(&seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::RawMessage;

    #[test]
    fn test_known_values() {
        assert_eq!(fingerprint(""), "0");
        assert_eq!(fingerprint("a"), "97");
        assert_eq!(fingerprint("ab"), (97 * 31 + 98).to_string());
        assert_eq!(fingerprint("hello world"), "1794106052");
        // Negative as i32, reported unsigned.
        assert_eq!(fingerprint("fingerprint"), "2919033060");
    }

    #[test]
    fn test_utf16_code_units() {
        // U+1F600 is a surrogate pair: 0xD83D 0xDE00.
        let expected = (0xD83Di32.wrapping_mul(31).wrapping_add(0xDE00)) as u32;
        assert_eq!(fingerprint("\u{1F600}"), expected.to_string());
    }

    #[test]
    fn test_deterministic_and_sensitive() {
        let seed = "General\nRust help\nuser:How do lifetimes work?";
        assert_eq!(fingerprint(seed), fingerprint(seed));
        assert_ne!(fingerprint(seed), fingerprint("General\nRust help\nuser:How do lifetimes work!"));
    }

    #[test]
    fn test_seed_layout() {
        let turns: Vec<RawMessage> = (0..8)
            .map(|i| RawMessage::new(i, "user", format!("turn {}  \n", i)))
            .collect();
        let seed = fingerprint_seed(" Proj ", "Title", &turns, 6).unwrap();
        let lines: Vec<&str> = seed.lines().collect();
        assert_eq!(lines[0], "Proj");
        assert_eq!(lines[1], "Title");
        assert_eq!(lines.len(), 2 + 6);
        assert_eq!(lines[7], "user:turn 5");
    }

    #[test]
    fn test_byte_order_mark_ignored() {
        let turns = vec![RawMessage::new(0, "user", "Hi")];
        let plain = conversation_fingerprint("General", "Title", &turns, 6).unwrap();
        let marked = conversation_fingerprint("General", "\u{FEFF}Title", &turns, 6).unwrap();
        assert_eq!(plain, marked);
    }

    #[test]
    fn test_seed_requires_turns() {
        let turns: Vec<RawMessage> = Vec::new();
        assert!(matches!(
            fingerprint_seed("General", "Title", &turns, 6),
            Err(Error::InsufficientIdentity)
        ));
    }
}
