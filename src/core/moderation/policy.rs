// Keyword policy - decides whether a message violates the chat rules.
//
// A message is a violation when its trimmed, lowercased text contains one of
// the configured keywords as a plain substring. Nothing fuzzy, nothing
// stateful: the same text and keyword set always give the same answer.

use super::moderation_models::ViolationResult;
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum KeywordLoadError {
    #[error("Failed to read keyword file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed keyword file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Keyword list is empty")]
    Empty,
}

// ============================================================================
// KEYWORD SET
// ============================================================================

/// Lowercase keywords in the order they were loaded.
///
/// Built once at startup and only ever read afterwards, so it can be shared
/// between message tasks behind an `Arc` with no locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Normalize and deduplicate `raw` keywords.
    ///
    /// Entries are trimmed and lowercased, blank entries are dropped and the
    /// first occurrence of a duplicate wins. An empty result is an error: a
    /// bot with nothing to match is misconfigured.
    pub fn new<I, S>(raw: I) -> Result<Self, KeywordLoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut keywords = Vec::new();

        for entry in raw {
            let keyword = entry.as_ref().trim().to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            if seen.insert(keyword.clone()) {
                keywords.push(keyword);
            }
        }

        if keywords.is_empty() {
            return Err(KeywordLoadError::Empty);
        }

        Ok(Self { keywords })
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Where the keyword list comes from. Loaded once; a restart picks up edits.
#[async_trait]
pub trait KeywordStore: Send + Sync {
    async fn load_keywords(&self) -> Result<KeywordSet, KeywordLoadError>;
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Trim and lowercase message text.
///
/// `str::to_lowercase` follows the Unicode default case mapping and ignores
/// the process locale, so results are the same on every platform.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Check `text` against `keywords`, reporting the first keyword (in load
/// order) that appears in it.
pub fn evaluate(text: &str, keywords: &KeywordSet) -> ViolationResult {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return ViolationResult::NoMatch;
    }

    keywords
        .iter()
        .find(|keyword| normalized.contains(*keyword))
        .map(ViolationResult::matched)
        .unwrap_or(ViolationResult::NoMatch)
}
