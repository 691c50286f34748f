//! Search-token extraction from torrent titles.

use std::collections::HashSet;

use jieba_rs::Jieba;
use once_cell::sync::Lazy;
use regex::Regex;

/// Unicode punctuation and symbols.
static SYMBOLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{P}\p{S}]").unwrap());

/// Default dictionary, loaded once per process.
static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

/// Splits cleaned text into words.
pub trait Segmenter: Send + Sync {
    /// Segment `text`. May return duplicates and blank tokens; callers
    /// normalize the output.
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Dictionary segmenter in search-engine mode.
///
/// Long words are preceded by the shorter dictionary words they contain, so
/// both `清华大学` and `大学` are indexed. Latin runs pass through whole and
/// are lowercased.
#[derive(Debug, Clone, Copy, Default)]
pub struct JiebaSegmenter;

impl Segmenter for JiebaSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        JIEBA
            .cut_for_search(text, true)
            .into_iter()
            .map(str::to_lowercase)
            .collect()
    }
}

/// Replace every punctuation or symbol character with a space.
pub fn strip_symbols(title: &str) -> String {
    SYMBOLS.replace_all(title, " ").into_owned()
}

/// Tokens for `title`: symbols stripped, segmented, de-duplicated in
/// first-occurrence order, blank tokens dropped.
pub fn search_tokens(segmenter: &dyn Segmenter, title: &str) -> Vec<String> {
    let cleaned = strip_symbols(title);
    let mut seen = HashSet::new();
    segmenter
        .segment(&cleaned)
        .into_iter()
        .filter(|token| !token.trim().is_empty())
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
