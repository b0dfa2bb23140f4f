use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static RE_HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+").unwrap());

/// Hashtags in order of appearance. Tags differing only in letter case,
/// including non-ASCII letters, count as duplicates; the first spelling wins.
pub fn extract_hashtags(caption: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut tags: Vec<String> = Vec::new();
    for m in RE_HASHTAG.find_iter(caption) {
        let tag = m.as_str();
        if seen.insert(tag.to_lowercase()) {
            tags.push(tag.to_string());
        }
    }
    tags
}
