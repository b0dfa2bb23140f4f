//! Helpers for sanitizing data before it enters logs or tracing spans.
//!
//! Provider URLs can carry access tokens in their query string and provider
//! error bodies can be arbitrarily large; neither should reach a log verbatim.

/// Maximum number of characters of a provider response body kept in errors.
pub const MAX_BODY_CHARS: usize = 200;

/// Replaces every query parameter value with `****`.
///
/// - `https://graph.facebook.com/v18.0/1/media?access_token=abc` → `...?access_token=****`
/// - `https://example.com/a` → unchanged
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let redacted: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) => format!("{}=****", key),
            None => pair.to_string(),
        })
        .collect();

    format!("{}?{}", base, redacted.join("&"))
}

/// The first `max_chars` characters of `text`. Never splits a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Truncates trimmed text to at most `max_chars` characters, appending `...`
/// when cut.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let kept = truncate_chars(trimmed, max_chars);
    if kept.len() < trimmed.len() {
        format!("{}...", kept)
    } else {
        kept.to_string()
    }
}

/// Returns the host of a URL without a leading `www.`, or the input if it
/// has no recognizable host.
pub fn domain_of(url: &str) -> String {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(after_scheme);
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}
