/// Block-explorer link for a transaction hash.
pub fn explorer_tx_url(explorer_url: &str, tx_hash: &str) -> String {
    format!("{}/tx/{}", explorer_url.trim_end_matches('/'), tx_hash)
}

/// Number of non-overlapping occurrences of `needle` in `text`.
pub fn count_phrase(text: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    text.matches(needle).count()
}
