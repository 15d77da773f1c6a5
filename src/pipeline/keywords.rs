/// Splits a generated keyword blob on commas, trimming each token and dropping empty ones.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(str::to_string)
        .collect()
}

/// Anchors the search on the literal prompt, followed by the first `limit` keywords.
/// A `limit` of zero appends every keyword.
pub fn build_search_query(prompt: &str, keywords: &[String], limit: usize) -> String {
    let take = if limit == 0 {
        keywords.len()
    } else {
        limit.min(keywords.len())
    };
    let prompt = prompt.trim();
    if take == 0 {
        return prompt.to_string();
    }
    format!("{} {}", prompt, keywords[..take].join(" "))
}
