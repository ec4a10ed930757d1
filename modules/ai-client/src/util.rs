/// Truncate to at most `max_chars` characters. Operates on chars, not bytes,
/// so CJK text keeps a predictable length.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Remove a surrounding markdown code fence, if any, including a language
/// tag on the opening fence ("```json", "```JSON").
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end_matches("```").trim()
}
