//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token, rounded up.
//! Counts Unicode scalar values, not bytes, so non-ASCII text is not
//! over-charged.

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Estimate tokens for several strings, each rounded up separately.
///
/// Never less than the estimate of their concatenation.
pub fn estimate_all<'a>(parts: impl IntoIterator<Item = &'a str>) -> usize {
    parts.into_iter().map(estimate_tokens).sum()
}
