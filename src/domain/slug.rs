//! Deterministic slug derivation and the lookup tie-break heuristic.
//!
//! Slugs are derived from titles and are not unique: two similar titles can
//! collide. Lookup therefore resolves in two steps — exact normalized match
//! first, then a word-overlap fallback that tolerates minor title edits
//! breaking old inbound links. The fallback is inherently ambiguous and may
//! pick a wrong item when titles are very similar; that behavior is kept
//! on purpose for link compatibility.

use slug::slugify;
use thiserror::Error;

/// Minimum share of whitespace-delimited tokens two slugs must have in
/// common for the fallback tie-break to accept a candidate.
const TOKEN_OVERLAP_THRESHOLD: f64 = 0.7;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive the canonical slug for a title.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Normalize a requested slug the same way stored slugs are derived, so
/// lookups are insensitive to case and separator noise.
pub fn normalize_slug(requested: &str) -> String {
    slugify(requested)
}

/// Fraction of the requested slug's tokens that also appear in the candidate.
///
/// Tokens are the hyphen-delimited words of a slug (whitespace-delimited in
/// the pre-slugified title).
pub fn token_overlap(requested: &str, candidate: &str) -> f64 {
    let requested_tokens: Vec<&str> = requested.split('-').filter(|t| !t.is_empty()).collect();
    if requested_tokens.is_empty() {
        return 0.0;
    }

    let candidate_tokens: Vec<&str> = candidate.split('-').filter(|t| !t.is_empty()).collect();
    let shared = requested_tokens
        .iter()
        .filter(|token| candidate_tokens.contains(token))
        .count();

    shared as f64 / requested_tokens.len() as f64
}

/// Whether a candidate slug should satisfy a lookup for the requested slug.
pub fn slug_matches(requested: &str, candidate: &str) -> bool {
    if requested == candidate {
        return true;
    }
    token_overlap(requested, candidate) >= TOKEN_OVERLAP_THRESHOLD
}
