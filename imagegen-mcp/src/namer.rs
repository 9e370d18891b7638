//! Filename derivation from prompts.
//!
//! Derived names look like `2026-01-19_cute_robot_waving.jpg`: an ISO date
//! prefix, up to five significant keywords from the prompt in their original
//! order, an optional variant suffix, and the fixed image extension.

use chrono::NaiveDate;

/// Extension of every generated image file.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Maximum number of keywords kept from a prompt.
const MAX_KEYWORDS: usize = 5;

/// Upper bound on slug length, keeping derived names well inside path limits.
const MAX_SLUG_LEN: usize = 64;

/// Slug used when no keyword survives filtering.
const FALLBACK_SLUG: &str = "image";

/// Words skipped when extracting key terms from a prompt.
static STOP_WORDS: &[&str] = &[
    "a", "an", "the", "in", "on", "at", "to", "for", "of", "with", "and", "or",
    "but", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "do", "does", "did", "will", "would", "could", "should", "may",
    "might", "must", "shall", "can", "very", "really", "just", "also", "that",
    "this", "style", "image", "picture", "photo", "photograph", "illustration",
];

/// Label family for one indexed output within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// One of several images from the same prompt (`_v1`, `_v2`, ...)
    Numbered,
    /// One of several variations of reference images (`_var1`, `_var2`, ...)
    Variation,
}

impl VariantKind {
    fn suffix(self, index: usize) -> String {
        match self {
            VariantKind::Numbered => format!("_v{}", index),
            VariantKind::Variation => format!("_var{}", index),
        }
    }
}

/// An indexed output within a multi-image batch. Single-image requests carry
/// no variant and get no suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub kind: VariantKind,
    /// 1-based position within the batch
    pub index: usize,
}

/// Extract a sanitized keyword slug from a prompt.
///
/// The slug is lowercase, underscore-joined, contains only `[a-z0-9_]`, and
/// is bounded in length. Prompts with no usable keywords (all stop-words,
/// single letters, or non-ASCII text) yield the fixed placeholder slug.
pub fn slug_from_prompt(prompt: &str) -> String {
    let mut cleaned = String::with_capacity(prompt.len());
    for c in prompt.chars() {
        if c.is_ascii_alphanumeric() {
            cleaned.push(c.to_ascii_lowercase());
        } else {
            cleaned.push(' ');
        }
    }

    let keywords: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|word| word.len() > 1 && !STOP_WORDS.contains(word))
        .take(MAX_KEYWORDS)
        .collect();

    if keywords.is_empty() {
        return FALLBACK_SLUG.to_string();
    }

    let mut slug = keywords.join("_");
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        while slug.ends_with('_') {
            slug.pop();
        }
    }
    slug
}

/// Derive a filename for a generated image.
///
/// Deterministic for a given (prompt, variant, date) triple. The variant
/// index keeps names collision-free within one batch; collisions against
/// pre-existing files are handled at write time.
pub fn derive_filename(prompt: &str, variant: Option<Variant>, date: NaiveDate) -> String {
    let slug = slug_from_prompt(prompt);
    let suffix = variant.map(|v| v.kind.suffix(v.index)).unwrap_or_default();
    format!(
        "{}_{}{}.{}",
        date.format("%Y-%m-%d"),
        slug,
        suffix,
        IMAGE_EXTENSION
    )
}
