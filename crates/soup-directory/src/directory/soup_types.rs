//! Soup-type name normalization.
//!
//! Stored soup types are free text ("Pho", "pho soup", "PHO"), so every comparison goes through
//! a canonical slug plus a small set of variants covering the `-soup` suffix ambiguity.

use std::collections::BTreeSet;

use super::slug::slugify;

const SOUP_SUFFIX: &str = "-soup";

/// Lowercase slug with runs of non-alphanumerics collapsed to one hyphen.
pub fn soup_slug(raw: &str) -> String {
    slugify(raw)
}

/// Slug plus its `-soup` suffixed or stripped counterpart.
pub fn slug_variants(raw: &str) -> BTreeSet<String> {
    let slug = soup_slug(raw);
    let mut variants = BTreeSet::new();
    if slug.is_empty() {
        return variants;
    }

    if let Some(stripped) = slug.strip_suffix(SOUP_SUFFIX) {
        if !stripped.is_empty() {
            variants.insert(stripped.to_string());
        }
    } else if !slug.contains(SOUP_SUFFIX) {
        variants.insert(format!("{slug}{SOUP_SUFFIX}"));
    }

    variants.insert(slug);
    variants
}

/// Casing forms of a caller-supplied filter value, for stores that only compare verbatim.
pub fn case_variants(raw: &str) -> BTreeSet<String> {
    let trimmed = raw.trim();
    let mut variants = BTreeSet::new();
    if trimmed.is_empty() {
        return variants;
    }

    variants.insert(trimmed.to_string());
    variants.insert(trimmed.to_lowercase());
    variants.insert(trimmed.to_uppercase());
    variants.insert(title_case(trimmed));
    variants
}

/// Canonical grouping key: the slug with any `-soup` suffix removed.
pub fn soup_key(raw: &str) -> String {
    let slug = soup_slug(raw);
    match slug.strip_suffix(SOUP_SUFFIX) {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => slug,
    }
}

pub fn soup_types_match(left: &str, right: &str) -> bool {
    let left = slug_variants(left);
    !left.is_empty() && !left.is_disjoint(&slug_variants(right))
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A normalized soup-type filter, ready for both store lookup and in-memory re-checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoupTypeMatch {
    requested: Vec<String>,
    case_variants: BTreeSet<String>,
    slug_variants: BTreeSet<String>,
}

impl SoupTypeMatch {
    /// Returns `None` when the filter is empty or contains the `all` sentinel.
    pub fn from_requested<I, S>(requested: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for value in requested {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            if value.eq_ignore_ascii_case("all") {
                return None;
            }
            filter.requested.push(value.to_string());
            filter.case_variants.extend(case_variants(value));
            filter.slug_variants.extend(slug_variants(value));
        }

        if filter.slug_variants.is_empty() {
            None
        } else {
            Some(filter)
        }
    }

    pub fn requested(&self) -> &[String] {
        &self.requested
    }

    pub fn case_variants(&self) -> &BTreeSet<String> {
        &self.case_variants
    }

    pub fn slug_variants(&self) -> &BTreeSet<String> {
        &self.slug_variants
    }

    /// Whether a stored soup type satisfies the filter after normalization.
    pub fn accepts(&self, soup_type: &str) -> bool {
        !slug_variants(soup_type).is_disjoint(&self.slug_variants)
    }
}
