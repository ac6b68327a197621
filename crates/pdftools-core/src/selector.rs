//! Page selector parsing
//!
//! Turns user input like `"1-5, 8, 10-15"` into zero-based page indices.
//! Parsing is tolerant: unparsable terms are skipped, reversed ranges are
//! empty, and page numbers outside `1..=total_pages` are dropped.

use std::collections::BTreeSet;

/// Sorted, deduplicated zero-based page indices, all below the page count
/// they were resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet(Vec<usize>);

impl PageSet {
    /// Every page of a `total_pages` document.
    pub fn all(total_pages: usize) -> Self {
        PageSet((0..total_pages).collect())
    }

    /// Just the page at `index`, or nothing if it is past the end.
    pub fn single(index: usize, total_pages: usize) -> Self {
        PageSet((index < total_pages).then_some(index).into_iter().collect())
    }

    /// Pages of a `total_pages` document that are not in this set.
    pub fn complement(&self, total_pages: usize) -> Self {
        PageSet(
            (0..total_pages)
                .filter(|index| self.0.binary_search(index).is_err())
                .collect(),
        )
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    fn from_sorted(indices: BTreeSet<usize>) -> Self {
        PageSet(indices.into_iter().collect())
    }
}

/// Resolve a selector into the union of all its terms.
pub fn parse_page_set(selector: &str, total_pages: usize) -> PageSet {
    let mut pages = BTreeSet::new();
    for term in selector.split(',') {
        pages.extend(resolve_term(term, total_pages));
    }
    PageSet::from_sorted(pages)
}

/// Resolve a selector into one page set per comma-separated term,
/// dropping terms that select nothing.
pub fn parse_page_groups(selector: &str, total_pages: usize) -> Vec<PageSet> {
    selector
        .split(',')
        .map(|term| PageSet::from_sorted(resolve_term(term, total_pages).collect()))
        .filter(|group| !group.is_empty())
        .collect()
}

/// Zero-based indices selected by a single term. Empty when the term is
/// malformed or falls entirely outside the document.
fn resolve_term(term: &str, total_pages: usize) -> impl Iterator<Item = usize> {
    let bounds = match term.split_once('-') {
        Some((start, end)) => parse_page_number(start).zip(parse_page_number(end)),
        None => parse_page_number(term).map(|page| (page, page)),
    };

    let total = total_pages as u64;
    let (first, last) = match bounds {
        Some((start, end)) => (start.max(1), end.min(total)),
        None => (1, 0),
    };

    // Both bounds are within 1..=total here, so the casts cannot truncate.
    (first..=last).map(|page| (page - 1) as usize)
}

/// A 1-based page number read from the leading digits of `input`, so
/// `"3x"` is page 3 and the `"2-3"` tail of `"1-2-3"` is page 2. Digit runs
/// too long for `u64` saturate, which keeps them out of range instead of
/// making the term unparsable.
fn parse_page_number(input: &str) -> Option<u64> {
    let input = input.trim();
    let input = input.strip_prefix('+').unwrap_or(input);
    let end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let digits = &input[..end];
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}
