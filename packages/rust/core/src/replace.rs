//! Name matching for the competitor replacement loop.

use compete_shared::Competitor;

/// Extra candidates requested beyond `count + excluded` to survive filtering.
pub const REPLACEMENT_HEADROOM: usize = 3;

/// Case-insensitive substring match in either direction.
pub fn names_overlap(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// Keep candidates whose names overlap none of `excluded`, up to `count`.
pub fn exclude_named(
    candidates: Vec<Competitor>,
    excluded: &[String],
    count: usize,
) -> Vec<Competitor> {
    candidates
        .into_iter()
        .filter(|c| !excluded.iter().any(|name| names_overlap(&c.name, name)))
        .take(count)
        .collect()
}
