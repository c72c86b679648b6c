//! Hit list normalization: drop empty and repeated ids, keep the top K.

use super::Hit;
use std::collections::HashSet;

/// Deduplicate `hits` by id and truncate to `k`, preserving the order of first
/// occurrence. Hits with an empty id are discarded.
pub fn dedup_top_k(hits: Vec<Hit>, k: usize) -> Vec<Hit> {
    let capacity = k.min(hits.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(capacity);
    let mut out = Vec::with_capacity(capacity);
    if k == 0 {
        return out;
    }
    for hit in hits {
        if hit.id.is_empty() || seen.contains(&hit.id) {
            continue;
        }
        seen.insert(hit.id.clone());
        out.push(hit);
        if out.len() >= k {
            break;
        }
    }
    out
}
