//! Payload-carrying interval resolution.
//!
//! Used by the subset construction to split overlapping transition ranges
//! into a disjoint partition whose cells carry the merged payloads of every
//! input covering them.

/// A closed interval with a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval<T> {
    pub lower: i32,
    pub upper: i32,
    pub payload: T,
}

impl<T> Interval<T> {
    pub fn new(lower: i32, upper: i32, payload: T) -> Self {
        debug_assert!(lower <= upper);
        Interval {
            lower,
            upper,
            payload,
        }
    }
}

/// Partition the union of the inputs into disjoint intervals.
///
/// Where several inputs cover a cell, the cell's payload is the fold of
/// their payloads under `merge` (applied in input order; the combiner is
/// expected to be symmetric). Adjacent cells with equal payloads collapse.
pub fn resolve_merging<T, F>(inputs: &[Interval<T>], merge: F) -> Vec<Interval<T>>
where
    T: Clone + PartialEq,
    F: Fn(&T, &T) -> T,
{
    if inputs.is_empty() {
        return Vec::new();
    }

    // Elementary segments between consecutive boundary points.
    let mut bounds = Vec::with_capacity(inputs.len() * 2);
    for iv in inputs {
        bounds.push(iv.lower);
        bounds.push(iv.upper.saturating_add(1));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut out: Vec<Interval<T>> = Vec::new();
    for w in bounds.windows(2) {
        let (lo, hi) = (w[0], w[1] - 1);
        let mut payload: Option<T> = None;
        for iv in inputs {
            if iv.lower <= lo && iv.upper >= hi {
                payload = Some(match payload {
                    None => iv.payload.clone(),
                    Some(acc) => merge(&acc, &iv.payload),
                });
            }
        }
        let Some(payload) = payload else { continue };
        match out.last_mut() {
            Some(prev) if prev.upper + 1 == lo && prev.payload == payload => {
                prev.upper = hi;
            }
            _ => out.push(Interval::new(lo, hi, payload)),
        }
    }
    out
}
