//! Weighted random selection.
//!
//! A pure `weighted_pick(items, rng)` replaces the mutable weighted-list
//! helpers the rest of the crate leans on. Weights are not normalized;
//! negative weights are treated by their absolute value for the total so a
//! degenerate pool resolves to `None` instead of panicking.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An item paired with a selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    pub item: T,
    pub weight: f32,
}

impl<T> Weighted<T> {
    pub fn new(item: T, weight: f32) -> Self {
        Self { item, weight }
    }
}

/// Pick one item proportionally to its weight.
///
/// Returns `None` when the pool is empty or all weights sum to zero.
pub fn weighted_pick<'a, T>(items: &'a [Weighted<T>], rng: &mut impl Rng) -> Option<&'a T> {
    weighted_pick_by(items, |_| true, rng)
}

/// Weighted pick restricted to the items matching `filter`.
pub fn weighted_pick_by<'a, T>(
    items: &'a [Weighted<T>],
    filter: impl Fn(&T) -> bool,
    rng: &mut impl Rng,
) -> Option<&'a T> {
    let total: f32 = items
        .iter()
        .filter(|w| filter(&w.item))
        .map(|w| w.weight.abs())
        .sum();
    if total <= 0.0 {
        return None;
    }

    let draw = rng.gen_range(0.0..total);
    let mut acc = 0.0;
    for w in items.iter().filter(|w| filter(&w.item)) {
        acc += w.weight.abs();
        if draw < acc {
            return Some(&w.item);
        }
    }

    // Floating point accumulation can land a hair short of the total.
    items
        .iter()
        .rev()
        .find(|w| filter(&w.item))
        .map(|w| &w.item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_pool_returns_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let items: Vec<Weighted<&str>> = vec![];
        assert_eq!(weighted_pick(&items, &mut rng), None);
    }

    #[test]
    fn zero_weights_return_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let items = vec![Weighted::new("a", 0.0), Weighted::new("b", 0.0)];
        assert_eq!(weighted_pick(&items, &mut rng), None);
    }

    #[test]
    fn single_item_always_selected() {
        let mut rng = StdRng::seed_from_u64(7);
        let items = vec![Weighted::new("only", 3.0)];
        for _ in 0..10 {
            assert_eq!(weighted_pick(&items, &mut rng), Some(&"only"));
        }
    }

    #[test]
    fn filter_restricts_selection() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = vec![
            Weighted::new(("x", 1), 1.0),
            Weighted::new(("y", 2), 100.0),
        ];
        for _ in 0..20 {
            let picked = weighted_pick_by(&items, |i| i.0 == "x", &mut rng);
            assert_eq!(picked, Some(&("x", 1)));
        }
    }

    #[test]
    fn frequencies_follow_weights() {
        let mut rng = StdRng::seed_from_u64(1234);
        let items = vec![
            Weighted::new("a", 2.0),
            Weighted::new("b", 2.0),
            Weighted::new("c", 4.0),
        ];

        let draws = 10_000;
        let mut counts = [0usize; 3];
        for _ in 0..draws {
            match weighted_pick(&items, &mut rng) {
                Some(&"a") => counts[0] += 1,
                Some(&"b") => counts[1] += 1,
                Some(&"c") => counts[2] += 1,
                other => panic!("unexpected pick: {other:?}"),
            }
        }

        let freq = |n: usize| n as f64 / draws as f64;
        assert!((freq(counts[0]) - 0.25).abs() < 0.02);
        assert!((freq(counts[1]) - 0.25).abs() < 0.02);
        assert!((freq(counts[2]) - 0.50).abs() < 0.02);
    }
}
