//! Cumulative-weight random draws.
//!
//! Both samplers walk their items in a caller-supplied, stable order and
//! subtract weights from a uniform draw until it reaches zero.  The random
//! source is always injected so draws are reproducible under a seeded RNG.

use rand::Rng;

use crate::composer::CategoryWeights;
use crate::schema::Category;

/// Walk `items` subtracting weights from `r` and return the first item that
/// brings it to `<= 0`.  Non-positive weights are never chosen.  If floating
/// point rounding leaves `r` slightly positive after the last item, the last
/// positive-weight item wins.
pub fn pick_cumulative<T: Copy>(items: impl IntoIterator<Item = (T, f64)>, mut r: f64) -> Option<T> {
    let mut last_positive = None;
    for (item, weight) in items {
        if weight.is_nan() || weight <= 0.0 {
            continue;
        }
        last_positive = Some(item);
        r -= weight;
        if r <= 0.0 {
            return Some(item);
        }
    }
    last_positive
}

/// Draw one category from a normalized weight map.
pub fn draw_category<R: Rng + ?Sized>(weights: &CategoryWeights, rng: &mut R) -> Option<Category> {
    let r: f64 = rng.r#gen();
    pick_cumulative(weights.iter(), r)
}

/// Draw one message from ranked `(message, weight)` pairs.  Weights need not
/// be normalized.
pub fn draw_message<'a, R: Rng + ?Sized>(ranked: &[(&'a str, f64)], rng: &mut R) -> Option<&'a str> {
    let total: f64 = ranked.iter().map(|(_, w)| w.max(0.0)).sum();
    if total.is_nan() || total <= 0.0 {
        return None;
    }
    let r = rng.r#gen::<f64>() * total;
    pick_cumulative(ranked.iter().copied(), r)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn cumulative_walk_boundaries() {
        let items = [("a", 0.2), ("b", 0.5), ("c", 0.3)];
        assert_eq!(pick_cumulative(items, 0.0), Some("a"));
        assert_eq!(pick_cumulative(items, 0.2), Some("a"));
        assert_eq!(pick_cumulative(items, 0.21), Some("b"));
        assert_eq!(pick_cumulative(items, 0.7), Some("b"));
        assert_eq!(pick_cumulative(items, 0.99), Some("c"));
    }

    #[test]
    fn rounding_overflow_returns_last_positive() {
        let items = [("a", 0.5), ("b", 0.5), ("z", 0.0)];
        assert_eq!(pick_cumulative(items, 1.0 + 1e-12), Some("b"));
    }

    #[test]
    fn zero_weights_are_never_chosen() {
        let items = [("zero", 0.0), ("one", 1.0)];
        assert_eq!(pick_cumulative(items, 0.0), Some("one"));
        assert_eq!(pick_cumulative::<&str>([], 0.5), None);
        assert_eq!(pick_cumulative([("nan", f64::NAN)], 0.5), None);
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let weights = CategoryWeights::from_pairs(&[
            (Category::Motivation, 0.5),
            (Category::Focus, 0.5),
        ]);
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let left: Vec<_> = (0..20).map(|_| draw_category(&weights, &mut a)).collect();
        let right: Vec<_> = (0..20).map(|_| draw_category(&weights, &mut b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn message_draw_tracks_weights() {
        let ranked = [("rare", 0.1), ("common", 0.9)];
        let mut rng = StdRng::seed_from_u64(42);
        let common = (0..2000)
            .filter(|_| draw_message(&ranked, &mut rng) == Some("common"))
            .count();
        assert!((1650..=1950).contains(&common), "common drawn {common} times");
    }

    #[test]
    fn empty_or_weightless_candidates_yield_none() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(draw_message(&[], &mut rng), None);
        assert_eq!(draw_message(&[("x", 0.0)], &mut rng), None);
    }
}
