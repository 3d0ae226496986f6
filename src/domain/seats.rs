//! Seat and turn-order helpers shared by all engines.
//!
//! Turn advancement lives here so every engine shares a single source of
//! truth for "who acts next": the draft game advances with an always-true
//! predicate, the flip game skips dead and passed seats.

use rand::seq::SliceRandom;
use rand::Rng;

/// 0-based seat index assigned at game start.
pub type Seat = u8;

/// Find the next eligible seat after `current`, searching forward with
/// wraparound. Returns `None` when no *other* seat is eligible; the search
/// never lands back on `current` and never loops forever.
pub fn next_eligible(count: usize, current: Seat, eligible: impl Fn(Seat) -> bool) -> Option<Seat> {
    if count == 0 {
        return None;
    }
    let count = count as u8;
    let mut candidate = (current + 1) % count;
    while candidate != current {
        if eligible(candidate) {
            return Some(candidate);
        }
        candidate = (candidate + 1) % count;
    }
    None
}

/// A uniformly random permutation of `[0, n)`; position `i` of the result is
/// the turn order assigned to the `i`-th seated player.
pub fn random_turn_order(n: usize, rng: &mut impl Rng) -> Vec<Seat> {
    let mut order: Vec<Seat> = (0..n as Seat).collect();
    order.shuffle(rng);
    order
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn skips_dead_and_passed_seats() {
        // Seat 1 dead, seat 2 passed: from seat 0 of 4 we land on seat 3.
        let alive = [true, false, true, true];
        let passed = [false, false, true, false];
        let next = next_eligible(4, 0, |s| alive[s as usize] && !passed[s as usize]);
        assert_eq!(next, Some(3));
    }

    #[test]
    fn reports_failure_when_no_seat_is_eligible() {
        assert_eq!(next_eligible(4, 1, |_| false), None);
        // The current seat being eligible does not count: the search must move.
        assert_eq!(next_eligible(4, 1, |s| s == 1), None);
    }

    #[test]
    fn wraps_around() {
        assert_eq!(next_eligible(3, 2, |_| true), Some(0));
        assert_eq!(next_eligible(1, 0, |_| true), None);
    }

    #[test]
    fn turn_order_is_deterministic_for_a_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(random_turn_order(6, &mut a), random_turn_order(6, &mut b));
    }

    proptest! {
        #[test]
        fn turn_order_is_a_bijection(n in 1usize..=10, seed in any::<u64>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut order = random_turn_order(n, &mut rng);
            order.sort_unstable();
            let expected: Vec<Seat> = (0..n as Seat).collect();
            prop_assert_eq!(order, expected);
        }

        #[test]
        fn next_eligible_never_returns_current(count in 1usize..=10, current in 0u8..10) {
            prop_assume!((current as usize) < count);
            if let Some(next) = next_eligible(count, current, |_| true) {
                prop_assert_ne!(next, current);
                prop_assert!((next as usize) < count);
            }
        }
    }
}
