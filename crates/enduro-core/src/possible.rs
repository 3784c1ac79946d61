//! Minimum possible increments for a given speed.
//!
//! In a time keeping enduro every checkpoint, speed change and reset to zero
//! sits on a whole tenth of distance *and* a whole minute. Given the current
//! speed, the smallest such step (a "possible") is the minimum time `T` in
//! minutes for which `S * T / 60` lands on a tenth. Riding at 9 the rider
//! covers 0.3 every 2 minutes, so there is a possible every 0.3.
//!
//! `T` is always one of `[1, 2, 3, 6]`: with `T = 6` the distance is
//! `S / 10`, a tenth for any whole speed.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::units::{Distance, Seconds, div_round_half_up};

/// Candidate time intervals, smallest first.
const INTERVALS: [u32; 4] = [1, 2, 3, 6];

/// The smallest distance/time step that lands on both a tenth and a minute
/// at `speed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MinimumPossible {
    pub speed: u32,
    pub distance: Distance,
    pub minutes: u32,
}

impl MinimumPossible {
    /// Step distance in whole units (`0.3` at speed 18).
    pub fn distance_units(&self) -> f64 {
        self.distance.units()
    }

    /// Seconds needed to cover `delta` at this pace, rounded half up.
    pub fn seconds_for(&self, delta: Distance) -> Seconds {
        let step = self.distance.hundredths();
        if step == 0 {
            return 0;
        }
        let scaled = (i64::from(self.minutes) * 60).saturating_mul(delta.hundredths());
        div_round_half_up(scaled, step)
    }

    /// Whether `delta` is a whole, non-negative number of steps.
    pub fn is_on_possible(&self, delta: Distance) -> bool {
        let step = self.distance.hundredths();
        step != 0 && delta.hundredths() >= 0 && delta.hundredths() % step == 0
    }

    /// Number of seconds in one step.
    pub fn step_seconds(&self) -> Seconds {
        Seconds::from(self.minutes) * 60
    }
}

/// Finds the minimum `T` satisfying `(100 * S * T / 60) % 10 == 0`,
/// i.e. `S * T` divisible by 6. The check stays in integers.
fn compute_minimum(speed: u32) -> MinimumPossible {
    let s = u64::from(speed);
    INTERVALS
        .iter()
        .map(|&t| (t, s * u64::from(t)))
        .find(|&(_, st)| st % 6 == 0)
        .map(|(t, st)| MinimumPossible {
            speed,
            distance: Distance::from_tenths((st / 6) as i64),
            minutes: t,
        })
        .unwrap_or(MinimumPossible {
            speed,
            distance: Distance::ZERO,
            minutes: 0,
        })
}

fn cache() -> &'static Mutex<HashMap<u32, MinimumPossible>> {
    static CACHE: OnceLock<Mutex<HashMap<u32, MinimumPossible>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Returns the minimum possible for `speed`, memoized for the life of the
/// process. Speeds below 1 are treated as 1, so the result always has a
/// non-zero step.
pub fn minimum(speed: u32) -> MinimumPossible {
    let speed = speed.max(1);
    match cache().lock() {
        Ok(mut map) => *map.entry(speed).or_insert_with(|| compute_minimum(speed)),
        // Poisoned: compute without caching.
        Err(_) => compute_minimum(speed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect(speed: u32, units: f64, minutes: u32) {
        let m = minimum(speed);
        assert_eq!(m.speed, speed, "speed={speed}");
        assert_eq!(m.distance_units(), units, "speed={speed}");
        assert_eq!(m.minutes, minutes, "speed={speed}");
    }

    #[test]
    fn canonical_table() {
        #[rustfmt::skip]
        let table: [(f64, u32); 60] = [
            (0.1, 6), (0.1, 3), (0.1, 2), (0.2, 3), (0.5, 6), (0.1, 1),
            (0.7, 6), (0.4, 3), (0.3, 2), (0.5, 3), (1.1, 6), (0.2, 1),
            (1.3, 6), (0.7, 3), (0.5, 2), (0.8, 3), (1.7, 6), (0.3, 1),
            (1.9, 6), (1.0, 3), (0.7, 2), (1.1, 3), (2.3, 6), (0.4, 1),
            (2.5, 6), (1.3, 3), (0.9, 2), (1.4, 3), (2.9, 6), (0.5, 1),
            (3.1, 6), (1.6, 3), (1.1, 2), (1.7, 3), (3.5, 6), (0.6, 1),
            (3.7, 6), (1.9, 3), (1.3, 2), (2.0, 3), (4.1, 6), (0.7, 1),
            (4.3, 6), (2.2, 3), (1.5, 2), (2.3, 3), (4.7, 6), (0.8, 1),
            (4.9, 6), (2.5, 3), (1.7, 2), (2.6, 3), (5.3, 6), (0.9, 1),
            (5.5, 6), (2.8, 3), (1.9, 2), (2.9, 3), (5.9, 6), (1.0, 1),
        ];
        for (i, (units, minutes)) in table.iter().enumerate() {
            expect(i as u32 + 1, *units, *minutes);
        }
    }

    #[test]
    fn spot_values() {
        expect(18, 0.3, 1);
        expect(6, 0.1, 1);
        expect(9, 0.3, 2);
    }

    #[test]
    fn zero_speed_is_clamped() {
        assert_eq!(minimum(0), minimum(1));
        assert!(!minimum(0).distance.is_zero());
    }

    #[test]
    fn large_speeds_still_have_a_step() {
        let m = minimum(997);
        assert_eq!(m.minutes, 6);
        assert_eq!(m.distance, Distance::from_tenths(997));
    }

    #[test]
    fn seconds_for_distance() {
        let m = minimum(18);
        assert_eq!(m.seconds_for(Distance::from_units(3.3)), 11 * 60);
        let m = minimum(24);
        assert_eq!(m.seconds_for(Distance::from_units(0.39)), 59);
    }

    #[test]
    fn on_possible() {
        let m = minimum(18);
        assert!(m.is_on_possible(Distance::from_units(3.3)));
        assert!(m.is_on_possible(Distance::ZERO));
        assert!(!m.is_on_possible(Distance::from_units(3.1)));
        assert!(!m.is_on_possible(Distance::from_units(-0.3)));
    }
}
