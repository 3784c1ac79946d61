//! Decimal rounding and the fixed-point units used by every route sheet
//! computation.
//!
//! Distances are stored as whole hundredths of the route's distance unit
//! (miles or kilometers, the engine does not care which). The public API
//! speaks in whole units (`3.12`) and in tenths (`31.2`), but all arithmetic
//! happens on integers so that sorting, lap accounting and the possible
//! checks never see binary floating-point artifacts.
//!
//! Times are whole seconds relative to the route sheet's key time.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Seconds relative to the key time (or since midnight for key times).
pub type Seconds = i64;

// ---------------------------------------------------------------------------
// Decimal adjustment
// ---------------------------------------------------------------------------

/// Rounding mode used by [`decimal_adjust`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Round,
    Floor,
    Ceil,
}

impl Adjust {
    fn apply(self, value: f64) -> f64 {
        match self {
            Adjust::Round => round_half_up(value),
            Adjust::Floor => value.floor(),
            Adjust::Ceil => value.ceil(),
        }
    }
}

/// Rounds half-way values towards positive infinity (`-2.5 -> -2`).
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Adjusts `value` to the power-of-ten exponent `exp` (`-2` keeps two
/// decimals) by shifting the decimal point in the value's textual form,
/// rounding, and shifting back.
///
/// Multiplying by `10^n` in binary loses the decimal digits the user typed:
/// `1.005 * 100` is `100.49999999999999`. Shifting through the shortest
/// round-trip decimal representation keeps `1.005` at `100.5`.
pub fn decimal_adjust(mode: Adjust, value: f64, exp: i32) -> f64 {
    if exp == 0 {
        return mode.apply(value);
    }
    if !value.is_finite() {
        return f64::NAN;
    }
    let shifted = shift(value, -exp);
    shift(mode.apply(shifted), exp)
}

fn shift(value: f64, places: i32) -> f64 {
    format!("{value}e{places}").parse().unwrap_or(f64::NAN)
}

/// Decimal round, e.g. `round10(1.005, -2) == 1.01`.
pub fn round10(value: f64, exp: i32) -> f64 {
    decimal_adjust(Adjust::Round, value, exp)
}

/// Decimal floor, e.g. `floor10(55.59, -1) == 55.5`.
pub fn floor10(value: f64, exp: i32) -> f64 {
    decimal_adjust(Adjust::Floor, value, exp)
}

/// Decimal ceil, e.g. `ceil10(55.51, -1) == 55.6`.
pub fn ceil10(value: f64, exp: i32) -> f64 {
    decimal_adjust(Adjust::Ceil, value, exp)
}

/// Integer division rounding half-way quotients towards positive infinity.
/// `den` must be positive. Widened to `i128` so no `i64` input overflows.
pub(crate) fn div_round_half_up(num: i64, den: i64) -> i64 {
    let (num, den) = (i128::from(num), i128::from(den));
    let quotient = (2 * num + den).div_euclid(2 * den);
    quotient.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

// ---------------------------------------------------------------------------
// Distance
// ---------------------------------------------------------------------------

/// A route distance in whole hundredths of the distance unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Distance(i64);

impl Distance {
    pub const ZERO: Distance = Distance(0);

    /// Largest magnitude [`Distance::from_units`] produces (100 000 units).
    pub const MAX: Distance = Distance(10_000_000);

    /// Build from hundredths of a unit.
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Distance(hundredths)
    }

    /// Build from whole tenths of a unit.
    pub const fn from_tenths(tenths: i64) -> Self {
        Distance(tenths * 10)
    }

    /// Build from a user-facing value in whole units. The value is scaled to
    /// tenths and rounded to one decimal of a tenth, then clamped to
    /// `±MAX`. NaN is zero.
    pub fn from_units(units: f64) -> Self {
        let limit = Self::MAX.0 as f64 / 100.0;
        let units = if units.is_nan() { 0.0 } else { units.clamp(-limit, limit) };
        let tenths = round10(units * 10.0, -1);
        Distance((tenths * 10.0).round() as i64)
    }

    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Distance in tenths of a unit (`3.12` units is `31.2`).
    pub fn tenths(self) -> f64 {
        self.0 as f64 / 10.0
    }

    /// Distance in whole units.
    pub fn units(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Distance {
    /// Two fixed decimals, as the route sheet file format writes them.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let text = format!("{sign}{}.{:02}", abs / 100, abs % 100);
        f.pad(&text)
    }
}

impl Add for Distance {
    type Output = Distance;
    fn add(self, rhs: Distance) -> Distance {
        Distance(self.0 + rhs.0)
    }
}

impl AddAssign for Distance {
    fn add_assign(&mut self, rhs: Distance) {
        self.0 += rhs.0;
    }
}

impl Sub for Distance {
    type Output = Distance;
    fn sub(self, rhs: Distance) -> Distance {
        Distance(self.0 - rhs.0)
    }
}

impl SubAssign for Distance {
    fn sub_assign(&mut self, rhs: Distance) {
        self.0 -= rhs.0;
    }
}

impl Neg for Distance {
    type Output = Distance;
    fn neg(self) -> Distance {
        Distance(-self.0)
    }
}

impl std::iter::Sum for Distance {
    fn sum<I: Iterator<Item = Distance>>(iter: I) -> Distance {
        Distance(iter.map(|d| d.0).sum())
    }
}

// ---------------------------------------------------------------------------
// Time formatting
// ---------------------------------------------------------------------------

const SECONDS_PER_DAY: Seconds = 24 * 60 * 60;

/// Formats `key_time + offset` as a zero-prefixed `HH:MM:SS` wall-clock
/// time, wrapping at midnight. `seconds_to_time(34200, 0) == "09:30:00"`.
pub fn seconds_to_time(key_time: Seconds, offset: Seconds) -> String {
    let total = (key_time + offset).rem_euclid(SECONDS_PER_DAY);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

/// Formats a key time as `H:MM` (or `HH:MM` with `zero_prefix`).
pub fn key_time_no_seconds(key_time: Seconds, zero_prefix: bool) -> String {
    let total = key_time.rem_euclid(SECONDS_PER_DAY);
    let hours = total / 3600;
    let minutes = (total / 60) % 60;
    if zero_prefix {
        format!("{hours:02}:{minutes:02}")
    } else {
        format!("{hours}:{minutes:02}")
    }
}

/// Parses `H:MM` or `HH:MM` into seconds since midnight. Key times are
/// whole minutes, so a seconds field is rejected.
pub fn parse_key_time(text: &str) -> Option<Seconds> {
    let (hours, minutes) = text.trim().split_once(':')?;
    let hours: Seconds = hours.trim().parse().ok()?;
    let minutes: Seconds = minutes.trim().parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 3600 + minutes * 60)
}
