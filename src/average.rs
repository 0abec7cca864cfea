//! Arithmetic mean of a [`Window`], kept exact to two decimal places.
//!
//! The sum is taken over `i128`, so no intermediate rounding happens before
//! the single half-away-from-zero rounding step to hundredths.

use std::fmt;

use crate::window::Window;

/// A mean rounded to hundredths.  Displays with exactly two fractional digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Average {
    hundredths: i128,
}

impl Average {
    pub const ZERO: Average = Average { hundredths: 0 };

    /// Mean of `values`, `0.00` when empty.
    pub fn of(values: impl IntoIterator<Item = i64>) -> Self {
        let (sum, count) = values
            .into_iter()
            .fold((0i128, 0i128), |(sum, count), v| (sum + i128::from(v), count + 1));

        if count == 0 {
            return Self::ZERO;
        }

        Self {
            hundredths: div_round_half_away(sum * 100, count),
        }
    }

}

/// Mean of the window contents.  Total: an empty window yields `0.00`.
pub fn average(window: &Window) -> Average {
    if window.is_empty() {
        return Average::ZERO;
    }
    Average::of(window.iter())
}

/// `num / den` rounded to the nearest integer, ties away from zero.
/// `den` must be positive.
fn div_round_half_away(num: i128, den: i128) -> i128 {
    let quotient = num / den;
    let remainder = num % den;
    if 2 * remainder.abs() >= den {
        quotient + num.signum()
    } else {
        quotient
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.hundredths < 0 { "-" } else { "" };
        let abs = self.hundredths.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
