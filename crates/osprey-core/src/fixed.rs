//! Fixed-point price and quantity types.
//!
//! Prices are integer tick counts (hundredths of a unit), never floats.
//! Two independently parsed quotations of the same price are therefore
//! bit-identical and land on the same book level.

use std::fmt;

/// Price in ticks. One tick is 0.01 units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Price(pub u64);

impl Price {
    /// Ticks per whole unit (2 decimal places).
    pub const TICKS_PER_UNIT: u64 = 100;

    /// Zero price. Not a valid order price.
    pub const ZERO: Self = Self(0);

    /// Largest decimal value accepted at the wire boundary. Chosen so the
    /// scaled tick count stays inside f64's exact-integer range.
    pub const MAX_DECIMAL: f64 = 1e13;

    /// Price from a raw tick count.
    #[inline(always)]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Price from a whole number of units.
    #[inline(always)]
    pub const fn from_units(units: u64) -> Self {
        Self(units * Self::TICKS_PER_UNIT)
    }

    /// Raw tick count.
    #[inline(always)]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Check for the zero price.
    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Convert a decimal quotation to ticks, rounding to the nearest tick.
    ///
    /// Returns `None` for non-finite, non-positive, or out-of-range values,
    /// and for values that round down to zero ticks.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 || value > Self::MAX_DECIMAL {
            return None;
        }
        let ticks = (value * Self::TICKS_PER_UNIT as f64).round();
        if ticks < 1.0 {
            return None;
        }
        Some(Self(ticks as u64))
    }

    /// Decimal view, for diagnostics only. Book keys never touch floats.
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / Self::TICKS_PER_UNIT as f64
    }

    /// Saturating subtraction, for spreads.
    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Price {
    /// Render with exactly two decimal places, e.g. `100.50`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02}",
            self.0 / Self::TICKS_PER_UNIT,
            self.0 % Self::TICKS_PER_UNIT
        )
    }
}

/// Quantity in whole lots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Quantity(pub u32);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Check for zero.
    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Raw lot count.
    #[inline(always)]
    pub const fn lots(self) -> u32 {
        self.0
    }

    /// Smaller of two quantities.
    #[inline(always)]
    pub const fn min(self, other: Self) -> Self {
        if self.0 < other.0 {
            self
        } else {
            other
        }
    }

    /// Saturating subtraction.
    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
