//! Money in integer minor units plus the currencies the app can display.
//!
//! Amounts are kept as `i64` counts of the smallest currency unit (cents for
//! USD, yen for JPY). Splits and balances therefore add up exactly and the
//! "within one minor unit" tolerance collapses to plain equality.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Signed amount in minor currency units.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(units: i64) -> Self {
        Self(units)
    }

    pub const fn minor_units(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Sum of `amounts`, or `None` if it does not fit in an `i64`.
    ///
    /// Use this on caller-supplied amounts; the `+` operator and [`Sum`] panic
    /// on overflow in debug builds and wrap in release builds.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Self> {
        amounts.into_iter().try_fold(Money::ZERO, Money::checked_add)
    }

    /// Parse a decimal string such as `"12.5"` or `"-3.07"` in `currency`.
    ///
    /// More fractional digits than the currency carries is an error rather than
    /// a silent rounding.
    pub fn parse(input: &str, currency: Currency) -> DomainResult<Self> {
        let raw = input.trim();
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix('+').unwrap_or(raw)),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        let exponent = currency.minor_unit_digits() as usize;
        let valid_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !valid_digits(whole)
            || !valid_digits(fraction)
        {
            return Err(DomainError::invalid_input(format!("not an amount: {input:?}")));
        }
        if fraction.len() > exponent {
            return Err(DomainError::invalid_input(format!(
                "{} allows at most {exponent} decimal places: {input:?}",
                currency.code()
            )));
        }

        let scale = 10i64.pow(exponent as u32);
        let whole_units: i64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| DomainError::invalid_input(format!("amount out of range: {input:?}")))?
        };
        let fraction_units: i64 = if fraction.is_empty() {
            0
        } else {
            let padded = format!("{fraction:0<exponent$}");
            padded
                .parse()
                .map_err(|_| DomainError::invalid_input(format!("not an amount: {input:?}")))?
        };

        let units = whole_units
            .checked_mul(scale)
            .and_then(|w| w.checked_add(fraction_units))
            .ok_or_else(|| DomainError::invalid_input(format!("amount out of range: {input:?}")))?;

        Ok(Self(if negative { -units } else { units }))
    }

    /// Plain decimal rendering without a symbol, e.g. `"-12.05"`.
    pub fn to_decimal_string(self, currency: Currency) -> String {
        let exponent = currency.minor_unit_digits() as usize;
        let sign = if self.0 < 0 { "-" } else { "" };
        let units = self.0.unsigned_abs();
        if exponent == 0 {
            return format!("{sign}{units}");
        }
        let scale = 10u64.pow(exponent as u32);
        format!(
            "{sign}{}.{:0width$}",
            units / scale,
            units % scale,
            width = exponent
        )
    }

    /// Display rendering with the currency symbol, e.g. `"-$12.05"`.
    pub fn format(self, currency: Currency) -> String {
        let plain = self.abs().to_decimal_string(currency);
        if self.is_negative() {
            format!("-{}{plain}", currency.symbol())
        } else {
            format!("{}{plain}", currency.symbol())
        }
    }
}

impl ValueObject for Money {}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Display currency of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    INR,
    JPY,
    CAD,
    AUD,
    CHF,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::INR => "INR",
            Currency::JPY => "JPY",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::CHF => "CHF",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD | Currency::CAD | Currency::AUD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::INR => "₹",
            Currency::JPY => "¥",
            Currency::CHF => "CHF ",
        }
    }

    /// Number of decimal digits in one major unit.
    pub fn minor_unit_digits(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }
}

impl ValueObject for Currency {}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "INR" => Ok(Currency::INR),
            "JPY" => Ok(Currency::JPY),
            "CAD" => Ok(Currency::CAD),
            "AUD" => Ok(Currency::AUD),
            "CHF" => Ok(Currency::CHF),
            other => Err(DomainError::invalid_input(format!("unsupported currency: {other}"))),
        }
    }
}
