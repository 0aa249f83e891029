//! Monetary value objects: currency-tagged signed amounts in minor units.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// ISO-4217 currencies supported by the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    /// Number of minor-unit digits (e.g. cents for USD).
    pub fn decimal_scale(&self) -> u32 {
        match self {
            Currency::Usd | Currency::Eur | Currency::Gbp => 2,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// A signed monetary amount in the smallest unit of its currency.
///
/// Reservations (holds) are negative; credits are positive. Arithmetic that
/// combines two amounts fails on a currency mismatch rather than coercing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    currency: Currency,
    units: i64,
}

impl Amount {
    pub fn new(currency: Currency, units: i64) -> Self {
        Self { currency, units }
    }

    pub fn zero(currency: Currency) -> Self {
        Self { currency, units: 0 }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Raw value in minor units (signed).
    pub fn units(&self) -> i64 {
        self.units
    }

    fn ensure_same_currency(&self, other: &Amount) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }

    pub fn add(&self, other: &Amount) -> DomainResult<Amount> {
        self.ensure_same_currency(other)?;
        Ok(Amount::new(self.currency, self.units + other.units))
    }

    pub fn sub(&self, other: &Amount) -> DomainResult<Amount> {
        self.ensure_same_currency(other)?;
        Ok(Amount::new(self.currency, self.units - other.units))
    }

    pub fn negate(&self) -> Amount {
        Amount::new(self.currency, -self.units)
    }

    pub fn abs(&self) -> Amount {
        Amount::new(self.currency, self.units.abs())
    }

    /// The smaller of two same-currency amounts.
    pub fn min_of(left: &Amount, right: &Amount) -> DomainResult<Amount> {
        left.ensure_same_currency(right)?;
        Ok(if left.units <= right.units { *left } else { *right })
    }

    /// Scale by a percentage (e.g. 115 for a 15% pad), rounding half away
    /// from zero. Intermediate math is widened to avoid overflow.
    pub fn percent_of(&self, percent: i64) -> Amount {
        let scaled = i128::from(self.units) * i128::from(percent);
        let half = if scaled >= 0 { 50 } else { -50 };
        Amount::new(self.currency, ((scaled + half) / 100) as i64)
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0
    }

    pub fn is_negative(&self) -> bool {
        self.units < 0
    }

    pub fn is_positive(&self) -> bool {
        self.units > 0
    }

    /// Compares magnitudes; both amounts are assumed same-currency (checked
    /// combinations go through `add`/`sub`).
    pub fn is_less_than(&self, other: &Amount) -> bool {
        self.units < other.units
    }

    pub fn ensure_negative(&self) -> DomainResult<&Self> {
        if !self.is_negative() {
            return Err(DomainError::validation(format!(
                "amount must be negative, got {self}"
            )));
        }
        Ok(self)
    }

    pub fn ensure_positive(&self) -> DomainResult<&Self> {
        if !self.is_positive() {
            return Err(DomainError::validation(format!(
                "amount must be positive, got {self}"
            )));
        }
        Ok(self)
    }

    pub fn ensure_non_negative(&self) -> DomainResult<&Self> {
        if self.is_negative() {
            return Err(DomainError::validation(format!(
                "amount must not be negative, got {self}"
            )));
        }
        Ok(self)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let scale = 10i64.pow(self.currency.decimal_scale());
        let whole = self.units / scale;
        let frac = (self.units % scale).abs();
        let sign = if self.units < 0 && whole == 0 { "-" } else { "" };
        write!(
            f,
            "{sign}{whole}.{frac:0width$} {code}",
            width = self.currency.decimal_scale() as usize,
            code = self.currency.code()
        )
    }
}
