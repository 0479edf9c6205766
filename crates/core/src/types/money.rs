//! Brazilian real amounts.
//!
//! Storefront carts send prices as display strings (`"R$ 1.200,50"`) while the
//! admin panel sends plain JSON numbers. Both are normalised to a
//! [`Decimal`] here, and serialized back out as JSON numbers.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

/// Errors that can occur when parsing a money amount.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Nothing left after stripping the currency symbol and whitespace.
    #[error("amount cannot be empty")]
    Empty,
    /// The remaining text is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// A JSON number that cannot be represented (NaN, infinity).
    #[error("amount out of range")]
    OutOfRange,
}

/// Parse a BRL display string into a decimal amount.
///
/// Accepts `"R$ 1.200,50"`, `"1200,50"`, `"99,9"` and plain `"99.90"`.
/// In the Brazilian format `.` groups thousands and `,` is the decimal mark;
/// a string with no comma and a single dot followed by one or two digits is
/// read as a plain decimal.
///
/// # Errors
///
/// Returns [`MoneyError`] if the string is empty or not numeric.
pub fn parse_brl(input: &str) -> Result<Decimal, MoneyError> {
    let trimmed = input.trim().trim_start_matches("R$").trim();
    if trimmed.is_empty() {
        return Err(MoneyError::Empty);
    }

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else if is_plain_decimal(trimmed) {
        trimmed.to_owned()
    } else {
        trimmed.replace('.', "")
    };

    normalized
        .parse::<Decimal>()
        .map_err(|_| MoneyError::Invalid(input.to_owned()))
}

/// `"99.90"` / `"5.5"` style: exactly one dot with at most two digits after it.
fn is_plain_decimal(s: &str) -> bool {
    match s.split_once('.') {
        Some((_, frac)) => !frac.contains('.') && frac.len() <= 2,
        None => true,
    }
}

/// Convert an amount to integer cents, rounding half away from zero.
#[must_use]
pub fn to_cents(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Convert a JSON float into a decimal with cent precision.
///
/// # Errors
///
/// Returns [`MoneyError::OutOfRange`] for non-finite values.
pub fn from_f64(value: f64) -> Result<Decimal, MoneyError> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .ok_or(MoneyError::OutOfRange)
}

/// Wire form of an amount: a JSON number or a BRL display string.
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Number(f64),
    Text(String),
}

impl AmountRepr {
    fn into_decimal(self) -> Result<Decimal, MoneyError> {
        match self {
            Self::Number(n) => from_f64(n),
            Self::Text(s) => parse_brl(&s),
        }
    }
}

/// Serde adapter: serialize as a JSON number, accept a number or BRL string.
///
/// ```rust
/// use rust_decimal::Decimal;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Line {
///     #[serde(with = "vitrine_core::money::amount")]
///     price: Decimal,
/// }
///
/// let line: Line = serde_json::from_str(r#"{"price": "R$ 1.200,50"}"#).unwrap();
/// assert_eq!(serde_json::to_string(&line).unwrap(), r#"{"price":1200.5}"#);
/// ```
pub mod amount {
    use super::{AmountRepr, Decimal, Deserialize, Deserializer, Serializer, ToPrimitive};

    /// Serialize a decimal as a JSON number.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.to_f64().unwrap_or_default())
    }

    /// Deserialize a decimal from a JSON number or a BRL string.
    ///
    /// # Errors
    ///
    /// Fails when the value is neither a finite number nor a parseable string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        AmountRepr::deserialize(deserializer)?
            .into_decimal()
            .map_err(serde::de::Error::custom)
    }
}

/// Optional variant of [`amount`]; `null` and missing map to `None`.
pub mod amount_opt {
    use super::{AmountRepr, Decimal, Deserialize, Deserializer, Serializer, ToPrimitive};

    /// Serialize an optional decimal as a JSON number or `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_f64().unwrap_or_default()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional decimal; empty strings read as `None`.
    ///
    /// # Errors
    ///
    /// Fails when a present value cannot be parsed.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Decimal>, D::Error> {
        match Option::<AmountRepr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(AmountRepr::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(repr) => repr
                .into_decimal()
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
