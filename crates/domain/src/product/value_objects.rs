//! Value objects for the product domain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ProductError;

/// ISO-4217 codes accepted for product prices.
const KNOWN_CURRENCIES: &[&str] = &[
    "AED", "ARS", "AUD", "BGN", "BRL", "CAD", "CHF", "CLP", "CNY", "COP", "CZK", "DKK", "EGP",
    "EUR", "GBP", "HKD", "HUF", "IDR", "ILS", "INR", "ISK", "JPY", "KRW", "MXN", "MYR", "NOK",
    "NZD", "PEN", "PHP", "PKR", "PLN", "RON", "RUB", "SAR", "SEK", "SGD", "THB", "TRY", "TWD",
    "UAH", "USD", "VND", "ZAR",
];

/// An upper-case ISO-4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses a currency code, accepting lower-case input.
    pub fn new(code: &str) -> Result<Self, ProductError> {
        let code = code.trim().to_ascii_uppercase();
        if KNOWN_CURRENCIES.binary_search(&code.as_str()).is_ok() {
            Ok(Self(code))
        } else {
            Err(ProductError::UnknownCurrency { code })
        }
    }

    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = ProductError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A price in minor units (e.g. cents) of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units (e.g., 1999 = 19.99 USD).
    amount: i64,
    currency: Currency,
}

impl Money {
    /// Creates a money value, rejecting negative amounts.
    pub fn new(amount: i64, currency: Currency) -> Result<Self, ProductError> {
        if amount < 0 {
            return Err(ProductError::InvalidPrice { amount });
        }
        Ok(Self { amount, currency })
    }

    /// Parses both parts of a price, e.g. from a request body.
    pub fn parse(amount: i64, currency: &str) -> Result<Self, ProductError> {
        Self::new(amount, Currency::new(currency)?)
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Returns true if moving from `self` to `new` stays within `max_percent`
    /// of the current amount.
    ///
    /// A zero current amount has no relative bound, so any change is allowed.
    pub fn within_change_limit(&self, new: &Money, max_percent: u64) -> bool {
        if self.amount == 0 {
            return true;
        }
        let delta = new.amount.abs_diff(self.amount) as u128;
        delta * 100 <= self.amount as u128 * max_percent as u128
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{:02} {}",
            self.amount / 100,
            self.amount % 100,
            self.currency
        )
    }
}

/// Stock keeping unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Maximum SKU length.
    pub const MAX_LENGTH: usize = 50;

    /// Validates a caller-supplied SKU.
    pub fn new(value: impl Into<String>) -> Result<Self, ProductError> {
        let value = value.into().trim().to_string();
        let valid_chars = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if value.is_empty() || value.len() > Self::MAX_LENGTH || !valid_chars {
            return Err(ProductError::InvalidSku { sku: value });
        }
        Ok(Self(value))
    }

    /// Generates a fresh SKU of the form `SKU-XXXXXXXX`.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("SKU-{}", hex[..8].to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
