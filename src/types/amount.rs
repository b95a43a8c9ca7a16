//! Decimal-string token amounts
//!
//! Amounts travel as strings end to end so no float ever touches them.
//! Parsing goes through `rust_decimal` and the normalized form is what gets
//! stored and sent to the execution service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::LedgerError;

/// A validated, positive decimal token quantity ("100", "0.25")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAmount(String);

impl TokenAmount {
    /// Parse, validate and normalize a decimal string
    ///
    /// Only plain `digits[.digits]` is accepted. Values that do not fit a
    /// `Decimal` exactly are rejected instead of rounded.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::BadRequest("amount is empty".into()));
        }

        let digits_only = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let well_formed = match trimmed.split_once('.') {
            Some((whole, fraction)) => digits_only(whole) && digits_only(fraction),
            None => digits_only(trimmed),
        };
        if !well_formed {
            return Err(LedgerError::BadRequest(format!(
                "amount '{}' is not a decimal string",
                raw
            )));
        }

        let value = Decimal::from_str_exact(trimmed).map_err(|e| {
            LedgerError::BadRequest(format!("amount '{}' is out of range: {}", raw, e))
        })?;

        if value.is_sign_negative() || value.is_zero() {
            return Err(LedgerError::BadRequest("amount must be positive".into()));
        }

        Ok(Self(value.normalize().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TokenAmount {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TokenAmount {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TokenAmount> for String {
    fn from(amount: TokenAmount) -> Self {
        amount.0
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
