use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::EngineError;

/// ISO-4217-like currency code attached to a wallet.
///
/// The ledger stores the code but never converts between currencies: amounts
/// are always interpreted in the currency of the wallet they touch, and
/// cross-wallet aggregates are grouped by code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency([u8; 3]);

impl Currency {
    pub const EUR: Currency = Currency(*b"EUR");
    pub const USD: Currency = Currency(*b"USD");
    pub const VND: Currency = Currency(*b"VND");

    /// Canonical (uppercase) currency code.
    #[must_use]
    pub fn code(&self) -> &str {
        // Only ASCII uppercase letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::EUR
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let code = value.trim().to_ascii_uppercase();
        match code.as_bytes() {
            [a, b, c] if code.bytes().all(|byte| byte.is_ascii_uppercase()) => {
                Ok(Currency([*a, *b, *c]))
            }
            _ => Err(EngineError::Validation(format!(
                "unsupported currency: {value}"
            ))),
        }
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Currency::try_from(raw.as_str()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_codes() {
        assert_eq!(Currency::try_from("vnd").unwrap(), Currency::VND);
        assert_eq!(Currency::try_from(" usd ").unwrap().code(), "USD");
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(Currency::try_from("EURO").is_err());
        assert!(Currency::try_from("E1R").is_err());
        assert!(Currency::try_from("").is_err());
    }
}
