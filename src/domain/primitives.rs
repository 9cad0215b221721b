//! Domain primitives: TimeMs, Address, Coin, Side.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Time in milliseconds since Unix epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time in milliseconds since Unix epoch.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Wallet address (0x-prefixed hex string).
///
/// Parsing canonicalizes to lowercase, the form the venue expects on the
/// wire; [`Address::new`] wraps a string as-is for values the venue
/// itself produced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: String) -> Self {
        Address(addr)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rejected wallet-address input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address {input:?}: {reason}")]
pub struct AddressParseError {
    input: String,
    reason: String,
}

impl AddressParseError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        AddressParseError {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| AddressParseError::new(s, "missing 0x prefix"))?;
        if hex.len() != 40 {
            return Err(AddressParseError::new(
                s,
                format!("expected 40 hex digits, got {}", hex.len()),
            ));
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(AddressParseError::new(
                s,
                format!("non-hex character {:?}", bad),
            ));
        }
        Ok(Address(format!("0x{}", hex.to_lowercase())))
    }
}

/// Venue-native market identifier, possibly `<deployer>:<symbol>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin(pub String);

impl Coin {
    pub fn new(coin: impl Into<String>) -> Self {
        Coin(coin.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the coin carries a `<deployer>:` scope, i.e. it names a
    /// permissioned deployer market rather than a first-party one.
    pub fn is_deployer_scoped(&self) -> bool {
        self.0.contains(':')
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Coin {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("coin must not be empty");
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err("coin must not contain whitespace");
        }
        Ok(Coin(trimmed.to_string()))
    }
}

/// Trade side: Buy or Sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side (long).
    Buy,
    /// Sell side (short).
    Sell,
}

impl Side {
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Signed multiplier for this side (+1 for Buy, -1 for Sell).
    pub fn sign(&self) -> i32 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for Side {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" | "long" | "b" => Ok(Side::Buy),
            "sell" | "short" | "s" | "a" => Ok(Side::Sell),
            _ => Err("side must be buy or sell"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_sign_and_opposite() {
        assert_eq!(Side::Buy.sign(), 1);
        assert_eq!(Side::Sell.sign(), -1);
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert!(Side::Buy.is_buy());
    }

    #[test]
    fn test_side_parse() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("SHORT".parse::<Side>().unwrap(), Side::Sell);
        assert!("hold".parse::<Side>().is_err());
    }

    #[test]
    fn test_side_serialization() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"sell\"");
    }

    #[test]
    fn test_address_parse_canonicalizes_case() {
        let addr: Address = "0xABCDEF1111111111111111111111111111111111"
            .parse()
            .unwrap();
        assert_eq!(addr.as_str(), "0xabcdef1111111111111111111111111111111111");
    }

    #[test]
    fn test_address_parse_rejects_bad_input() {
        let short = "0x123".parse::<Address>().unwrap_err();
        assert!(short.to_string().contains("expected 40 hex digits"));

        let unprefixed = "1111111111111111111111111111111111111111"
            .parse::<Address>()
            .unwrap_err();
        assert!(unprefixed.to_string().contains("missing 0x prefix"));

        let nonhex = "0xzz11111111111111111111111111111111111111"
            .parse::<Address>()
            .unwrap_err();
        assert!(nonhex.to_string().contains("non-hex character"));
    }

    #[test]
    fn test_coin_rejects_empty_and_whitespace() {
        assert!("".parse::<Coin>().is_err());
        assert!("  ".parse::<Coin>().is_err());
        assert!("xyz: TSLA".parse::<Coin>().is_err());
        assert_eq!(" xyz:TSLA0 ".parse::<Coin>().unwrap().as_str(), "xyz:TSLA0");
    }

    #[test]
    fn test_coin_deployer_scope() {
        assert!(Coin::new("xyz:TSLA0").is_deployer_scoped());
        assert!(!Coin::new("ETH").is_deployer_scoped());
    }
}
