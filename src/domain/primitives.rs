//! Domain primitives: UserId, FundCode, TxType, TxStatus.

use serde::{Deserialize, Serialize};

/// Owner of positions and transactions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable fund identifier (e.g., "110022").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FundCode(pub String);

impl FundCode {
    pub fn new(code: impl Into<String>) -> Self {
        FundCode(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FundCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction type.
///
/// `ConvertOut`/`ConvertIn` are the two legs of a fund conversion: the out
/// leg is settled like a sell and its proceeds become the in leg's order
/// amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Buy,
    Sell,
    ConvertOut,
    ConvertIn,
}

impl TxType {
    /// Sell-like types, settled in phase 1 of a settlement run.
    pub fn is_redemption(&self) -> bool {
        matches!(self, TxType::Sell | TxType::ConvertOut)
    }

    /// Buy-like types, settled in phase 2 of a settlement run.
    pub fn is_subscription(&self) -> bool {
        matches!(self, TxType::Buy | TxType::ConvertIn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Buy => "buy",
            TxType::Sell => "sell",
            TxType::ConvertOut => "convert_out",
            TxType::ConvertIn => "convert_in",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(TxType::Buy),
            "sell" => Some(TxType::Sell),
            "convert_out" => Some(TxType::ConvertOut),
            "convert_in" => Some(TxType::ConvertIn),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction status. Transitions once, pending -> confirmed | failed,
/// and is immutable afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Confirmed => "confirmed",
            TxStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TxStatus::Pending),
            "confirmed" => Some(TxStatus::Confirmed),
            "failed" => Some(TxStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_type_phases() {
        assert!(TxType::Sell.is_redemption());
        assert!(TxType::ConvertOut.is_redemption());
        assert!(TxType::Buy.is_subscription());
        assert!(TxType::ConvertIn.is_subscription());
        assert!(!TxType::Buy.is_redemption());
        assert!(!TxType::ConvertOut.is_subscription());
    }

    #[test]
    fn test_tx_type_db_roundtrip() {
        for t in [TxType::Buy, TxType::Sell, TxType::ConvertOut, TxType::ConvertIn] {
            assert_eq!(TxType::parse(t.as_str()), Some(t));
        }
        assert_eq!(TxType::parse("dividend"), None);
    }

    #[test]
    fn test_tx_status_db_roundtrip() {
        for s in [TxStatus::Pending, TxStatus::Confirmed, TxStatus::Failed] {
            assert_eq!(TxStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(TxStatus::parse("done"), None);
    }

    #[test]
    fn test_tx_type_serialization() {
        let json = serde_json::to_string(&TxType::ConvertOut).unwrap();
        assert_eq!(json, "\"convert_out\"");
    }

    #[test]
    fn test_fund_code_display() {
        let code = FundCode::new("110022");
        assert_eq!(code.to_string(), "110022");
    }
}
