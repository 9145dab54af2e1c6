//! Shared types for the bid adjuster.
//!
//! These mirror the remote bidding-strategy objects as explicit records.
//! The engine and service modules both depend on them, so they carry no
//! knowledge of either.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// Number of micro-units in one currency unit.
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// A monetary amount in integer micro-units (1 unit = 1,000,000 micros).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Micros(pub i64);

impl Micros {
    /// Quantize a currency amount to micros, truncating toward zero.
    ///
    /// Amounts outside the `i64` range saturate.
    pub fn from_units(units: Decimal) -> Self {
        let scaled = units
            .checked_mul(Decimal::from(MICROS_PER_UNIT))
            .map(|v| v.trunc());
        Self::saturating(scaled, units.is_sign_negative())
    }

    /// Quantize a raw micro value (possibly fractional), truncating toward zero.
    pub fn from_raw(raw: Decimal) -> Self {
        Self::saturating(Some(raw.trunc()), raw.is_sign_negative())
    }

    fn saturating(value: Option<Decimal>, negative: bool) -> Self {
        match value.and_then(|v| v.to_i64()) {
            Some(m) => Micros(m),
            None if negative => Micros(i64::MIN),
            None => Micros(i64::MAX),
        }
    }

    /// The amount in currency units. Exact: no precision is lost.
    pub fn to_units(self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(MICROS_PER_UNIT)
    }

    /// Raw micro value as a decimal, for arithmetic.
    pub fn as_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_units().normalize())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Remote status of a bidding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyStatus {
    Enabled,
    Removed,
    Unknown,
}

impl StrategyStatus {
    /// Wire spelling used by the remote API.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            StrategyStatus::Enabled => "ENABLED",
            StrategyStatus::Removed => "REMOVED",
            StrategyStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parse the wire spelling. Anything unexpected maps to `Unknown`.
    pub fn from_api_str(s: &str) -> Self {
        match s {
            "ENABLED" => StrategyStatus::Enabled,
            "REMOVED" => StrategyStatus::Removed,
            _ => StrategyStatus::Unknown,
        }
    }
}

impl fmt::Display for StrategyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Portfolio bidding strategy type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyType {
    TargetCpa,
    /// "Maximize clicks" in the UI.
    TargetSpend,
    TargetRoas,
    MaximizeConversions,
    TargetImpressionShare,
    /// Any scheme this tool does not adjust.
    Other(String),
}

impl StrategyType {
    pub fn as_api_str(&self) -> &str {
        match self {
            StrategyType::TargetCpa => "TARGET_CPA",
            StrategyType::TargetSpend => "TARGET_SPEND",
            StrategyType::TargetRoas => "TARGET_ROAS",
            StrategyType::MaximizeConversions => "MAXIMIZE_CONVERSIONS",
            StrategyType::TargetImpressionShare => "TARGET_IMPRESSION_SHARE",
            StrategyType::Other(tag) => tag,
        }
    }

    pub fn from_api_str(s: &str) -> Self {
        match s {
            "TARGET_CPA" => StrategyType::TargetCpa,
            "TARGET_SPEND" => StrategyType::TargetSpend,
            "TARGET_ROAS" => StrategyType::TargetRoas,
            "MAXIMIZE_CONVERSIONS" => StrategyType::MaximizeConversions,
            "TARGET_IMPRESSION_SHARE" => StrategyType::TargetImpressionShare,
            other => StrategyType::Other(other.to_string()),
        }
    }

    /// Whether the scheme for this type carries a target CPA value.
    pub fn has_target_cpa(&self) -> bool {
        matches!(self, StrategyType::TargetCpa | StrategyType::MaximizeConversions)
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// Direction of a percentage bid-ceiling adjustment.
///
/// Parsing never fails: unrecognized text is kept as `Other` and the
/// engine treats it as a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
    Other(String),
}

impl From<&str> for Direction {
    fn from(s: &str) -> Self {
        match s {
            "increase" => Direction::Increase,
            "decrease" => Direction::Decrease,
            other => Direction::Other(other.to_string()),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Direction::from(s))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Increase => write!(f, "increase"),
            Direction::Decrease => write!(f, "decrease"),
            Direction::Other(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy records
// ---------------------------------------------------------------------------

/// The monetary controls attached to a bidding strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiddingScheme {
    /// Maximum CPC bid the strategy may set.
    pub bid_ceiling: Option<Micros>,
    /// Target cost per acquisition.
    pub target_cpa: Option<Micros>,
}

impl BiddingScheme {
    pub fn with_ceiling(ceiling: Micros) -> Self {
        Self {
            bid_ceiling: Some(ceiling),
            target_cpa: None,
        }
    }

    pub fn with_target_cpa(target: Micros) -> Self {
        Self {
            bid_ceiling: None,
            target_cpa: Some(target),
        }
    }
}

/// A portfolio bidding strategy as fetched from the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioStrategy {
    pub id: i64,
    /// Remote address used when submitting updates.
    pub resource_name: String,
    pub name: String,
    pub status: StrategyStatus,
    pub strategy_type: StrategyType,
    pub scheme: Option<BiddingScheme>,
}

impl PortfolioStrategy {
    pub fn is_enabled(&self) -> bool {
        self.status == StrategyStatus::Enabled
    }

    /// Mutable access to the scheme, or the precondition error naming this strategy.
    pub fn scheme_mut(&mut self) -> Result<&mut BiddingScheme, BidError> {
        let name = &self.name;
        self.scheme
            .as_mut()
            .ok_or_else(|| BidError::MissingBiddingScheme {
                strategy: name.clone(),
            })
    }

    /// Current bid ceiling, if any.
    pub fn bid_ceiling(&self) -> Option<Micros> {
        self.scheme.as_ref().and_then(|s| s.bid_ceiling)
    }

    /// Current target CPA, if any.
    pub fn target_cpa(&self) -> Option<Micros> {
        self.scheme.as_ref().and_then(|s| s.target_cpa)
    }

    /// Helper to build a test strategy with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: i64, strategy_type: StrategyType, scheme: Option<BiddingScheme>) -> Self {
        PortfolioStrategy {
            id,
            resource_name: format!("customers/1234567890/biddingStrategies/{id}"),
            name: format!("Portfolio {id}"),
            status: StrategyStatus::Enabled,
            strategy_type,
            scheme,
        }
    }
}

impl fmt::Display for PortfolioStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({}, {})", self.id, self.name, self.strategy_type, self.status)?;
        if let Some(ceiling) = self.bid_ceiling() {
            write!(f, " ceiling {ceiling}")?;
        }
        if let Some(target) = self.target_cpa() {
            write!(f, " tCPA {target}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by the engine and the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum BidError {
    #[error("Strategy '{strategy}' has no bidding scheme")]
    MissingBiddingScheme { strategy: String },

    #[error("Strategy '{strategy}' has no bid ceiling to adjust")]
    MissingBidCeiling { strategy: String },

    #[error("Strategy '{strategy}' has no target CPA")]
    MissingTargetCpa { strategy: String },

    #[error("Service error ({service}): {message}")]
    Service { service: String, message: String },
}

impl BidError {
    pub fn service(service: &str, message: impl Into<String>) -> Self {
        BidError::Service {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Precondition failures are the caller's to fix; they never reach the service.
    pub fn is_precondition(&self) -> bool {
        !matches!(self, BidError::Service { .. })
    }
}

pub type BidResult<T> = std::result::Result<T, BidError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
