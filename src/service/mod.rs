//! Bidding strategy service integrations.
//!
//! Defines the `BiddingStrategyService` trait and provides:
//! - Google Ads REST API client (fetch via GAQL search, submit via mutate)
//! - Dry-run wrapper that fetches for real but only logs updates

pub mod dry_run;
pub mod google_ads;

use async_trait::async_trait;

use crate::types::{BidResult, PortfolioStrategy, StrategyStatus, StrategyType};

/// Abstraction over the remote bidding strategy service.
///
/// The engine only ever reads strategies and writes a single strategy back.
/// Implementors report every remote failure as `BidError::Service`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BiddingStrategyService: Send + Sync {
    /// Fetch the strategies matching every predicate of the selector.
    async fn fetch(&self, selector: &StrategySelector) -> BidResult<Vec<PortfolioStrategy>>;

    /// Submit an updated strategy record.
    async fn submit(&self, update: &PortfolioStrategy) -> BidResult<()>;

    /// Service name for logging and error reporting.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// A single filter condition on strategy records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Status(StrategyStatus),
    Type(StrategyType),
}

impl Predicate {
    /// Evaluate the predicate against a record already in memory.
    pub fn matches(&self, strategy: &PortfolioStrategy) -> bool {
        match self {
            Predicate::Status(status) => strategy.status == *status,
            Predicate::Type(t) => strategy.strategy_type == *t,
        }
    }

    /// Render as a GAQL condition.
    pub fn to_gaql(&self) -> String {
        match self {
            Predicate::Status(status) => {
                format!("bidding_strategy.status = '{}'", status.as_api_str())
            }
            Predicate::Type(t) => format!("bidding_strategy.type = '{}'", t.as_api_str()),
        }
    }
}

/// Conjunction of predicates. An empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategySelector {
    pub predicates: Vec<Predicate>,
}

impl StrategySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector for enabled strategies only.
    pub fn enabled() -> Self {
        Self::new().with(Predicate::Status(StrategyStatus::Enabled))
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn matches(&self, strategy: &PortfolioStrategy) -> bool {
        self.predicates.iter().all(|p| p.matches(strategy))
    }

    /// GAQL `WHERE` clause, or `None` when there is nothing to filter on.
    pub fn where_clause(&self) -> Option<String> {
        if self.predicates.is_empty() {
            return None;
        }
        let conditions: Vec<String> = self.predicates.iter().map(Predicate::to_gaql).collect();
        Some(format!("WHERE {}", conditions.join(" AND ")))
    }
}
