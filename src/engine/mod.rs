//! Bid adjustment engine.
//!
//! Every operation takes the service handle explicitly and performs at most
//! one remote update per strategy. Records are mutated in place before being
//! submitted, so the caller sees the values that were sent.

pub mod ceiling;
pub mod decay;

use tracing::info;

use crate::service::{BiddingStrategyService, StrategySelector};
use crate::types::{BidResult, PortfolioStrategy};

pub use ceiling::{
    adjust_bid_ceiling, apply_ceiling_action, clear_bid_ceiling, run_ceiling_action,
    set_bid_ceiling, CeilingAction, CeilingRunReport,
};
pub use decay::{decay_target_cpa, DecayPolicy, TargetChange};

/// Fetch every enabled portfolio strategy, in the order the service returns them.
pub async fn fetch_enabled_strategies(
    service: &dyn BiddingStrategyService,
) -> BidResult<Vec<PortfolioStrategy>> {
    let strategies = service.fetch(&StrategySelector::enabled()).await?;
    info!(count = strategies.len(), "Enabled portfolio strategies fetched");
    Ok(strategies)
}
