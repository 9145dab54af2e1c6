//! Bid ceiling operations: clear, set, and percentage adjust.

use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::service::BiddingStrategyService;
use crate::types::{BidError, BidResult, Direction, Micros, PortfolioStrategy};

/// A bid ceiling change to apply to one strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum CeilingAction {
    Clear,
    /// New ceiling in currency units.
    Set(Decimal),
    /// Scale the current ceiling by a fraction in the given direction.
    Adjust(Direction, Decimal),
}

/// Apply a `CeilingAction` to one strategy.
pub async fn apply_ceiling_action(
    service: &dyn BiddingStrategyService,
    strategy: &mut PortfolioStrategy,
    action: &CeilingAction,
) -> BidResult<()> {
    match action {
        CeilingAction::Clear => clear_bid_ceiling(service, strategy).await,
        CeilingAction::Set(limit) => set_bid_ceiling(service, strategy, *limit).await,
        CeilingAction::Adjust(direction, percent) => {
            adjust_bid_ceiling(service, strategy, direction, *percent).await
        }
    }
}

/// Outcome of a ceiling run over many strategies, by strategy id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CeilingRunReport {
    pub applied: Vec<i64>,
    /// Strategies the action does not apply to (no scheme, or no ceiling to scale).
    pub skipped: Vec<i64>,
    /// Strategies the service rejected.
    pub failed: Vec<i64>,
}

impl CeilingRunReport {
    pub fn attempted(&self) -> usize {
        self.applied.len() + self.failed.len()
    }
}

/// Whether `action` can run against `strategy` without a precondition error.
fn ceiling_action_applies(strategy: &PortfolioStrategy, action: &CeilingAction) -> bool {
    match action {
        CeilingAction::Clear | CeilingAction::Set(_) => strategy.scheme.is_some(),
        CeilingAction::Adjust(..) => strategy.bid_ceiling().is_some(),
    }
}

/// Apply `action` to every strategy it applies to, continuing past failures.
///
/// Strategies without a scheme (and, for `Adjust`, without a ceiling) are
/// skipped. Only service errors count as failures.
pub async fn run_ceiling_action(
    service: &dyn BiddingStrategyService,
    strategies: &mut [PortfolioStrategy],
    action: &CeilingAction,
) -> CeilingRunReport {
    let mut report = CeilingRunReport::default();
    for strategy in strategies.iter_mut() {
        if !ceiling_action_applies(strategy, action) {
            info!(
                strategy_id = strategy.id,
                name = %strategy.name,
                strategy_type = %strategy.strategy_type,
                "No bid ceiling to change, skipping"
            );
            report.skipped.push(strategy.id);
            continue;
        }

        match apply_ceiling_action(service, strategy, action).await {
            Ok(()) => report.applied.push(strategy.id),
            Err(e) if e.is_precondition() => {
                warn!(strategy_id = strategy.id, name = %strategy.name, error = %e, "Skipped");
                report.skipped.push(strategy.id);
            }
            Err(e) => {
                error!(strategy_id = strategy.id, name = %strategy.name, error = %e, "Update failed");
                report.failed.push(strategy.id);
            }
        }
    }

    info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Bid ceiling run complete"
    );
    report
}

/// Remove any bid ceiling from the strategy and submit it.
pub async fn clear_bid_ceiling(
    service: &dyn BiddingStrategyService,
    strategy: &mut PortfolioStrategy,
) -> BidResult<()> {
    let previous = strategy.scheme_mut()?.bid_ceiling.take();
    service.submit(strategy).await?;

    info!(
        strategy_id = strategy.id,
        name = %strategy.name,
        previous = ?previous.map(|m| m.to_string()),
        "Bid ceiling cleared"
    );
    Ok(())
}

/// Set the bid ceiling to `limit` currency units (truncated to whole micros)
/// and submit.
pub async fn set_bid_ceiling(
    service: &dyn BiddingStrategyService,
    strategy: &mut PortfolioStrategy,
    limit: Decimal,
) -> BidResult<()> {
    let ceiling = Micros::from_units(limit);
    strategy.scheme_mut()?.bid_ceiling = Some(ceiling);
    service.submit(strategy).await?;

    info!(
        strategy_id = strategy.id,
        name = %strategy.name,
        ceiling = %ceiling,
        "Bid ceiling set"
    );
    Ok(())
}

/// Scale the current bid ceiling up or down by `percent` (0.1 = 10%) and submit.
///
/// The scheme and its ceiling must be present whatever the direction. An
/// unrecognized direction then leaves the strategy untouched and returns `Ok`.
pub async fn adjust_bid_ceiling(
    service: &dyn BiddingStrategyService,
    strategy: &mut PortfolioStrategy,
    direction: &Direction,
    percent: Decimal,
) -> BidResult<()> {
    let id = strategy.id;
    let name = strategy.name.clone();
    let scheme = strategy.scheme_mut()?;
    let current = scheme
        .bid_ceiling
        .ok_or(BidError::MissingBidCeiling { strategy: name })?;

    let delta = current.as_decimal() * percent;
    let adjusted = match direction {
        Direction::Increase => current.as_decimal() + delta,
        Direction::Decrease => current.as_decimal() - delta,
        Direction::Other(raw) => {
            debug!(strategy_id = id, direction = %raw, "Unrecognized direction, skipping");
            return Ok(());
        }
    };
    let new_ceiling = Micros::from_raw(adjusted);
    scheme.bid_ceiling = Some(new_ceiling);

    service.submit(strategy).await?;

    info!(
        strategy_id = strategy.id,
        name = %strategy.name,
        direction = %direction,
        from = %current,
        to = %new_ceiling,
        "Bid ceiling adjusted"
    );
    Ok(())
}
