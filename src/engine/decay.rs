//! Scheduled target-CPA decay.
//!
//! Lowers each target-CPA strategy's target by a fixed fraction per run,
//! never below a floor. Strategies at or below the threshold are left alone.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info};

use crate::service::BiddingStrategyService;
use crate::types::{BidError, BidResult, Micros, PortfolioStrategy, StrategyType};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Decay parameters. All amounts are in currency units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecayPolicy {
    /// Fraction removed from the target per run (0.1 = 10%).
    pub decrease: Decimal,
    /// Lowest target the decay may produce.
    pub floor: Decimal,
    /// Only targets strictly above this are decayed. Independent of `floor`.
    pub threshold: Decimal,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            decrease: dec!(0.10),
            floor: dec!(18),
            threshold: dec!(18),
        }
    }
}

impl DecayPolicy {
    /// The decayed target for `target`, or `None` when it is not above the threshold.
    pub fn next_target(&self, target: Decimal) -> Option<Decimal> {
        if target <= self.threshold {
            return None;
        }
        let decayed = target - target * self.decrease;
        Some(decayed.max(self.floor))
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One target change, in currency units.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetChange {
    pub strategy_id: i64,
    pub name: String,
    pub old_target: Decimal,
    pub new_target: Decimal,
}

impl fmt::Display for TargetChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} target changed from {} to {}",
            self.name,
            self.old_target.normalize(),
            self.new_target.normalize()
        )
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Decay the target CPA of every eligible strategy, submitting each change.
///
/// Strategies without a scheme or of another type are skipped. Returns the
/// changes made, in input order.
pub async fn decay_target_cpa(
    service: &dyn BiddingStrategyService,
    strategies: &mut [PortfolioStrategy],
    policy: &DecayPolicy,
) -> BidResult<Vec<TargetChange>> {
    let mut changes = Vec::new();

    for strategy in strategies.iter_mut() {
        if strategy.scheme.is_none() || strategy.strategy_type != StrategyType::TargetCpa {
            continue;
        }

        let name = strategy.name.clone();
        let scheme = strategy.scheme_mut()?;
        let current = scheme
            .target_cpa
            .ok_or(BidError::MissingTargetCpa { strategy: name })?;
        let target = current.to_units();

        let Some(new_target) = policy.next_target(target) else {
            debug!(strategy_id = strategy.id, target = %target, "Target at or below threshold, skipping");
            continue;
        };

        scheme.target_cpa = Some(Micros::from_units(new_target));
        service.submit(strategy).await?;

        let change = TargetChange {
            strategy_id: strategy.id,
            name: strategy.name.clone(),
            old_target: target,
            new_target,
        };
        info!(
            strategy_id = change.strategy_id,
            name = %change.name,
            from = %target,
            to = %new_target,
            "Target CPA decayed"
        );
        changes.push(change);
    }

    Ok(changes)
}
