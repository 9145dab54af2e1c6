//! Dry-run service wrapper.
//!
//! Reads go to the wrapped service; updates are logged and dropped.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

use super::{BiddingStrategyService, StrategySelector};
use crate::types::{BidResult, PortfolioStrategy};

pub struct DryRunService<S> {
    inner: S,
    intercepted: AtomicUsize,
}

impl<S: BiddingStrategyService> DryRunService<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            intercepted: AtomicUsize::new(0),
        }
    }

    /// Number of updates that were logged instead of submitted.
    pub fn intercepted(&self) -> usize {
        self.intercepted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<S: BiddingStrategyService> BiddingStrategyService for DryRunService<S> {
    async fn fetch(&self, selector: &StrategySelector) -> BidResult<Vec<PortfolioStrategy>> {
        self.inner.fetch(selector).await
    }

    async fn submit(&self, update: &PortfolioStrategy) -> BidResult<()> {
        self.intercepted.fetch_add(1, Ordering::Relaxed);
        info!(
            service = self.inner.name(),
            strategy_id = update.id,
            name = %update.name,
            bid_ceiling = ?update.bid_ceiling(),
            target_cpa = ?update.target_cpa(),
            "[DRY RUN] Would submit strategy update"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
