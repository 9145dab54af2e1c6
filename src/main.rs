//! bid-adjuster: portfolio bidding strategy adjustments
//!
//! Entry point. Loads configuration, initialises structured logging,
//! fetches the account's enabled portfolio strategies and applies the
//! configured policy to them.

use anyhow::{bail, Result};
use tracing::{info, warn};

use bid_adjuster::config::{self, AppConfig, PolicyConfig};
use bid_adjuster::engine::{self, CeilingAction, DecayPolicy};
use bid_adjuster::service::dry_run::DryRunService;
use bid_adjuster::service::google_ads::GoogleAdsClient;
use bid_adjuster::service::BiddingStrategyService;
use bid_adjuster::types::{Direction, PortfolioStrategy};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&path)?;

    init_logging();

    info!(
        config = %path,
        customer_id = %cfg.account.customer_id,
        dry_run = cfg.run.dry_run,
        policy = ?cfg.policy,
        "bid-adjuster starting"
    );

    let client = GoogleAdsClient::from_config(&cfg)?;
    if cfg.run.dry_run {
        let service = DryRunService::new(client);
        run(&service, &cfg).await?;
        info!(intercepted = service.intercepted(), "[DRY RUN] Finished, nothing submitted");
        Ok(())
    } else {
        run(&client, &cfg).await
    }
}

/// Fetch, narrow, and apply the configured policy.
async fn run(service: &dyn BiddingStrategyService, cfg: &AppConfig) -> Result<()> {
    let fetched = engine::fetch_enabled_strategies(service).await?;
    let mut strategies = cfg.run.select(fetched);
    info!(selected = strategies.len(), "Strategies selected");

    match &cfg.policy {
        PolicyConfig::DecayTargetCpa(policy) => run_decay(service, &mut strategies, policy).await,
        PolicyConfig::ClearBidCeiling => {
            run_ceiling(service, &mut strategies, &CeilingAction::Clear).await
        }
        PolicyConfig::SetBidCeiling { limit } => {
            run_ceiling(service, &mut strategies, &CeilingAction::Set(*limit)).await
        }
        PolicyConfig::AdjustBidCeiling { direction, percent } => {
            let direction = Direction::from(direction.as_str());
            if let Direction::Other(raw) = &direction {
                warn!(direction = %raw, "Direction is neither 'increase' nor 'decrease'; nothing will change");
            }
            run_ceiling(service, &mut strategies, &CeilingAction::Adjust(direction, *percent)).await
        }
    }
}

async fn run_decay(
    service: &dyn BiddingStrategyService,
    strategies: &mut [PortfolioStrategy],
    policy: &DecayPolicy,
) -> Result<()> {
    let changes = engine::decay_target_cpa(service, strategies, policy).await?;
    for change in &changes {
        println!("{change}");
    }
    info!(changed = changes.len(), "Target CPA decay complete");
    Ok(())
}

/// Apply a ceiling action to every strategy it applies to; fail if the service rejected any.
async fn run_ceiling(
    service: &dyn BiddingStrategyService,
    strategies: &mut [PortfolioStrategy],
    action: &CeilingAction,
) -> Result<()> {
    let report = engine::run_ceiling_action(service, strategies, action).await;
    if !report.failed.is_empty() {
        bail!(
            "{} of {} strategy updates failed: {:?}",
            report.failed.len(),
            report.attempted(),
            report.failed
        );
    }
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bid_adjuster=info"));

    let json_logging = std::env::var("BID_ADJUSTER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
