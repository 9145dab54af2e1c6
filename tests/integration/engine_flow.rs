//! End-to-end fetch → adjust → submit runs against `MockService`.

use rust_decimal_macros::dec;
use tokio_test::{assert_err, assert_ok};

use bid_adjuster::engine::{self, CeilingAction, DecayPolicy};
use bid_adjuster::service::dry_run::DryRunService;
use bid_adjuster::types::*;

use crate::mock_service::MockService;

#[tokio::test]
async fn test_fetch_enabled_excludes_removed() {
    let mock = MockService::new();
    let strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();
    let ids: Vec<i64> = strategies.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![101, 102, 103, 201, 301]);
    assert!(strategies.iter().all(PortfolioStrategy::is_enabled));
}

#[tokio::test]
async fn test_decay_account() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();

    let changes = engine::decay_target_cpa(&mock, &mut strategies, &DecayPolicy::default())
        .await
        .unwrap();

    let summary: Vec<String> = changes.iter().map(|c| c.to_string()).collect();
    assert_eq!(
        summary,
        vec![
            "Leads tCPA high target changed from 100 to 90",
            "Leads tCPA near floor target changed from 20 to 18",
        ]
    );

    // Only the two decayed strategies reached the service.
    let submitted: Vec<i64> = mock.submitted().iter().map(|s| s.id).collect();
    assert_eq!(submitted, vec![101, 102]);
    assert_eq!(mock.stored(101).unwrap().target_cpa(), Some(Micros(90_000_000)));
    assert_eq!(mock.stored(101).unwrap().bid_ceiling(), Some(Micros(4_000_000)));
    assert_eq!(mock.stored(102).unwrap().target_cpa(), Some(Micros(18_000_000)));
    assert_eq!(mock.stored(103).unwrap().target_cpa(), Some(Micros(15_000_000)));
    // Removed strategies are never fetched, so never touched.
    assert_eq!(mock.stored(401).unwrap().target_cpa(), Some(Micros(80_000_000)));
}

#[tokio::test]
async fn test_repeated_decay_converges_on_floor() {
    let mock = MockService::new();
    let policy = DecayPolicy::default();

    for _ in 0..30 {
        let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();
        assert_ok!(engine::decay_target_cpa(&mock, &mut strategies, &policy).await);
    }

    assert_eq!(mock.stored(101).unwrap().target_cpa(), Some(Micros(18_000_000)));
    // Once on the floor the threshold stops further submits.
    let before = mock.submitted().len();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();
    let changes = engine::decay_target_cpa(&mock, &mut strategies, &policy).await.unwrap();
    assert!(changes.is_empty());
    assert_eq!(mock.submitted().len(), before);
}

#[tokio::test]
async fn test_set_then_read_ceiling() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();
    let clicks = strategies.iter_mut().find(|s| s.id == 201).unwrap();

    engine::set_bid_ceiling(&mock, clicks, dec!(5.5)).await.unwrap();

    assert_eq!(mock.stored(201).unwrap().bid_ceiling(), Some(Micros(5_500_000)));
}

#[tokio::test]
async fn test_clear_ceiling_reaches_service_absent() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();

    for s in strategies.iter_mut().filter(|s| s.id == 101 || s.id == 102) {
        engine::clear_bid_ceiling(&mock, s).await.unwrap();
    }

    let submitted = mock.submitted();
    assert_eq!(submitted.len(), 2);
    assert!(submitted.iter().all(|s| s.bid_ceiling().is_none()));
    assert_eq!(mock.stored(101).unwrap().target_cpa(), Some(Micros(100_000_000)));
}

#[tokio::test]
async fn test_ceiling_action_over_account_reports_missing_schemes() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();
    let action = CeilingAction::Adjust(Direction::Increase, dec!(0.2));

    let mut errors = Vec::new();
    for s in strategies.iter_mut() {
        if let Err(e) = engine::apply_ceiling_action(&mock, s, &action).await {
            errors.push((s.id, e));
        }
    }

    // 101 and 201 have ceilings; 102/103 have none; 301 has no scheme.
    assert_eq!(mock.stored(101).unwrap().bid_ceiling(), Some(Micros(4_800_000)));
    assert_eq!(mock.stored(201).unwrap().bid_ceiling(), Some(Micros(3_000_000)));
    let failed: Vec<i64> = errors.iter().map(|(id, _)| *id).collect();
    assert_eq!(failed, vec![102, 103, 301]);
    assert!(errors.iter().all(|(_, e)| e.is_precondition()));
    assert!(matches!(errors[2].1, BidError::MissingBiddingScheme { .. }));
}

#[tokio::test]
async fn test_unrecognized_direction_submits_nothing() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();

    let mut errors = Vec::new();
    for s in strategies.iter_mut() {
        match engine::adjust_bid_ceiling(&mock, s, &Direction::from("double"), dec!(1)).await {
            Ok(()) => {}
            Err(e) => errors.push((s.id, e)),
        }
    }

    assert!(mock.submitted().is_empty());
    assert_eq!(mock.stored(101).unwrap().bid_ceiling(), Some(Micros(4_000_000)));
    // Strategies without a ceiling still fail their precondition.
    let failed: Vec<i64> = errors.iter().map(|(id, _)| *id).collect();
    assert_eq!(failed, vec![102, 103, 301]);
    assert!(matches!(errors[2].1, BidError::MissingBiddingScheme { .. }));
}

#[tokio::test]
async fn test_clear_run_over_account_skips_unsupported_types() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();

    let report = engine::run_ceiling_action(&mock, &mut strategies, &CeilingAction::Clear).await;

    assert!(report.failed.is_empty());
    assert_eq!(report.skipped, vec![301]);
    assert_eq!(report.applied, vec![101, 102, 103, 201]);
    assert_eq!(mock.submitted().len(), 4);
    assert!(mock.submitted().iter().all(|s| s.bid_ceiling().is_none()));
}

#[tokio::test]
async fn test_adjust_run_over_account_skips_strategies_without_ceiling() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();
    let action = CeilingAction::Adjust(Direction::Decrease, dec!(0.5));

    let report = engine::run_ceiling_action(&mock, &mut strategies, &action).await;

    assert!(report.failed.is_empty());
    assert_eq!(report.applied, vec![101, 201]);
    assert_eq!(report.skipped, vec![102, 103, 301]);
    assert_eq!(mock.stored(101).unwrap().bid_ceiling(), Some(Micros(2_000_000)));
    assert_eq!(mock.stored(201).unwrap().bid_ceiling(), Some(Micros(1_250_000)));
}

#[tokio::test]
async fn test_ceiling_run_counts_service_rejections() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();
    mock.set_error("RESOURCE_EXHAUSTED");

    let report =
        engine::run_ceiling_action(&mock, &mut strategies, &CeilingAction::Set(dec!(3))).await;

    assert_eq!(report.failed, vec![101, 102, 103, 201]);
    assert_eq!(report.skipped, vec![301]);
    assert!(report.applied.is_empty());
    assert!(mock.submitted().is_empty());
}

#[tokio::test]
async fn test_service_rejection_propagates() {
    let mock = MockService::new();
    let mut strategies = engine::fetch_enabled_strategies(&mock).await.unwrap();
    mock.set_error("INVALID_OPERAND");

    let result = engine::set_bid_ceiling(&mock, &mut strategies[0], dec!(3)).await;
    let err = assert_err!(result);
    assert!(!err.is_precondition());
    assert!(mock.submitted().is_empty());
}

#[tokio::test]
async fn test_dry_run_leaves_account_untouched() {
    let mock = MockService::new();
    let dry = DryRunService::new(mock);
    let mut strategies = engine::fetch_enabled_strategies(&dry).await.unwrap();

    let changes = engine::decay_target_cpa(&dry, &mut strategies, &DecayPolicy::default())
        .await
        .unwrap();

    assert_eq!(changes.len(), 2);
    assert_eq!(dry.intercepted(), 2);
    // Local records reflect the computed values; the service copy does not.
    assert_eq!(strategies[0].target_cpa(), Some(Micros(90_000_000)));
    let refetched = engine::fetch_enabled_strategies(&dry).await.unwrap();
    assert_eq!(refetched[0].target_cpa(), Some(Micros(100_000_000)));
}
