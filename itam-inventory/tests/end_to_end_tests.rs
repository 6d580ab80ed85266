//! Full count lifecycle, draft through close.

mod helpers;

use helpers::{asset, manual, ocr, TestWorld, ACTOR};
use itam_common::models::{MatchStatus, PlanStatus};
use itam_common::Error;

#[tokio::test]
async fn full_count_from_draft_to_close() {
    let world = TestWorld::new();
    world.registry.put(asset(1, "040400275", 10));

    // Create (scope = all) and start
    let plan = world.draft_plan("annual count").await;
    assert_eq!(plan.status, PlanStatus::Draft);
    let plan = world.plans.start(plan.id).await.unwrap();
    assert_eq!(plan.status, PlanStatus::InProgress);

    // Scan a tag unknown to the register
    let ghost = world
        .scans
        .scan_manual(plan.id, manual("X1"), ACTOR)
        .await
        .unwrap();
    assert_eq!(ghost.record.status, MatchStatus::Unmatched);

    // Scan the real asset via OCR
    let real = world
        .scans
        .scan_ocr(plan.id, ocr("資編：040400275\n名稱：asset-040400275"), ACTOR)
        .await
        .unwrap();
    assert_eq!(real.record.status, MatchStatus::Matched);

    // Complete, then close
    let plan = world.plans.complete(plan.id).await.unwrap();
    assert_eq!(plan.status, PlanStatus::Completed);
    let plan = world.plans.close(plan.id).await.unwrap();
    assert_eq!(plan.status, PlanStatus::Closed);

    // Closed plans accept no further scans
    let result = world.scans.scan_manual(plan.id, manual("X2"), ACTOR).await;
    assert!(matches!(result, Err(Error::InvalidState(_))));

    // The report lists X1 as over-count and nothing as under-count
    let report = world.reporter.discrepancy_report(plan.id).await.unwrap();
    assert_eq!(report.unmatched_count(), 1);
    assert_eq!(report.unmatched[0].asset_tag, "X1");
    assert_eq!(report.not_scanned_count(), 0);
    assert!(report.discrepancies.is_empty());

    let progress = world.reporter.progress(plan.id).await.unwrap();
    assert_eq!(progress.total_assets, 1);
    assert_eq!(progress.percentage, 100);
}
