//! Plan state-machine tests
//!
//! The lifecycle only moves forward: draft → in_progress → completed →
//! closed. Every (state, operation) combination is exercised below; an
//! operation either succeeds from its documented source state or fails with
//! InvalidState.

mod helpers;

use std::collections::BTreeSet;

use helpers::{manual, new_plan, TestWorld, ACTOR};
use itam_common::models::{PlanStatus, ScopeType};
use itam_common::Error;
use itam_inventory::store::{Page, PlanFilter};
use itam_inventory::PlanChanges;

async fn plan_in_state(world: &TestWorld, status: PlanStatus) -> i64 {
    let plan = world.draft_plan("state fixture").await;
    if status == PlanStatus::Draft {
        return plan.id;
    }
    world.plans.start(plan.id).await.unwrap();
    if status == PlanStatus::InProgress {
        return plan.id;
    }
    world.plans.complete(plan.id).await.unwrap();
    if status == PlanStatus::Completed {
        return plan.id;
    }
    world.plans.close(plan.id).await.unwrap();
    plan.id
}

#[tokio::test]
async fn every_state_operation_combination_is_enforced() {
    let states = [
        PlanStatus::Draft,
        PlanStatus::InProgress,
        PlanStatus::Completed,
        PlanStatus::Closed,
    ];
    let operations = ["start", "complete", "close", "scan", "delete"];

    for state in states {
        for op in operations {
            let world = TestWorld::new();
            let id = plan_in_state(&world, state).await;

            let result: Result<(), Error> = match op {
                "start" => world.plans.start(id).await.map(|_| ()),
                "complete" => world.plans.complete(id).await.map(|_| ()),
                "close" => world.plans.close(id).await.map(|_| ()),
                "scan" => world
                    .scans
                    .scan_manual(id, manual("T-0001"), ACTOR)
                    .await
                    .map(|_| ()),
                "delete" => world.plans.delete(id).await,
                _ => unreachable!(),
            };

            let should_succeed = matches!(
                (state, op),
                (PlanStatus::Draft, "start")
                    | (PlanStatus::Draft, "delete")
                    | (PlanStatus::InProgress, "complete")
                    | (PlanStatus::InProgress, "scan")
                    | (PlanStatus::Completed, "close")
            );

            if should_succeed {
                assert!(
                    result.is_ok(),
                    "{:?} + {} should succeed, got {:?}",
                    state,
                    op,
                    result.err()
                );
            } else {
                assert!(
                    matches!(result, Err(Error::InvalidState(_))),
                    "{:?} + {} should be InvalidState, got {:?}",
                    state,
                    op,
                    result
                );
            }
        }
    }
}

#[tokio::test]
async fn start_names_the_required_state() {
    let world = TestWorld::new();
    let id = plan_in_state(&world, PlanStatus::Completed).await;

    let err = world.plans.start(id).await.unwrap_err();
    match err {
        Error::InvalidState(msg) => assert!(msg.contains("draft"), "message was: {}", msg),
        other => panic!("expected InvalidState, got {:?}", other),
    }
}

#[tokio::test]
async fn operations_on_missing_plan_are_not_found() {
    let world = TestWorld::new();

    assert!(matches!(world.plans.start(999).await, Err(Error::NotFound(_))));
    assert!(matches!(world.plans.delete(999).await, Err(Error::NotFound(_))));
    assert!(matches!(world.plans.get(999).await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn create_rejects_scoped_plan_without_ids() {
    let world = TestWorld::new();

    let result = world
        .plans
        .create(new_plan("dept count", ScopeType::Department, []), ACTOR)
        .await;

    let Err(Error::Validation(fields)) = result else {
        panic!("expected validation error, got {:?}", result.map(|p| p.id));
    };
    assert_eq!(fields[0].field, "scope_ids");
}

#[tokio::test]
async fn create_starts_in_draft() {
    let world = TestWorld::new();
    let plan = world.draft_plan("Q1 count").await;

    assert_eq!(plan.status, PlanStatus::Draft);
    assert_eq!(plan.created_by, ACTOR);
}

#[tokio::test]
async fn edit_is_legal_while_draft_and_in_progress() {
    let world = TestWorld::new();
    let plan = world.draft_plan("before").await;

    let edited = world
        .plans
        .edit(
            plan.id,
            PlanChanges {
                name: Some("after".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.name, "after");

    world.plans.start(plan.id).await.unwrap();
    let edited = world
        .plans
        .edit(
            plan.id,
            PlanChanges {
                description: Some(Some("mid-count note".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.description.as_deref(), Some("mid-count note"));
}

#[tokio::test]
async fn edit_fails_once_completed_or_closed() {
    let world = TestWorld::new();
    let id = plan_in_state(&world, PlanStatus::Completed).await;

    let result = world
        .plans
        .edit(
            id,
            PlanChanges {
                name: Some("too late".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(Error::InvalidState(_))));

    world.plans.close(id).await.unwrap();
    let result = world
        .plans
        .edit(
            id,
            PlanChanges {
                name: Some("way too late".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn edit_cannot_clear_scope_ids_on_scoped_plan() {
    let world = TestWorld::new();
    let plan = world
        .plans
        .create(new_plan("dept count", ScopeType::Department, [10]), ACTOR)
        .await
        .unwrap();

    let result = world
        .plans
        .edit(
            plan.id,
            PlanChanges {
                scope: Some((ScopeType::Department, BTreeSet::new())),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn deleted_plan_is_gone() {
    let world = TestWorld::new();
    let plan = world.draft_plan("short-lived").await;

    world.plans.delete(plan.id).await.unwrap();

    assert!(matches!(
        world.plans.get(plan.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn list_filters_by_status_and_search() {
    let world = TestWorld::new();
    let q1 = world.draft_plan("Q1 office count").await;
    let q2 = world.draft_plan("Q2 warehouse count").await;
    world.plans.start(q2.id).await.unwrap();

    let (drafts, total) = world
        .plans
        .list(
            &PlanFilter {
                status: Some(PlanStatus::Draft),
                search: None,
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(drafts[0].plan.id, q1.id);

    let (hits, total) = world
        .plans
        .list(
            &PlanFilter {
                status: None,
                search: Some("warehouse".into()),
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(hits[0].plan.id, q2.id);
}
