//! Projection pipeline: bus consumption, version gating, idempotent
//! duplicates, and self-healing rebuilds.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use common::{create_command, runtime, wait_for_projection_version};
use eventbank::command::{
    CreateBankAccountHandler, DepositBalanceCommand, DepositBalanceHandler,
    WithdrawBalanceCommand, WithdrawBalanceHandler,
};
use eventbank::domain::BankAccountAggregate;
use eventbank::es::{EventBus, EventStore};
use eventbank::projection::{BankAccountProjection, ProjectionWorkerPool};
use eventbank::repository::AccountRepository;

struct RunningPipeline {
    rt: common::TestRuntime,
    shutdown: watch::Sender<bool>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

/// Start the worker pool before any command runs, as the binary does.
fn start_pipeline() -> RunningPipeline {
    let rt = runtime();
    let projection = Arc::new(BankAccountProjection::new(
        rt.repository.clone(),
        rt.store.clone(),
    ));
    let (shutdown, shutdown_rx) = watch::channel(false);
    let workers = ProjectionWorkerPool::new(rt.bus.clone(), projection).start(shutdown_rx);
    RunningPipeline {
        rt,
        shutdown,
        workers,
    }
}

impl RunningPipeline {
    async fn stop(self) {
        let _ = self.shutdown.send(true);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

/// Create 1000, deposit 500, withdraw 200: version 3, balance 1300.
async fn seed_account(rt: &common::TestRuntime, aggregate_id: Uuid) {
    CreateBankAccountHandler::new(rt.store.clone())
        .handle(create_command(aggregate_id, 1000))
        .await
        .unwrap();
    DepositBalanceHandler::new(rt.store.clone())
        .handle(DepositBalanceCommand {
            aggregate_id,
            amount: 500,
            payment_id: "p1".into(),
        })
        .await
        .unwrap();
    WithdrawBalanceHandler::new(rt.store.clone())
        .handle(WithdrawBalanceCommand {
            aggregate_id,
            amount: 200,
            payment_id: "p2".into(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_worker_pool_projects_command_stream() {
    let pipeline = start_pipeline();
    let aggregate_id = Uuid::new_v4();
    seed_account(&pipeline.rt, aggregate_id).await;

    wait_for_projection_version(&pipeline.rt.repository, aggregate_id, 3).await;

    let document = pipeline
        .rt
        .repository
        .get_by_aggregate_id(aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.version, 3);
    assert_eq!(document.balance.amount, 1300);
    assert_eq!(document.first_name, "Alice");

    pipeline.stop().await;
}

#[tokio::test]
async fn test_duplicate_deliveries_are_idempotent() {
    let pipeline = start_pipeline();
    let aggregate_id = Uuid::new_v4();
    seed_account(&pipeline.rt, aggregate_id).await;
    wait_for_projection_version(&pipeline.rt.repository, aggregate_id, 3).await;

    // Redeliver the full history, one batch per event, as an at-least-once
    // bus is allowed to do.
    let events = pipeline.rt.event_store.load_events(aggregate_id).await.unwrap();
    for event in &events {
        pipeline
            .rt
            .bus
            .publish(std::slice::from_ref(event))
            .await
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let document = pipeline
        .rt
        .repository
        .get_by_aggregate_id(aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.version, 3);
    assert_eq!(document.balance.amount, 1300);

    pipeline.stop().await;
}

#[tokio::test]
async fn test_version_gap_triggers_rebuild() {
    let pipeline = start_pipeline();
    let aggregate_id = Uuid::new_v4();
    seed_account(&pipeline.rt, aggregate_id).await;
    wait_for_projection_version(&pipeline.rt.repository, aggregate_id, 3).await;

    // Simulate a missed message: wind the stored version back two steps.
    let mut stale = pipeline
        .rt
        .repository
        .get_by_aggregate_id(aggregate_id)
        .await
        .unwrap()
        .unwrap();
    stale.version -= 2;
    stale.balance.amount = 99; // also corrupt the balance
    pipeline.rt.repository.upsert(&stale).await.unwrap();

    // The next event hits the gate (expects stored version 3, finds 1) and
    // forces a rebuild from the event store.
    DepositBalanceHandler::new(pipeline.rt.store.clone())
        .handle(DepositBalanceCommand {
            aggregate_id,
            amount: 100,
            payment_id: "p4".into(),
        })
        .await
        .unwrap();

    wait_for_projection_version(&pipeline.rt.repository, aggregate_id, 4).await;

    let document = pipeline
        .rt
        .repository
        .get_by_aggregate_id(aggregate_id)
        .await
        .unwrap()
        .unwrap();

    let mut aggregate = BankAccountAggregate::new(aggregate_id);
    pipeline.rt.store.load(&mut aggregate).await.unwrap();
    assert_eq!(document.version, aggregate.version());
    assert_eq!(document.balance.amount, aggregate.state().balance.amount);
    assert_eq!(document.balance.amount, 1400);

    pipeline.stop().await;
}

#[tokio::test]
async fn test_rebuild_directly_restores_authoritative_state() {
    let rt = runtime();
    let projection = BankAccountProjection::new(rt.repository.clone(), rt.store.clone());
    let aggregate_id = Uuid::new_v4();
    seed_account(&rt, aggregate_id).await;

    // No worker running; the row does not exist yet.
    projection.rebuild(aggregate_id).await.unwrap();

    let document = rt
        .repository
        .get_by_aggregate_id(aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(document.version, 3);
    assert_eq!(document.balance.amount, 1300);
}
