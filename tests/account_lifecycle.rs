//! Write-path and query lifecycle over the in-memory infrastructure.

mod common;

use uuid::Uuid;

use common::{create_command, runtime};
use eventbank::command::{
    CreateBankAccountHandler, DepositBalanceCommand, DepositBalanceHandler,
    WithdrawBalanceCommand, WithdrawBalanceHandler,
};
use eventbank::domain::DomainError;
use eventbank::error::{AppError, ErrorCode};
use eventbank::es::{Event, EventStore};
use eventbank::query::{
    EventsHistoryHandler, EventsHistoryQuery, GetByEmailHandler, GetByEmailQuery, GetByIdHandler,
    GetByIdQuery,
};
use eventbank::repository::AccountRepository;

/// Create 1000 VND, deposit 500, withdraw 200.
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
async fn test_create_deposit_withdraw() {
    let rt = runtime();
    let aggregate_id = Uuid::new_v4();
    seed_account(&rt, aggregate_id).await;

    let events = rt.event_store.load_events(aggregate_id).await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>(),
        vec![
            "BANK_ACCOUNT_CREATED_V1",
            "BALANCE_DEPOSITED_V1",
            "BALANCE_WITHDRAWED_V1"
        ]
    );
    assert_eq!(events.iter().map(|e| e.version).collect::<Vec<_>>(), vec![1, 2, 3]);

    let document = GetByIdHandler::new(rt.store.clone(), rt.repository.clone())
        .handle(GetByIdQuery {
            aggregate_id,
            from_event_store: true,
        })
        .await
        .unwrap();
    assert_eq!(document.version, 3);
    assert_eq!(document.balance.amount, 1300);
    assert_eq!(document.balance.currency.as_str(), "VND");
}

#[tokio::test]
async fn test_overdraft_rejected_and_log_untouched() {
    let rt = runtime();
    let aggregate_id = Uuid::new_v4();
    seed_account(&rt, aggregate_id).await;

    let err = WithdrawBalanceHandler::new(rt.store.clone())
        .handle(WithdrawBalanceCommand {
            aggregate_id,
            amount: 10_000,
            payment_id: "p3".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InsufficientBalance { requested: 10_000, available: 1300 })
    ));
    assert_eq!(err.code(), ErrorCode::InvalidArgument);

    let events = rt.event_store.load_events(aggregate_id).await.unwrap();
    assert_eq!(events.len(), 3);

    let document = GetByIdHandler::new(rt.store.clone(), rt.repository.clone())
        .handle(GetByIdQuery {
            aggregate_id,
            from_event_store: true,
        })
        .await
        .unwrap();
    assert_eq!(document.balance.amount, 1300);
}

#[tokio::test]
async fn test_create_existing_account_fails() {
    let rt = runtime();
    let aggregate_id = Uuid::new_v4();
    let handler = CreateBankAccountHandler::new(rt.store.clone());

    handler.handle(create_command(aggregate_id, 0)).await.unwrap();
    let err = handler.handle(create_command(aggregate_id, 0)).await.unwrap_err();

    assert!(matches!(err, AppError::AlreadyExists(id) if id == aggregate_id));
    assert_eq!(err.code(), ErrorCode::AlreadyExists);
}

#[tokio::test]
async fn test_deposit_to_unknown_account_is_not_found() {
    let rt = runtime();
    let err = DepositBalanceHandler::new(rt.store.clone())
        .handle(DepositBalanceCommand {
            aggregate_id: Uuid::new_v4(),
            amount: 100,
            payment_id: "p1".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_versions_are_dense_over_long_history() {
    let rt = runtime();
    let aggregate_id = Uuid::new_v4();
    CreateBankAccountHandler::new(rt.store.clone())
        .handle(create_command(aggregate_id, 1000))
        .await
        .unwrap();

    let deposit = DepositBalanceHandler::new(rt.store.clone());
    let withdraw = WithdrawBalanceHandler::new(rt.store.clone());
    for i in 0..10 {
        deposit
            .handle(DepositBalanceCommand {
                aggregate_id,
                amount: 50,
                payment_id: format!("d{}", i),
            })
            .await
            .unwrap();
        withdraw
            .handle(WithdrawBalanceCommand {
                aggregate_id,
                amount: 20,
                payment_id: format!("w{}", i),
            })
            .await
            .unwrap();
    }

    let events = rt.event_store.load_events(aggregate_id).await.unwrap();
    let versions: Vec<i64> = events.iter().map(|e| e.version).collect();
    assert_eq!(versions, (1..=21).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_get_by_id_miss_rebuilds_and_writes_back() {
    let rt = runtime();
    let aggregate_id = Uuid::new_v4();
    seed_account(&rt, aggregate_id).await;

    // Nothing has projected into the read model yet.
    assert!(rt
        .repository
        .get_by_aggregate_id(aggregate_id)
        .await
        .unwrap()
        .is_none());

    let handler = GetByIdHandler::new(rt.store.clone(), rt.repository.clone());
    let document = handler
        .handle(GetByIdQuery {
            aggregate_id,
            from_event_store: false,
        })
        .await
        .unwrap();
    assert_eq!(document.balance.amount, 1300);

    // The miss repaired the read model.
    let stored = rt
        .repository
        .get_by_aggregate_id(aggregate_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.version, 3);
}

#[tokio::test]
async fn test_get_by_id_unknown_aggregate() {
    let rt = runtime();
    let err = GetByIdHandler::new(rt.store.clone(), rt.repository.clone())
        .handle(GetByIdQuery {
            aggregate_id: Uuid::new_v4(),
            from_event_store: false,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_get_by_email() {
    let rt = runtime();
    let aggregate_id = Uuid::new_v4();
    seed_account(&rt, aggregate_id).await;

    // Populate the read model through the on-miss path.
    GetByIdHandler::new(rt.store.clone(), rt.repository.clone())
        .handle(GetByIdQuery {
            aggregate_id,
            from_event_store: false,
        })
        .await
        .unwrap();

    let email = format!("{}@example.com", aggregate_id.simple());
    let document = GetByEmailHandler::new(rt.repository.clone())
        .handle(GetByEmailQuery { email })
        .await
        .unwrap();
    assert_eq!(document.aggregate_id, aggregate_id);

    let err = GetByEmailHandler::new(rt.repository.clone())
        .handle(GetByEmailQuery {
            email: "nobody@example.com".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_events_history_with_undecodable_payload() {
    let rt = runtime();
    let aggregate_id = Uuid::new_v4();
    seed_account(&rt, aggregate_id).await;

    // A tag from a newer writer this build does not know.
    let mut foreign = Event::new(
        aggregate_id,
        "BankAccount",
        "BANK_ACCOUNT_RENAMED_V1",
        serde_json::json!({"first_name": "Alicia"}),
        None,
    );
    foreign.version = 4;
    rt.event_store.append(&[foreign], None).await.unwrap();

    let history = EventsHistoryHandler::new(rt.store.clone())
        .handle(EventsHistoryQuery { aggregate_id })
        .await
        .unwrap();

    assert_eq!(history.total_events, 4);
    assert_eq!(history.events[1].data["amount"], 500);
    // The unknown event is served raw rather than dropped.
    assert_eq!(history.events[3].event_type, "BANK_ACCOUNT_RENAMED_V1");
    assert_eq!(history.events[3].data["first_name"], "Alicia");
}
