mod common;

use engine::{
    CategoryKind, CreateWalletCmd, EngineError, Money, TransactionFields, TransactionKind,
    TransactionListFilter, UpdateCategoryCmd,
};

use common::{assert_consistent, balance, category, count_rows, date, engine_with_db, wallet};

#[tokio::test]
async fn raising_the_balance_records_an_income() {
    let (engine, db) = engine_with_db().await;
    let w = wallet(&engine, "alice", "Cash", 100_000).await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;
    engine
        .create_transaction(
            "alice",
            TransactionFields::expense(w.id, Money::major(20_000), date(2026, 10, 3), food.id),
        )
        .await
        .unwrap();

    let edit = engine
        .edit_wallet_balance(w.id, "alice", Money::major(95_000))
        .await
        .unwrap();
    assert_eq!(edit.wallet.balance, Money::major(95_000));
    let adjustment = edit.adjustment.unwrap();
    assert_eq!(adjustment.kind, TransactionKind::Income);
    assert_eq!(adjustment.amount, Money::major(15_000));
    assert_eq!(
        adjustment.description.as_deref(),
        Some("Balance adjustment: +15000.00")
    );

    let category = engine
        .category(adjustment.category_id.unwrap(), "alice")
        .await
        .unwrap();
    assert!(category.is_system);
    assert_eq!(category.kind, CategoryKind::Income);

    let listed = engine
        .list_transactions(
            "alice",
            &TransactionListFilter {
                wallet_id: Some(w.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listed.items.len(), 2);
    assert!(listed.items.iter().any(|tx| tx.id == adjustment.id));
    assert_eq!(count_rows(&db, "legs").await, 2);

    assert_eq!(balance(&engine, w.id, "alice").await, Money::major(95_000));
    assert_consistent(&engine, "alice").await;
}

#[tokio::test]
async fn lowering_the_balance_records_an_expense() {
    let (engine, _db) = engine_with_db().await;
    let w = wallet(&engine, "alice", "Cash", 100).await;

    let edit = engine
        .edit_wallet_balance(w.id, "alice", Money::new(7_950))
        .await
        .unwrap();
    let adjustment = edit.adjustment.unwrap();
    assert_eq!(adjustment.kind, TransactionKind::Expense);
    assert_eq!(adjustment.amount, Money::new(2_050));
    assert_eq!(
        adjustment.description.as_deref(),
        Some("Balance adjustment: -20.50")
    );
    assert_eq!(balance(&engine, w.id, "alice").await, Money::new(7_950));

    // a second adjustment reuses the same reserved category
    let again = engine
        .edit_wallet_balance(w.id, "alice", Money::new(7_000))
        .await
        .unwrap()
        .adjustment
        .unwrap();
    assert_eq!(again.category_id, adjustment.category_id);
    assert_consistent(&engine, "alice").await;
}

#[tokio::test]
async fn unchanged_balance_records_nothing() {
    let (engine, db) = engine_with_db().await;
    let w = wallet(&engine, "alice", "Cash", 80_000).await;

    let edit = engine
        .edit_wallet_balance(w.id, "alice", Money::major(80_000))
        .await
        .unwrap();
    assert!(edit.adjustment.is_none());
    assert_eq!(edit.wallet.balance, Money::major(80_000));
    assert_eq!(count_rows(&db, "transactions").await, 0);
}

#[tokio::test]
async fn adjustment_can_be_deleted_like_any_transaction() {
    let (engine, _db) = engine_with_db().await;
    let w = wallet(&engine, "alice", "Cash", 50).await;
    let adjustment = engine
        .edit_wallet_balance(w.id, "alice", Money::major(70))
        .await
        .unwrap()
        .adjustment
        .unwrap();

    engine
        .delete_transaction(adjustment.id, "alice")
        .await
        .unwrap();
    assert_eq!(balance(&engine, w.id, "alice").await, Money::major(50));
}

#[tokio::test]
async fn adjustment_categories_are_reserved() {
    let (engine, _db) = engine_with_db().await;
    let w = wallet(&engine, "alice", "Cash", 50).await;
    let adjustment = engine
        .edit_wallet_balance(w.id, "alice", Money::major(10))
        .await
        .unwrap()
        .adjustment
        .unwrap();
    let system_id = adjustment.category_id.unwrap();

    let visible = engine.list_categories("alice", None).await.unwrap();
    assert!(visible.iter().all(|category| !category.is_system));

    let err = engine
        .create_transaction(
            "alice",
            TransactionFields::expense(w.id, Money::major(1), date(2026, 10, 1), system_id),
        )
        .await;
    assert!(matches!(err, Err(EngineError::Validation(_))));

    for user in ["alice", "root"] {
        assert!(matches!(
            engine
                .update_category(
                    system_id,
                    user,
                    UpdateCategoryCmd {
                        name: Some("Mine".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(EngineError::Forbidden(_))
        ));
        assert!(matches!(
            engine.delete_category(system_id, user).await,
            Err(EngineError::Forbidden(_))
        ));
    }
}

#[tokio::test]
async fn balance_edit_requires_ownership() {
    let (engine, _db) = engine_with_db().await;
    let w = wallet(&engine, "alice", "Cash", 50).await;

    assert!(matches!(
        engine.edit_wallet_balance(w.id, "bob", Money::ZERO).await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        engine
            .edit_wallet_balance(uuid::Uuid::new_v4(), "alice", Money::ZERO)
            .await,
        Err(EngineError::NotFound(_))
    ));
    assert_eq!(balance(&engine, w.id, "alice").await, Money::major(50));
}

#[tokio::test]
async fn unrepresentable_difference_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let w = engine
        .create_wallet(CreateWalletCmd::new("alice", "Cash").initial_balance(Money::new(1)))
        .await
        .unwrap();

    // one cent above the target leaves a difference of exactly i64::MIN
    let target: Money = "-92233720368547758.07".parse().unwrap();
    let err = engine.edit_wallet_balance(w.id, "alice", target).await;
    assert!(matches!(err, Err(EngineError::Validation(_))), "{err:?}");
    assert_eq!(balance(&engine, w.id, "alice").await, Money::new(1));
    assert_eq!(count_rows(&db, "transactions").await, 0);
}
