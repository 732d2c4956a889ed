mod common;

use engine::{
    CategoryKind, CreateBudgetCmd, CreateCategoryCmd, CreateWalletCmd, EngineError, Money, Role,
    TransactionFields, UpdateCategoryCmd, UpdateWalletCmd, WalletKind,
};

use common::{category, date, engine_with_db, wallet};

#[tokio::test]
async fn users_are_unique() {
    let (engine, _db) = engine_with_db().await;

    assert!(matches!(
        engine.new_user("alice", Role::Admin).await,
        Err(EngineError::Conflict(_))
    ));
    assert!(matches!(
        engine.new_user("   ", Role::User).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.user("nobody").await,
        Err(EngineError::NotFound(_))
    ));
    assert!(engine.user("root").await.unwrap().is_admin());
    assert!(matches!(
        engine.list_wallets("nobody").await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn wallet_names_are_unique_per_user() {
    let (engine, _db) = engine_with_db().await;
    let cash = wallet(&engine, "alice", "Cash", 0).await;

    assert!(matches!(
        engine.create_wallet(CreateWalletCmd::new("alice", " cash ")).await,
        Err(EngineError::Conflict(_))
    ));
    assert!(matches!(
        engine.create_wallet(CreateWalletCmd::new("alice", "")).await,
        Err(EngineError::Validation(_))
    ));
    // another user may reuse the name
    wallet(&engine, "bob", "Cash", 0).await;

    let bank = wallet(&engine, "alice", "Bank", 0).await;
    assert!(matches!(
        engine
            .update_wallet(
                bank.id,
                "alice",
                UpdateWalletCmd {
                    name: Some("CASH".to_string()),
                    kind: None,
                },
            )
            .await,
        Err(EngineError::Conflict(_))
    ));

    let retyped = engine
        .update_wallet(
            cash.id,
            "alice",
            UpdateWalletCmd {
                name: None,
                kind: Some(WalletKind::Ewallet),
            },
        )
        .await
        .unwrap();
    assert_eq!(retyped.kind, WalletKind::Ewallet);
    assert_eq!(retyped.name, "Cash");

    let names: Vec<_> = engine
        .list_wallets("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, vec!["Bank", "Cash"]);
}

#[tokio::test]
async fn wallets_of_other_users_are_forbidden() {
    let (engine, _db) = engine_with_db().await;
    let cash = wallet(&engine, "alice", "Cash", 0).await;

    assert!(matches!(
        engine.wallet(cash.id, "bob").await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        engine
            .update_wallet(cash.id, "bob", UpdateWalletCmd::default())
            .await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        engine.delete_wallet(cash.id, "bob").await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(engine.list_wallets("bob").await.unwrap().is_empty());
}

#[tokio::test]
async fn categories_are_scoped_to_their_owner() {
    let (engine, _db) = engine_with_db().await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;
    category(&engine, "alice", "Salary", CategoryKind::Income).await;
    category(&engine, "bob", "Games", CategoryKind::Expense).await;

    // same name, other kind
    category(&engine, "alice", "Food", CategoryKind::Income).await;
    assert!(matches!(
        engine
            .create_category(CreateCategoryCmd::new("alice", "FOOD", CategoryKind::Expense))
            .await,
        Err(EngineError::Conflict(_))
    ));

    assert!(matches!(
        engine.category(food.id, "bob").await,
        Err(EngineError::Forbidden(_))
    ));
    assert!(matches!(
        engine.delete_category(food.id, "bob").await,
        Err(EngineError::Forbidden(_))
    ));

    let expenses = engine
        .list_categories("alice", Some(CategoryKind::Expense))
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].id, food.id);
    assert_eq!(engine.list_categories("alice", None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn global_categories_need_an_admin() {
    let (engine, _db) = engine_with_db().await;

    assert!(matches!(
        engine
            .create_category(
                CreateCategoryCmd::new("alice", "Rent", CategoryKind::Expense).global()
            )
            .await,
        Err(EngineError::Forbidden(_))
    ));

    let rent = engine
        .create_category(
            CreateCategoryCmd::new("root", "Rent", CategoryKind::Expense)
                .icon("house")
                .global(),
        )
        .await
        .unwrap();
    assert!(rent.is_global());
    assert_eq!(rent.icon.as_deref(), Some("house"));

    let seen_by_bob = engine.list_categories("bob", None).await.unwrap();
    assert!(seen_by_bob.iter().any(|c| c.id == rent.id));

    assert!(matches!(
        engine
            .update_category(rent.id, "bob", UpdateCategoryCmd::default())
            .await,
        Err(EngineError::Forbidden(_))
    ));

    let cleared = engine
        .update_category(
            rent.id,
            "root",
            UpdateCategoryCmd {
                icon: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.icon, None);
    assert_eq!(cleared.name, "Rent");
}

#[tokio::test]
async fn referenced_categories_keep_their_kind() {
    let (engine, _db) = engine_with_db().await;
    let w = wallet(&engine, "alice", "Cash", 100).await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;
    let gifts = category(&engine, "alice", "Gifts", CategoryKind::Expense).await;
    let spare = category(&engine, "alice", "Spare", CategoryKind::Expense).await;

    engine
        .create_transaction(
            "alice",
            TransactionFields::expense(w.id, Money::major(5), date(2026, 10, 1), food.id),
        )
        .await
        .unwrap();
    engine
        .create_budget(CreateBudgetCmd::monthly("alice", gifts.id, Money::major(50)))
        .await
        .unwrap();

    let to_income = UpdateCategoryCmd {
        kind: Some(CategoryKind::Income),
        ..Default::default()
    };
    for used in [food.id, gifts.id] {
        assert!(matches!(
            engine.update_category(used, "alice", to_income.clone()).await,
            Err(EngineError::Conflict(_))
        ));
        assert!(matches!(
            engine.delete_category(used, "alice").await,
            Err(EngineError::Conflict(_))
        ));
    }

    // renaming a used category is fine
    let renamed = engine
        .update_category(
            food.id,
            "alice",
            UpdateCategoryCmd {
                name: Some("Groceries".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Groceries");

    let moved = engine
        .update_category(spare.id, "alice", to_income)
        .await
        .unwrap();
    assert_eq!(moved.kind, CategoryKind::Income);
    engine.delete_category(spare.id, "alice").await.unwrap();
    assert!(matches!(
        engine.category(spare.id, "alice").await,
        Err(EngineError::NotFound(_))
    ));
}
