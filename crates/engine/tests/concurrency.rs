mod common;

use std::sync::Arc;

use engine::{CategoryKind, Money, TransactionFields};

use common::{assert_consistent, balance, category, count_rows, date, engine_with_file_db, wallet};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_expenses_on_one_wallet_lose_no_update() {
    let (engine, db, path) = engine_with_file_db(50).await;
    let engine = Arc::new(engine);
    let w = wallet(&engine, "alice", "Cash", 1_000).await;
    let food = category(&engine, "alice", "Food", CategoryKind::Expense).await;
    let (wallet_id, food_id) = (w.id, food.id);

    let mut handles = Vec::new();
    for i in 0..20 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .create_transaction(
                    "alice",
                    TransactionFields::expense(
                        wallet_id,
                        Money::major(10),
                        date(2026, 10, 1 + i % 28),
                        food_id,
                    ),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(balance(&engine, w.id, "alice").await, Money::major(800));
    assert_eq!(count_rows(&db, "transactions").await, 20);
    assert_consistent(&engine, "alice").await;

    drop(db);
    let _ = std::fs::remove_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_transfers_and_edits_keep_the_ledger_consistent() {
    let (engine, db, path) = engine_with_file_db(50).await;
    let engine = Arc::new(engine);
    let a = wallet(&engine, "alice", "Bank", 1_000).await;
    let b = wallet(&engine, "alice", "Cash", 1_000).await;
    let (a_id, b_id) = (a.id, b.id);

    let mut handles = Vec::new();
    for i in 0..10u32 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            let (from, to) = if i % 2 == 0 { (a_id, b_id) } else { (b_id, a_id) };
            engine
                .create_transaction(
                    "alice",
                    TransactionFields::transfer(from, to, Money::major(5), date(2026, 10, 2)),
                )
                .await
                .map(|_| ())
        }));
    }
    {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .edit_wallet_balance(a_id, "alice", Money::major(2_000))
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // the edit may have landed between any two transfers
    assert_consistent(&engine, "alice").await;
    assert_eq!(count_rows(&db, "transactions").await, 11);
    assert_eq!(count_rows(&db, "legs").await, 21);

    drop(db);
    let _ = std::fs::remove_file(path);
}
