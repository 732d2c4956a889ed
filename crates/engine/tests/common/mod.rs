#![allow(dead_code)]

use std::path::PathBuf;

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    Category, CategoryKind, CreateCategoryCmd, CreateWalletCmd, Currency, Engine, Money, Role,
    Wallet,
};
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    seed_users(&engine).await;
    (engine, db)
}

/// A file backed database, so several pooled connections see the same data.
pub async fn engine_with_file_db(max_retries: u32) -> (Engine, DatabaseConnection, PathBuf) {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .max_retries(max_retries)
        .build()
        .await
        .unwrap();
    seed_users(&engine).await;
    (engine, db, path)
}

async fn seed_users(engine: &Engine) {
    engine.new_user("alice", Role::User).await.unwrap();
    engine.new_user("bob", Role::User).await.unwrap();
    engine.new_user("root", Role::Admin).await.unwrap();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn wallet(engine: &Engine, user: &str, name: &str, initial: i64) -> Wallet {
    engine
        .create_wallet(
            CreateWalletCmd::new(user, name)
                .currency(Currency::EUR)
                .initial_balance(Money::major(initial)),
        )
        .await
        .unwrap()
}

pub async fn category(engine: &Engine, user: &str, name: &str, kind: CategoryKind) -> Category {
    engine
        .create_category(CreateCategoryCmd::new(user, name, kind))
        .await
        .unwrap()
}

pub async fn balance(engine: &Engine, wallet_id: Uuid, user: &str) -> Money {
    engine.wallet(wallet_id, user).await.unwrap().balance
}

pub async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

pub async fn assert_consistent(engine: &Engine, user: &str) {
    let audits = engine.audit_balances(user).await.unwrap();
    for audit in audits {
        assert!(
            audit.is_consistent(),
            "wallet {} drifted by {}",
            audit.wallet_name,
            audit.drift
        );
    }
}
