use std::error::Error;

use chrono::{NaiveDate, Utc};
use clap::Parser;
use engine::{
    CreateBudgetCmd, CreateCategoryCmd, CreateWalletCmd, Engine, EngineError, ListScope,
    PeriodWindow, TransactionFields, TransactionListFilter, UpdateBudgetCmd, UpdateCategoryCmd,
    UpdateWalletCmd,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;

use cli::{
    BudgetCommand, CategoryCommand, Cli, Command, MigrateCommand, ReportCommand, TxCommand,
    TxFieldsArgs, UserCommand, WalletCommand,
};
use settings::{Overrides, Settings};

mod cli;
mod settings;

type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn transaction_fields(args: TxFieldsArgs) -> TransactionFields {
    let date = args.date.unwrap_or_else(today);
    let mut fields = TransactionFields::new(args.kind, args.wallet, args.amount, date);
    fields.category_id = args.category;
    fields.target_wallet_id = args.target;
    fields.description = args.description;
    fields
}

/// Exit code per error kind, so scripts can tell them apart.
fn exit_code(err: &EngineError) -> i32 {
    match err {
        EngineError::Validation(_) => 2,
        EngineError::NotFound(_) => 3,
        EngineError::Forbidden(_) => 4,
        EngineError::Conflict(_) => 5,
        EngineError::Integrity(_) => 6,
    }
}

async fn connect_db(settings: &Settings) -> CliResult<DatabaseConnection> {
    let db = Database::connect(settings.database.url.as_str()).await?;
    tracing::debug!(url = %settings.database.url, "database connected");
    Ok(db)
}

async fn migrate(db: &DatabaseConnection, command: MigrateCommand) -> CliResult<()> {
    match command {
        MigrateCommand::Up => migration::Migrator::up(db, None).await?,
        MigrateCommand::Down => migration::Migrator::down(db, None).await?,
        MigrateCommand::Fresh => migration::Migrator::fresh(db).await?,
        MigrateCommand::Status => migration::Migrator::status(db).await?,
    }
    tracing::info!("migration finished");
    Ok(())
}

async fn run(engine: &Engine, command: Command) -> CliResult<()> {
    match command {
        Command::Migrate(_) => {}
        Command::User(command) => match command {
            UserCommand::Create { username, role } => {
                print_json(&engine.new_user(&username, role).await?)?;
            }
            UserCommand::Show { username } => print_json(&engine.user(&username).await?)?,
        },
        Command::Wallet(command) => match command {
            WalletCommand::Create {
                user,
                name,
                kind,
                currency,
                initial_balance,
            } => {
                let cmd = CreateWalletCmd::new(user, name)
                    .kind(kind)
                    .currency(currency)
                    .initial_balance(initial_balance);
                print_json(&engine.create_wallet(cmd).await?)?;
            }
            WalletCommand::List(args) => print_json(&engine.list_wallets(&args.user).await?)?,
            WalletCommand::Show(args) => {
                print_json(&engine.wallet(args.id, &args.user).await?)?;
            }
            WalletCommand::Update { target, name, kind } => {
                let cmd = UpdateWalletCmd { name, kind };
                print_json(&engine.update_wallet(target.id, &target.user, cmd).await?)?;
            }
            WalletCommand::EditBalance { target, balance } => {
                let edit = engine
                    .edit_wallet_balance(target.id, &target.user, balance)
                    .await?;
                print_json(&edit)?;
            }
            WalletCommand::Delete(args) => {
                engine.delete_wallet(args.id, &args.user).await?;
                tracing::info!(wallet_id = %args.id, "wallet deleted");
            }
        },
        Command::Category(command) => match command {
            CategoryCommand::Create {
                user,
                name,
                kind,
                icon,
                global,
            } => {
                let mut cmd = CreateCategoryCmd::new(user, name, kind);
                if let Some(icon) = icon {
                    cmd = cmd.icon(icon);
                }
                if global {
                    cmd = cmd.global();
                }
                print_json(&engine.create_category(cmd).await?)?;
            }
            CategoryCommand::List { user, kind } => {
                print_json(&engine.list_categories(&user, kind).await?)?;
            }
            CategoryCommand::Update {
                target,
                name,
                icon,
                clear_icon,
                kind,
            } => {
                let icon = if clear_icon { Some(None) } else { icon.map(Some) };
                let cmd = UpdateCategoryCmd { name, icon, kind };
                print_json(&engine.update_category(target.id, &target.user, cmd).await?)?;
            }
            CategoryCommand::Delete(args) => {
                engine.delete_category(args.id, &args.user).await?;
                tracing::info!(category_id = %args.id, "category deleted");
            }
        },
        Command::Tx(command) => match command {
            TxCommand::Add { user, fields } => {
                let outcome = engine
                    .create_transaction(&user, transaction_fields(fields))
                    .await?;
                print_json(&outcome)?;
            }
            TxCommand::Show(args) => {
                print_json(&engine.transaction(args.id, &args.user).await?)?;
            }
            TxCommand::List {
                user,
                of_user,
                all_users,
                wallet,
                category,
                kind,
                from,
                to,
                limit,
                cursor,
            } => {
                let scope = match (of_user, all_users) {
                    (_, true) => ListScope::All,
                    (Some(other), false) => ListScope::User(other),
                    (None, false) => ListScope::Own,
                };
                let filter = TransactionListFilter {
                    scope,
                    wallet_id: wallet,
                    category_id: category,
                    kind,
                    from,
                    to,
                    limit,
                    cursor,
                };
                print_json(&engine.list_transactions(&user, &filter).await?)?;
            }
            TxCommand::Update { target, fields } => {
                let outcome = engine
                    .update_transaction(target.id, &target.user, transaction_fields(fields))
                    .await?;
                print_json(&outcome)?;
            }
            TxCommand::Delete(args) => {
                print_json(&engine.delete_transaction(args.id, &args.user).await?)?;
            }
        },
        Command::Budget(command) => match command {
            BudgetCommand::Create {
                user,
                category,
                limit,
                period,
            } => {
                let cmd = CreateBudgetCmd::monthly(user, category, limit).period(period);
                print_json(&engine.create_budget(cmd).await?)?;
            }
            BudgetCommand::List(args) => print_json(&engine.list_budgets(&args.user).await?)?,
            BudgetCommand::Update {
                target,
                limit,
                period,
            } => {
                let cmd = UpdateBudgetCmd { limit, period };
                print_json(&engine.update_budget(target.id, &target.user, cmd).await?)?;
            }
            BudgetCommand::Delete(args) => {
                engine.delete_budget(args.id, &args.user).await?;
                tracing::info!(budget_id = %args.id, "budget deleted");
            }
            BudgetCommand::Status { user, today: date } => {
                let statuses = engine
                    .list_budget_statuses(&user, date.unwrap_or_else(today))
                    .await?;
                print_json(&statuses)?;
            }
        },
        Command::Report(command) => match command {
            ReportCommand::Summary { user, month } => {
                let window = month.map(PeriodWindow::month_of).transpose()?;
                print_json(&engine.summary(&user, window).await?)?;
            }
            ReportCommand::Trend {
                user,
                months,
                today: date,
            } => {
                let trend = engine
                    .monthly_trend(&user, months, date.unwrap_or_else(today))
                    .await?;
                print_json(&trend)?;
            }
        },
        Command::Audit(args) => {
            let audits = engine.audit_balances(&args.user).await?;
            let drifted = audits.iter().filter(|a| !a.is_consistent()).count();
            tracing::info!(wallets = audits.len(), drifted, "balance audit finished");
            print_json(&audits)?;
        }
        Command::Repair(args) => {
            let repaired = engine.repair_balances(&args.user).await?;
            tracing::info!(repaired = repaired.len(), "balance repair finished");
            print_json(&repaired)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let settings = Settings::load(Overrides {
        config: cli.config,
        database_url: cli.database_url,
        log_level: cli.log_level,
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tally_admin={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(&settings).await?;
    if let Command::Migrate(command) = cli.command {
        return migrate(&db, command).await;
    }
    migration::Migrator::up(&db, None).await?;

    let engine = Engine::builder()
        .database(db)
        .max_retries(settings.engine.max_retries)
        .build()
        .await?;

    if let Err(err) = run(&engine, cli.command).await {
        match err.downcast_ref::<EngineError>() {
            Some(engine_err) => {
                eprintln!("{engine_err}");
                std::process::exit(exit_code(engine_err));
            }
            None => return Err(err),
        }
    }
    Ok(())
}
