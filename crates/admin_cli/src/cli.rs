use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{
    BudgetPeriod, CategoryKind, Currency, EngineError, Money, Role, TransactionKind, WalletKind,
};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tally_admin")]
#[command(about = "Operator utilities for the tally ledger")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long)]
    pub config: Option<String>,

    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Log level for the CLI and the engine (e.g. `info`, `debug`).
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the database schema.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    #[command(subcommand)]
    User(UserCommand),
    #[command(subcommand)]
    Wallet(WalletCommand),
    #[command(subcommand)]
    Category(CategoryCommand),
    #[command(subcommand)]
    Tx(TxCommand),
    #[command(subcommand)]
    Budget(BudgetCommand),
    #[command(subcommand)]
    Report(ReportCommand),
    /// Compare stored wallet balances with the ledger.
    Audit(UserArg),
    /// Rewrite drifted wallet balances from the ledger.
    Repair(UserArg),
}

#[derive(Subcommand, Debug)]
pub enum MigrateCommand {
    Up,
    Down,
    Fresh,
    Status,
}

#[derive(Args, Debug)]
pub struct UserArg {
    #[arg(long)]
    pub user: String,
}

#[derive(Args, Debug)]
pub struct UserAndId {
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub id: Uuid,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Create {
        #[arg(long)]
        username: String,
        #[arg(long, value_parser = parse_role, default_value = "user")]
        role: Role,
    },
    Show {
        #[arg(long)]
        username: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    Create {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_wallet_kind, default_value = "cash")]
        kind: WalletKind,
        #[arg(long, value_parser = parse_currency, default_value = "EUR")]
        currency: Currency,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        initial_balance: Money,
    },
    List(UserArg),
    Show(UserAndId),
    Update {
        #[command(flatten)]
        target: UserAndId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = parse_wallet_kind)]
        kind: Option<WalletKind>,
    },
    /// Set the balance to an observed value, recording the difference.
    EditBalance {
        #[command(flatten)]
        target: UserAndId,
        #[arg(long, allow_hyphen_values = true)]
        balance: Money,
    },
    Delete(UserAndId),
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Create {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_category_kind)]
        kind: CategoryKind,
        #[arg(long)]
        icon: Option<String>,
        /// Shared with every user (admins only).
        #[arg(long)]
        global: bool,
    },
    List {
        #[arg(long)]
        user: String,
        #[arg(long, value_parser = parse_category_kind)]
        kind: Option<CategoryKind>,
    },
    Update {
        #[command(flatten)]
        target: UserAndId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long, conflicts_with = "icon")]
        clear_icon: bool,
        #[arg(long, value_parser = parse_category_kind)]
        kind: Option<CategoryKind>,
    },
    Delete(UserAndId),
}

/// Fields of a transaction as given on the command line.
#[derive(Args, Debug)]
pub struct TxFieldsArgs {
    #[arg(long, value_parser = parse_transaction_kind)]
    pub kind: TransactionKind,
    #[arg(long)]
    pub wallet: Uuid,
    #[arg(long)]
    pub amount: Money,
    /// Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub category: Option<Uuid>,
    #[arg(long)]
    pub target: Option<Uuid>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    Add {
        #[arg(long)]
        user: String,
        #[command(flatten)]
        fields: TxFieldsArgs,
    },
    Show(UserAndId),
    List {
        #[arg(long)]
        user: String,
        /// List another user's transactions (admins only).
        #[arg(long, conflicts_with = "all_users")]
        of_user: Option<String>,
        /// List every user's transactions (admins only).
        #[arg(long)]
        all_users: bool,
        #[arg(long)]
        wallet: Option<Uuid>,
        #[arg(long)]
        category: Option<Uuid>,
        #[arg(long, value_parser = parse_transaction_kind)]
        kind: Option<TransactionKind>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        cursor: Option<String>,
    },
    Update {
        #[command(flatten)]
        target: UserAndId,
        #[command(flatten)]
        fields: TxFieldsArgs,
    },
    Delete(UserAndId),
}

#[derive(Subcommand, Debug)]
pub enum BudgetCommand {
    Create {
        #[arg(long)]
        user: String,
        #[arg(long)]
        category: Uuid,
        #[arg(long)]
        limit: Money,
        #[arg(long, value_parser = parse_period, default_value = "monthly")]
        period: BudgetPeriod,
    },
    List(UserArg),
    Update {
        #[command(flatten)]
        target: UserAndId,
        #[arg(long)]
        limit: Option<Money>,
        #[arg(long, value_parser = parse_period)]
        period: Option<BudgetPeriod>,
    },
    Delete(UserAndId),
    /// Spending against every budget of the user.
    Status {
        #[arg(long)]
        user: String,
        /// Reference date selecting the period window; defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    Summary {
        #[arg(long)]
        user: String,
        /// Restrict income/expense to a calendar month (any day of it).
        #[arg(long)]
        month: Option<NaiveDate>,
    },
    Trend {
        #[arg(long)]
        user: String,
        #[arg(long, default_value_t = 6)]
        months: u32,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

fn parse_role(raw: &str) -> Result<Role, EngineError> {
    Role::try_from(raw)
}

fn parse_wallet_kind(raw: &str) -> Result<WalletKind, EngineError> {
    WalletKind::try_from(raw)
}

fn parse_currency(raw: &str) -> Result<Currency, EngineError> {
    Currency::try_from(raw)
}

fn parse_category_kind(raw: &str) -> Result<CategoryKind, EngineError> {
    CategoryKind::try_from(raw)
}

fn parse_transaction_kind(raw: &str) -> Result<TransactionKind, EngineError> {
    TransactionKind::try_from(raw)
}

fn parse_period(raw: &str) -> Result<BudgetPeriod, EngineError> {
    BudgetPeriod::try_from(raw)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_a_transfer() {
        let cli = Cli::try_parse_from([
            "tally_admin",
            "tx",
            "add",
            "--user",
            "alice",
            "--kind",
            "transfer",
            "--wallet",
            "6f1c2a4e-8d0b-4c55-9f35-0d1f2f3a4b5c",
            "--target",
            "0b6a9a5e-3f7e-4d8a-a2c1-5e6f7a8b9c0d",
            "--amount",
            "200000",
            "--date",
            "2026-10-15",
        ])
        .unwrap();
        let Command::Tx(TxCommand::Add { user, fields }) = cli.command else {
            panic!("expected tx add");
        };
        assert_eq!(user, "alice");
        assert_eq!(fields.kind, TransactionKind::Transfer);
        assert_eq!(fields.amount, Money::major(200_000));
        assert!(fields.category.is_none());
    }
}
