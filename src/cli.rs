use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::calendar::{self, DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::config::{self, DEFAULT_DATABASE, SchedulerConfig};
use crate::db::alert_repository;
use crate::db::connection::establish_connection;
use crate::error::{AppError, AppResult};
use crate::models::budget::BudgetUpdate;
use crate::models::expense::{Expense, ExpenseUpdate, NewExpense};
use crate::models::recurring::Frequency;
use crate::operations::{
    analytics, budget, categorize, expense, goal, import, parse_amount, people, recurring, wallet,
};
use crate::scheduler::clock::{Clock, SystemClock};
use crate::scheduler::{self, Job, Scheduler};

#[derive(Parser)]
#[command(
    name = "fintrack",
    version,
    about = "Personal finance tracker with recurring expenses and budget alerts"
)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "FINTRACK_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// Acting user ID
    #[arg(long, global = true, env = "FINTRACK_USER", default_value_t = 1)]
    pub user: i64,

    /// Log filter directives, e.g. `fintrack=debug`
    #[arg(long, global = true)]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daily jobs until `exit` or end of input
    Serve {
        /// Time of day (UTC) at which recurring expenses are materialized
        #[arg(long, default_value = "00:00", value_parser = config::parse_time_of_day)]
        materialize_at: NaiveTime,
        /// Time of day (UTC) at which budgets are checked
        #[arg(long, default_value = "00:05", value_parser = config::parse_time_of_day)]
        alerts_at: NaiveTime,
        /// Minutes after which a job lock is considered abandoned
        #[arg(long, default_value_t = 60)]
        lock_ttl_minutes: u32,
    },
    /// Materialize due recurring expenses once
    Materialize,
    /// Check every budget against this month's spend once
    CheckBudgets,
    #[command(subcommand)]
    User(UserCommands),
    #[command(subcommand)]
    Expense(ExpenseCommands),
    #[command(subcommand)]
    Recurring(RecurringCommands),
    #[command(subcommand)]
    Budget(BudgetCommands),
    #[command(subcommand)]
    Alert(AlertCommands),
    #[command(subcommand)]
    Wallet(WalletCommands),
    #[command(subcommand)]
    Goal(GoalCommands),
    #[command(subcommand)]
    Person(PersonCommands),
    #[command(subcommand)]
    Rule(RuleCommands),
    /// Suggest a category for a note using the stored rules
    Categorize { note: String },
    /// Import expenses from a `date,amount,category[,note]` CSV file
    Import { file: PathBuf },
    #[command(subcommand)]
    Analytics(AnalyticsCommands),
}

#[derive(Subcommand)]
pub enum UserCommands {
    Add { name: String, email: String },
    List,
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    Add {
        amount: String,
        /// Resolved from the category rules when omitted
        #[arg(short, long)]
        category: Option<String>,
        /// YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS"; defaults to now
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        note: Option<String>,
        #[arg(short, long)]
        person: Option<String>,
        #[arg(short, long)]
        wallet: Option<i64>,
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    Show { id: i64 },
    Update {
        id: i64,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, conflicts_with = "clear_note")]
        note: Option<String>,
        #[arg(long)]
        clear_note: bool,
        #[arg(long, conflicts_with = "clear_person")]
        person: Option<String>,
        #[arg(long)]
        clear_person: bool,
        #[arg(long, conflicts_with = "clear_wallet")]
        wallet: Option<i64>,
        #[arg(long)]
        clear_wallet: bool,
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum RecurringCommands {
    Add {
        expense_id: i64,
        /// daily, weekly or monthly
        frequency: Frequency,
        /// First due date; defaults to one period after the expense
        #[arg(long)]
        first_due: Option<String>,
    },
    List,
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    Set { category: String, limit: String },
    Update {
        id: i64,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<String>,
    },
    List,
    /// This month's spend against each budget
    Status,
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum AlertCommands {
    List,
}

#[derive(Subcommand)]
pub enum WalletCommands {
    Add {
        name: String,
        #[arg(long, default_value = "0")]
        balance: String,
    },
    List,
}

#[derive(Subcommand)]
pub enum GoalCommands {
    Add {
        name: String,
        target: String,
        #[arg(long)]
        deadline: Option<String>,
    },
    List,
    Contribute { id: i64, amount: String },
}

#[derive(Subcommand)]
pub enum PersonCommands {
    Add { name: String },
    List,
}

#[derive(Subcommand)]
pub enum RuleCommands {
    /// Map notes matching a case-insensitive regex to a category
    Add { pattern: String, category: String },
    List,
}

#[derive(Subcommand)]
pub enum AnalyticsCommands {
    /// Totals for the current month and the last seven days
    Summary,
    Category,
    Daily,
    Person,
}

pub fn run(cli: Cli) -> AppResult<()> {
    let conn = establish_connection(&cli.database)?;
    let user_id = cli.user;

    match cli.command {
        Commands::Serve {
            materialize_at,
            alerts_at,
            lock_ttl_minutes,
        } => {
            drop(conn);
            let config = SchedulerConfig::new(materialize_at, alerts_at, lock_ttl_minutes);
            serve(&cli.database, config)
        }
        Commands::Materialize => run_once(&cli.database, Job::MaterializeRecurring),
        Commands::CheckBudgets => run_once(&cli.database, Job::EvaluateBudgets),
        Commands::User(cmd) => handle_user_command(&conn, cmd),
        Commands::Expense(cmd) => {
            people::require_user(&conn, user_id)?;
            handle_expense_command(&conn, user_id, cmd)
        }
        Commands::Recurring(cmd) => {
            people::require_user(&conn, user_id)?;
            handle_recurring_command(&conn, user_id, cmd)
        }
        Commands::Budget(cmd) => {
            people::require_user(&conn, user_id)?;
            handle_budget_command(&conn, user_id, cmd)
        }
        Commands::Alert(AlertCommands::List) => {
            let alerts = alert_repository::get_user_alerts(&conn, user_id)?;
            if alerts.is_empty() {
                println!("No alerts.");
            }
            for alert in alerts {
                println!("{}  {}", alert.triggered_on.format(TIMESTAMP_FORMAT), alert.message);
            }
            Ok(())
        }
        Commands::Wallet(cmd) => {
            people::require_user(&conn, user_id)?;
            handle_wallet_command(&conn, user_id, cmd)
        }
        Commands::Goal(cmd) => {
            people::require_user(&conn, user_id)?;
            handle_goal_command(&conn, user_id, cmd)
        }
        Commands::Person(cmd) => {
            people::require_user(&conn, user_id)?;
            handle_person_command(&conn, user_id, cmd)
        }
        Commands::Rule(cmd) => handle_rule_command(&conn, cmd),
        Commands::Categorize { note } => {
            println!("{}", categorize::categorize_note_db(&conn, &note)?);
            Ok(())
        }
        Commands::Import { file } => {
            people::require_user(&conn, user_id)?;
            let count = import::import_expenses_csv(&conn, user_id, &file)?;
            println!("Successfully imported {} expenses.", count);
            Ok(())
        }
        Commands::Analytics(cmd) => handle_analytics_command(&conn, user_id, cmd),
    }
}

fn parse_when(input: &str) -> AppResult<NaiveDateTime> {
    calendar::parse_date_or_timestamp(input).map_err(AppError::Validation)
}

fn run_once(db_path: &Path, job: Job) -> AppResult<()> {
    let outcome = scheduler::run_job(job, db_path, Utc::now(), SchedulerConfig::default().lock_ttl)?;
    println!("Done: {}", outcome);
    Ok(())
}

enum ServeCommand {
    Status,
    Materialize,
    Alerts,
    Exit,
    Unknown,
}

fn check_for_command(input: &str) -> ServeCommand {
    match input {
        "status" => ServeCommand::Status,
        "materialize" => ServeCommand::Materialize,
        "alerts" => ServeCommand::Alerts,
        "exit" | "quit" => ServeCommand::Exit,
        _ => ServeCommand::Unknown,
    }
}

/// `None` at end of input.
fn read_user_input() -> io::Result<Option<String>> {
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

fn serve(db_path: &Path, config: SchedulerConfig) -> AppResult<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut scheduler = Scheduler::new(db_path, config, Arc::clone(&clock));
    scheduler.start()?;
    println!(
        "Scheduler running: recurring expenses at {} UTC, budget alerts at {} UTC.",
        scheduler.config().materialize_at,
        scheduler.config().evaluate_at
    );

    loop {
        println!("Please enter a command (status, materialize, alerts, exit):");
        let input = match read_user_input() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                println!("Error reading input: {}", e);
                break;
            }
        };
        if input.is_empty() {
            continue;
        }

        let job = match check_for_command(&input) {
            ServeCommand::Status => {
                let state = if scheduler.is_running() { "running" } else { "stopped" };
                println!(
                    "Scheduler {}. Recurring expenses at {}, budget alerts at {} (UTC).",
                    state,
                    scheduler.config().materialize_at,
                    scheduler.config().evaluate_at
                );
                continue;
            }
            ServeCommand::Materialize => Job::MaterializeRecurring,
            ServeCommand::Alerts => Job::EvaluateBudgets,
            ServeCommand::Exit => break,
            ServeCommand::Unknown => {
                println!("No valid command found.");
                continue;
            }
        };
        match scheduler::run_job(job, db_path, clock.now(), scheduler.config().lock_ttl) {
            Ok(outcome) => println!("Done: {}", outcome),
            Err(e) => println!("Error: {}", e),
        }
    }

    println!("Stopping the scheduler.");
    scheduler.stop();
    Ok(())
}

fn handle_user_command(conn: &Connection, cmd: UserCommands) -> AppResult<()> {
    match cmd {
        UserCommands::Add { name, email } => {
            let id = people::add_user_db(conn, &name, &email, Utc::now().naive_utc())?;
            println!("User added with ID {}.", id);
        }
        UserCommands::List => {
            for user in people::list_users_db(conn)? {
                println!("{:>5}  {:20} {}", user.id, user.name, user.email);
            }
        }
    }
    Ok(())
}

fn print_expense(expense: &Expense) {
    println!(
        "{:>5}  {}  {:>10}  {:20} {}{}",
        expense.id,
        expense.occurred_at.format(DATE_FORMAT),
        expense.amount,
        expense.category,
        expense.note.as_deref().unwrap_or(""),
        if expense.is_recurring { "  (recurring)" } else { "" }
    );
}

fn handle_expense_command(conn: &Connection, user_id: i64, cmd: ExpenseCommands) -> AppResult<()> {
    match cmd {
        ExpenseCommands::Add {
            amount,
            category,
            date,
            note,
            person,
            wallet,
            tags,
        } => {
            let amount = parse_amount(&amount, "amount")?;
            let occurred_at = match date {
                Some(date) => parse_when(&date)?,
                None => Utc::now().naive_utc(),
            };
            let mut new = NewExpense::new(user_id, amount, category.unwrap_or_default(), occurred_at);
            new.note = note;
            new.person = person;
            new.wallet_id = wallet;
            new.tags = tags;
            let id = expense::add_expense_db(conn, new)?;
            println!("Expense added with ID {}.", id);
        }
        ExpenseCommands::List { skip, limit } => {
            let expenses = expense::list_expenses_db(conn, user_id, skip, limit)?;
            if expenses.is_empty() {
                println!("No expenses found.");
            }
            expenses.iter().for_each(print_expense);
        }
        ExpenseCommands::Show { id } => {
            let expense = expense::get_expense_db(conn, user_id, id)?;
            print_expense(&expense);
            if let Some(person) = &expense.person {
                println!("       person: {}", person);
            }
            if !expense.tags.is_empty() {
                println!("       tags: {}", expense.tags.join(", "));
            }
        }
        ExpenseCommands::Update {
            id,
            amount,
            category,
            date,
            note,
            clear_note,
            person,
            clear_person,
            wallet,
            clear_wallet,
            tags,
        } => {
            let update = ExpenseUpdate {
                amount: amount.map(|a| parse_amount(&a, "amount")).transpose()?,
                category,
                occurred_at: date.map(|d| parse_when(&d)).transpose()?,
                note: if clear_note { Some(None) } else { note.map(Some) },
                person: if clear_person { Some(None) } else { person.map(Some) },
                wallet_id: if clear_wallet { Some(None) } else { wallet.map(Some) },
                tags,
            };
            let expense = expense::update_expense_db(conn, user_id, id, update)?;
            println!("Expense updated.");
            print_expense(&expense);
        }
        ExpenseCommands::Delete { id } => {
            expense::delete_expense_db(conn, user_id, id)?;
            println!("Expense removed successfully.");
        }
    }
    Ok(())
}

fn handle_recurring_command(conn: &Connection, user_id: i64, cmd: RecurringCommands) -> AppResult<()> {
    match cmd {
        RecurringCommands::Add {
            expense_id,
            frequency,
            first_due,
        } => {
            let first_due = first_due.map(|d| parse_when(&d)).transpose()?;
            let schedule = recurring::add_schedule_db(conn, user_id, expense_id, frequency, first_due)?;
            println!(
                "Expense {} repeats {}, next on {}.",
                schedule.expense_id,
                schedule.frequency,
                schedule.next_due.format(TIMESTAMP_FORMAT)
            );
        }
        RecurringCommands::List => {
            for schedule in recurring::list_schedules_db(conn, user_id)? {
                println!(
                    "{:>5}  expense {:>5}  {:8} next {}",
                    schedule.id,
                    schedule.expense_id,
                    schedule.frequency.as_str(),
                    schedule.next_due.format(TIMESTAMP_FORMAT)
                );
            }
        }
    }
    Ok(())
}

fn handle_budget_command(conn: &Connection, user_id: i64, cmd: BudgetCommands) -> AppResult<()> {
    match cmd {
        BudgetCommands::Set { category, limit } => {
            let id = budget::set_budget_db(conn, user_id, &category, &limit)?;
            println!("Budget {} set.", id);
        }
        BudgetCommands::Update { id, category, limit } => {
            let update = BudgetUpdate {
                category,
                monthly_limit: limit.map(|l| parse_amount(&l, "budget amount")).transpose()?,
            };
            let budget = budget::update_budget_db(conn, user_id, id, update)?;
            println!("Budget for {} is now {}.", budget.category, budget.monthly_limit);
        }
        BudgetCommands::List => {
            for budget in budget::list_budgets_db(conn, user_id)? {
                println!("{:>5}  {:20} {:>10}", budget.id, budget.category, budget.monthly_limit);
            }
        }
        BudgetCommands::Status => {
            for status in budget::budget_status_db(conn, user_id, Utc::now())? {
                println!(
                    "{:20} spent {:>10} of {:>10}{}",
                    status.budget.category,
                    status.spent,
                    status.budget.monthly_limit,
                    if status.is_exceeded() { "  EXCEEDED" } else { "" }
                );
            }
        }
        BudgetCommands::Delete { id } => {
            budget::delete_budget_db(conn, user_id, id)?;
            println!("Budget removed successfully.");
        }
    }
    Ok(())
}

fn handle_wallet_command(conn: &Connection, user_id: i64, cmd: WalletCommands) -> AppResult<()> {
    match cmd {
        WalletCommands::Add { name, balance } => {
            let balance = parse_amount(&balance, "balance")?;
            let id = wallet::add_wallet_db(conn, user_id, &name, balance)?;
            println!("Wallet added with ID {}.", id);
        }
        WalletCommands::List => {
            for wallet in wallet::list_wallets_db(conn, user_id)? {
                println!("{:>5}  {:20} {:>10}", wallet.id, wallet.name, wallet.balance);
            }
        }
    }
    Ok(())
}

fn handle_goal_command(conn: &Connection, user_id: i64, cmd: GoalCommands) -> AppResult<()> {
    match cmd {
        GoalCommands::Add { name, target, deadline } => {
            let target = parse_amount(&target, "target amount")?;
            let deadline: Option<NaiveDate> = deadline.map(|d| parse_when(&d).map(|ts| ts.date())).transpose()?;
            let id = goal::add_goal_db(conn, user_id, &name, target, deadline)?;
            println!("Goal added with ID {}.", id);
        }
        GoalCommands::List => {
            for goal in goal::list_goals_db(conn, user_id)? {
                let deadline = goal
                    .deadline
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_default();
                println!(
                    "{:>5}  {:20} {:>10} / {:>10}  {:>6}%  {}",
                    goal.id,
                    goal.name,
                    goal.current_amount,
                    goal.target_amount,
                    goal.progress(),
                    deadline
                );
            }
        }
        GoalCommands::Contribute { id, amount } => {
            let amount = parse_amount(&amount, "amount")?;
            let goal = goal::contribute_db(conn, user_id, id, amount)?;
            println!("{} is at {}% ({} of {}).", goal.name, goal.progress(), goal.current_amount, goal.target_amount);
        }
    }
    Ok(())
}

fn handle_person_command(conn: &Connection, user_id: i64, cmd: PersonCommands) -> AppResult<()> {
    match cmd {
        PersonCommands::Add { name } => {
            let id = people::add_person_db(conn, user_id, &name)?;
            println!("Person added with ID {}.", id);
        }
        PersonCommands::List => {
            for person in people::list_people_db(conn, user_id)? {
                println!("{:>5}  {}", person.id, person.name);
            }
        }
    }
    Ok(())
}

fn handle_rule_command(conn: &Connection, cmd: RuleCommands) -> AppResult<()> {
    match cmd {
        RuleCommands::Add { pattern, category } => {
            let id = categorize::add_rule_db(conn, &pattern, &category)?;
            println!("Rule added with ID {}.", id);
        }
        RuleCommands::List => {
            for rule in categorize::list_rules_db(conn)? {
                println!("{:>5}  {:30} -> {}", rule.id, rule.pattern, rule.category);
            }
        }
    }
    Ok(())
}

fn handle_analytics_command(conn: &Connection, user_id: i64, cmd: AnalyticsCommands) -> AppResult<()> {
    let totals = match cmd {
        AnalyticsCommands::Summary => {
            let summary = analytics::monthly_summary(conn, user_id, Utc::now())?;
            println!("Spent this month: {}", summary.total);
            println!("Top category:     {}", summary.top_category);
            println!("Top person:       {}", summary.top_person);
            println!("Last 7 days:      {}", summary.weekly_total);
            return Ok(());
        }
        AnalyticsCommands::Category => analytics::totals_by_category(conn, user_id)?,
        AnalyticsCommands::Person => analytics::totals_by_person(conn, user_id)?,
        AnalyticsCommands::Daily => analytics::totals_by_day(conn, user_id)?
            .into_iter()
            .map(|(day, total)| (day.format(DATE_FORMAT).to_string(), total))
            .collect(),
    };
    for (key, total) in totals {
        println!("{:20} {:>10}", key, total);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["fintrack", "serve"]).unwrap();
        match cli.command {
            Commands::Serve {
                materialize_at,
                alerts_at,
                lock_ttl_minutes,
            } => {
                let config = SchedulerConfig::new(materialize_at, alerts_at, lock_ttl_minutes);
                assert_eq!(config, SchedulerConfig::default());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_bad_time_rejected() {
        assert!(Cli::try_parse_from(["fintrack", "serve", "--alerts-at", "7pm"]).is_err());
    }

    #[test]
    fn test_expense_and_recurring_roundtrip_through_handlers() {
        let dir = tempfile::tempdir().unwrap();
        let conn = establish_connection(dir.path().join("cli.db")).unwrap();
        let user_id = people::add_user_db(&conn, "Ana", "ana@example.com", Utc::now().naive_utc()).unwrap();

        let cli = Cli::try_parse_from([
            "fintrack", "expense", "add", "12.50", "-c", "Gym", "-d", "2024-01-31", "-t", "health,monthly",
        ])
        .unwrap();
        let Commands::Expense(cmd) = cli.command else {
            panic!("expected expense");
        };
        handle_expense_command(&conn, user_id, cmd).unwrap();

        let cli = Cli::try_parse_from(["fintrack", "recurring", "add", "1", "Monthly"]).unwrap();
        let Commands::Recurring(cmd) = cli.command else {
            panic!("expected recurring");
        };
        handle_recurring_command(&conn, user_id, cmd).unwrap();

        let schedules = recurring::list_schedules_db(&conn, user_id).unwrap();
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].frequency, Frequency::Monthly);
        let stored = expense::get_expense_db(&conn, user_id, 1).unwrap();
        assert_eq!(stored.tags, vec!["health", "monthly"]);
    }

    #[test]
    fn test_update_clear_flags() {
        let cli = Cli::try_parse_from(["fintrack", "expense", "update", "3", "--clear-note", "--note", "x"]);
        assert!(cli.is_err());
    }
}
