use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use tradelog::aggregate::JournalSummary;
use tradelog::calendar::{self, WeekKey};
use tradelog::config::{Config, StoreBackend};
use tradelog::journal::Journal;
use tradelog::rest::RestStore;
use tradelog::session::JournalSession;
use tradelog::store::{self, FileStore, JournalStore};

/// Tradelog - 30-day trading journals from the command line
#[derive(Parser, Debug)]
#[command(name = "tradelog", version, about)]
struct Args {
    /// Config file (TOML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the six week blocks for a start date
    Partition {
        #[arg(long)]
        start: NaiveDate,
    },
    /// Create a journal starting at a date
    Create {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long, default_value_t = 0.0)]
        capital: f64,
    },
    /// List your journals, latest month first
    List {
        /// Every user's journals, grouped by owner (admin identities only)
        #[arg(long)]
        all: bool,
    },
    /// Show week and overall totals
    Show { id: String },
    /// Record a trade result
    Trade {
        id: String,
        /// Week number (1-6)
        #[arg(long)]
        week: u8,
        /// Trade slot (1-5)
        #[arg(long)]
        row: usize,
        /// Day within the week (1-5)
        #[arg(long)]
        day: usize,
        value: String,
    },
    /// Record the charges paid on a day
    Charge {
        id: String,
        #[arg(long)]
        week: u8,
        #[arg(long)]
        day: usize,
        value: String,
    },
    /// Set the starting capital
    Capital { id: String, value: String },
    /// Delete one of your journals
    Delete { id: String },
}

fn open_store(config: &Config) -> Result<Arc<dyn JournalStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn JournalStore> = match config.store.backend {
        StoreBackend::File => Arc::new(FileStore::open(&config.store.path)?),
        StoreBackend::Rest => Arc::new(RestStore::from_config(&config.store)?),
    };
    Ok(store)
}

fn week_key(number: u8) -> Result<WeekKey, Box<dyn std::error::Error>> {
    WeekKey::new(number).ok_or_else(|| format!("week must be 1-6, got {}", number).into())
}

/// Convert a 1-based CLI index to the 0-based cell index.
fn cell_index(name: &str, n: usize) -> Result<usize, Box<dyn std::error::Error>> {
    n.checked_sub(1)
        .ok_or_else(|| format!("{} is 1-based, got 0", name).into())
}

fn print_journal_line(j: &Journal) {
    println!(
        "{}  {:04}-{:02}  {} .. {}  capital {:.2}",
        j.id,
        j.year,
        j.month,
        j.start_date,
        j.end_date(),
        j.starting_capital
    );
}

fn print_summary(summary: &JournalSummary) {
    for (key, week) in &summary.weeks {
        println!(
            "{:<6} earning {:>12.2}  charges {:>10.2}  net {:>12.2}",
            key, week.total_earning, week.total_charges, week.net_profit
        );
    }
    let o = &summary.overall;
    println!();
    println!("completed days   {}", o.completed_days);
    println!("win / loss days  {} / {}", o.win_days, o.loss_days);
    println!("trades           {}", o.total_trades);
    println!("total earning    {:.2}", o.total_earning);
    println!("total charges    {:.2}", o.total_charges);
    println!("total capital    {:.2}", o.total_capital);
    println!("per-day revenue  {:.2}", o.per_day_revenue);
    println!("roi              {:.2}%", o.roi);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let identity = config.identity.clone();
    let today = Local::now().date_naive();

    if let Command::Partition { start } = &args.command {
        for (key, dates) in calendar::partition(*start) {
            let days: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
            println!("{}: {}", key, days.join(" "));
        }
        return Ok(());
    }

    let store = open_store(&config)?;
    let quiet = config.editing.debounce();
    let policy = config.editing.policy;

    match args.command {
        Command::Partition { .. } => {}
        Command::Create { start, capital } => {
            let journal = store::create_journal(store.as_ref(), &identity, start, capital).await?;
            println!(
                "{}  {} .. {}",
                journal.id,
                journal.start_date,
                journal.end_date()
            );
        }
        Command::List { all: false } => {
            let journals = store.list(&identity.user_id).await?;
            for j in store::latest_period_first(journals) {
                print_journal_line(&j);
            }
        }
        Command::List { all: true } => {
            for (owner, journals) in store::list_all_by_owner(store.as_ref(), &identity).await? {
                println!("{} ({} journals)", owner, journals.len());
                for j in &journals {
                    print!("  ");
                    print_journal_line(j);
                }
            }
        }
        Command::Show { id } => {
            let session =
                JournalSession::open_owned(store, &identity, &id, policy, quiet).await?;
            let journal = session.journal().await;
            println!(
                "{} .. {}  (current: {})",
                journal.start_date,
                journal.end_date(),
                session.current_week(today).await
            );
            print_summary(&session.summary().await);
        }
        Command::Trade {
            id,
            week,
            row,
            day,
            value,
        } => {
            let mut session =
                JournalSession::open_owned(store, &identity, &id, policy, quiet).await?;
            session
                .edit_trade(
                    week_key(week)?,
                    cell_index("row", row)?,
                    cell_index("day", day)?,
                    &value,
                    today,
                )
                .await?;
            session.save_now().await?;
            info!(journal_id = %id, "trade recorded");
            print_summary(&session.summary().await);
        }
        Command::Charge {
            id,
            week,
            day,
            value,
        } => {
            let mut session =
                JournalSession::open_owned(store, &identity, &id, policy, quiet).await?;
            session
                .edit_charge(
                    week_key(week)?,
                    cell_index("day", day)?,
                    &value,
                    today,
                )
                .await?;
            session.save_now().await?;
            info!(journal_id = %id, "charge recorded");
            print_summary(&session.summary().await);
        }
        Command::Capital { id, value } => {
            let mut session =
                JournalSession::open_owned(store, &identity, &id, policy, quiet).await?;
            session.set_starting_capital(&value).await;
            session.save_now().await?;
            print_summary(&session.summary().await);
        }
        Command::Delete { id } => {
            store::delete_owned(store.as_ref(), &identity, &id).await?;
            println!("deleted {}", id);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_date_comes_from_the_clock() {
        let parsed = Args::try_parse_from([
            "tradelog", "trade", "j1", "--week", "1", "--row", "1", "--day", "1", "50",
            "--today", "2025-01-01",
        ]);
        assert!(parsed.is_err());

        let parsed = Args::try_parse_from([
            "tradelog", "charge", "j1", "--week", "2", "--day", "3", "4.5",
        ])
        .unwrap();
        assert!(matches!(parsed.command, Command::Charge { day: 3, .. }));
    }

    #[test]
    fn test_list_all_flag() {
        let parsed = Args::try_parse_from(["tradelog", "list", "--all"]).unwrap();
        assert!(matches!(parsed.command, Command::List { all: true }));
        let parsed = Args::try_parse_from(["tradelog", "list"]).unwrap();
        assert!(matches!(parsed.command, Command::List { all: false }));
    }

    #[test]
    fn test_cell_index_is_one_based() {
        assert_eq!(cell_index("day", 1).unwrap(), 0);
        assert!(cell_index("day", 0).is_err());
    }
}
