use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::Write;
use uuid::Uuid;

use crate::application::LedgerService;
use crate::domain::{format_amount, format_currency, parse_amount, Debt, DebtDraft, MonthKey};
use crate::io::{Exporter, ImportOptions, Importer};

/// Scrooge - Personal Debt Tracker
#[derive(Parser)]
#[command(name = "scrooge")]
#[command(about = "Keep track of who owes you money, month by month")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SCROOGE_DATABASE", default_value = "scrooge.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Borrower management commands
    #[command(subcommand)]
    Borrower(BorrowerCommands),

    /// Debt management commands
    #[command(subcommand)]
    Debt(DebtCommands),

    /// List debts
    Debts {
        /// Only debts in this month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Only debts owed by this borrower
        #[arg(long)]
        borrower: Option<String>,
    },

    /// Show debts grouped by month with totals
    Sections {
        /// Borrower name (omit for everyone)
        borrower: Option<String>,
    },

    /// Show how much a borrower still owes
    Owed {
        /// Borrower name
        borrower: String,
    },

    /// Export data: json (full snapshot) or csv (debts)
    Export {
        /// What to export: json, csv
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import a JSON snapshot
    Import {
        /// Snapshot file
        input: String,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum BorrowerCommands {
    /// Add a borrower (no-op if the name already exists)
    Add {
        /// Borrower name
        name: String,
    },

    /// List borrowers with what they owe
    List,

    /// Remove a borrower (their debts are kept)
    Remove {
        /// Borrower name
        name: String,
    },

    /// Rename a borrower
    Rename {
        /// Current name
        name: String,

        /// New name
        new_name: String,
    },
}

#[derive(Subcommand)]
pub enum DebtCommands {
    /// Record a debt, optionally split across several borrowers
    Add {
        /// Short label for the debt
        name: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,

        /// Borrower name; repeat to split between several borrowers
        #[arg(short, long = "borrower", required = true)]
        borrowers: Vec<String>,

        /// Divide the amount between borrowers instead of charging each the full amount
        #[arg(long)]
        split_evenly: bool,

        /// Category tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,

        /// Date of the debt (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Record the debt as already paid
        #[arg(long)]
        paid: bool,
    },

    /// Edit an existing debt
    Edit {
        /// Debt ID
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        amount: Option<String>,

        /// Move the debt to another borrower
        #[arg(long)]
        borrower: Option<String>,

        /// New tag (empty string clears it)
        #[arg(long)]
        tag: Option<String>,

        /// New description (empty string clears it)
        #[arg(long)]
        description: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Mark a debt as paid
    Pay {
        /// Debt ID
        id: String,
    },

    /// Flip a debt between paid and unpaid
    Toggle {
        /// Debt ID
        id: String,
    },

    /// Delete a debt
    Remove {
        /// Debt ID
        id: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut service = LedgerService::open(&self.database).await?;

        if service.load_report().has_corruption() {
            eprintln!(
                "Warning: some stored data in {} could not be read and was skipped.",
                self.database
            );
        }

        match self.command {
            Commands::Borrower(cmd) => run_borrower_command(&mut service, cmd).await?,

            Commands::Debt(cmd) => run_debt_command(&mut service, cmd).await?,

            Commands::Debts { month, borrower } => {
                run_debts_command(&service, month, borrower)?;
            }

            Commands::Sections { borrower } => run_sections_command(&service, borrower)?,

            Commands::Owed { borrower } => {
                let borrower = service.find_borrower(&borrower)?;
                println!(
                    "{} owes {}",
                    borrower.name,
                    format_currency(service.total_owed(borrower.id))
                );
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let writer: Box<dyn Write> = match &output {
                    Some(path) => Box::new(
                        File::create(path)
                            .with_context(|| format!("Failed to create {}", path))?,
                    ),
                    None => Box::new(std::io::stdout()),
                };
                let exporter = Exporter::new(&service);

                let count = match export_type.as_str() {
                    "json" => {
                        let snapshot = exporter.export_json(writer)?;
                        snapshot.borrowers.len() + snapshot.debts.len()
                    }
                    "csv" => exporter.export_debts_csv(writer)?,
                    other => anyhow::bail!("Unknown export type '{}'. Use json or csv", other),
                };

                if let Some(path) = output {
                    eprintln!("Exported {} record(s) to {}", count, path);
                }
            }

            Commands::Import { input, dry_run } => {
                let file =
                    File::open(&input).with_context(|| format!("Failed to open {}", input))?;
                let result = Importer::new(&mut service)
                    .import_json(file, ImportOptions { dry_run })
                    .await?;

                let verb = if dry_run { "Would import" } else { "Imported" };
                println!(
                    "{} {} borrower(s) and {} debt(s), skipped {}",
                    verb, result.imported_borrowers, result.imported_debts, result.skipped
                );
                for error in &result.errors {
                    match &error.field {
                        Some(field) => {
                            println!("  {} ({}): {}", error.record, field, error.error)
                        }
                        None => println!("  {}: {}", error.record, error.error),
                    }
                }
            }
        }

        Ok(())
    }
}

async fn run_borrower_command(service: &mut LedgerService, cmd: BorrowerCommands) -> Result<()> {
    match cmd {
        BorrowerCommands::Add { name } => {
            let existed = service.ledger().borrower_by_name(&name).is_some();
            let borrower = service.add_borrower(&name).await?;
            if existed {
                println!("Borrower already exists: {}", borrower.name);
            } else {
                println!("Added borrower: {}", borrower.name);
            }
        }

        BorrowerCommands::List => {
            let summaries = service.borrower_summaries();
            if summaries.is_empty() {
                println!("No borrowers found.");
            } else {
                println!("{:<24} {:>12} {:>6}", "NAME", "OWED", "DEBTS");
                println!("{}", "-".repeat(44));
                for summary in summaries {
                    println!(
                        "{:<24} {:>12} {:>6}",
                        summary.borrower.name,
                        format_amount(summary.total_owed),
                        summary.debt_count
                    );
                }
            }

            let orphans = service.orphaned_debts();
            if !orphans.is_empty() {
                println!();
                println!("{} debt(s) belong to removed borrowers.", orphans.len());
            }
        }

        BorrowerCommands::Remove { name } => {
            let borrower = service.find_borrower(&name)?;
            service.remove_borrower(borrower.id).await?;
            let kept = service.debts_for_borrower(borrower.id).len();
            println!("Removed borrower: {}", borrower.name);
            if kept > 0 {
                println!("  {} debt(s) kept without a borrower", kept);
            }
        }

        BorrowerCommands::Rename { name, new_name } => {
            let borrower = service.find_borrower(&name)?;
            service.rename_borrower(borrower.id, &new_name).await?;
            println!("Renamed borrower: {} -> {}", borrower.name, new_name.trim());
        }
    }

    Ok(())
}

async fn run_debt_command(service: &mut LedgerService, cmd: DebtCommands) -> Result<()> {
    match cmd {
        DebtCommands::Add {
            name,
            amount,
            borrowers,
            split_evenly,
            tag,
            description,
            date,
            paid,
        } => {
            let amount = parse_amount(&amount).context("Invalid amount. Use '50.00' or '50'")?;

            let mut draft = DebtDraft::new(name, amount).with_paid(paid);
            if let Some(tag) = non_empty(tag) {
                draft = draft.with_tag(tag);
            }
            if let Some(description) = non_empty(description) {
                draft = draft.with_description(description);
            }
            if let Some(date_str) = date {
                draft = draft.with_date(parse_date(&date_str).with_context(|| {
                    format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                })?);
            }

            let debts = service
                .split_debt_by_names(&draft, &borrowers, split_evenly)
                .await?;

            for debt in &debts {
                println!(
                    "Recorded debt: {} {} owed by {} ({})",
                    debt.name,
                    format_currency(debt.amount),
                    service.borrower_label(debt.borrower_id),
                    debt.id
                );
            }
        }

        DebtCommands::Edit {
            id,
            name,
            amount,
            borrower,
            tag,
            description,
            date,
        } => {
            let mut debt = service.get_debt(parse_debt_id(&id)?)?;

            if let Some(name) = name {
                debt.name = name;
            }
            if let Some(amount) = amount {
                debt.amount =
                    parse_amount(&amount).context("Invalid amount. Use '50.00' or '50'")?;
            }
            if let Some(borrower) = borrower {
                debt.borrower_id = service.find_borrower(&borrower)?.id;
            }
            if let Some(tag) = tag {
                debt.tag = non_empty(Some(tag));
            }
            if let Some(description) = description {
                debt.description = non_empty(Some(description));
            }
            if let Some(date_str) = date {
                debt.date = parse_date(&date_str).with_context(|| {
                    format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                })?;
            }

            service.update_debt(debt.clone()).await?;
            println!("Updated debt: {} ({})", debt.name, debt.id);
        }

        DebtCommands::Pay { id } => {
            let debt = service.get_debt(parse_debt_id(&id)?)?;
            match service.set_paid(debt.id, true).await? {
                Some(true) => println!("Already paid: {}", debt.name),
                _ => println!("Marked as paid: {}", debt.name),
            }
        }

        DebtCommands::Toggle { id } => {
            let debt = service.get_debt(parse_debt_id(&id)?)?;
            if let Some(is_paid) = service.toggle_paid(debt.id).await? {
                let state = if is_paid { "paid" } else { "unpaid" };
                println!("{} is now {}", debt.name, state);
            }
        }

        DebtCommands::Remove { id } => {
            let debt = service.get_debt(parse_debt_id(&id)?)?;
            service.remove_debt(debt.id).await?;
            println!("Removed debt: {} ({})", debt.name, debt.id);
        }
    }

    Ok(())
}

fn run_debts_command(
    service: &LedgerService,
    month: Option<String>,
    borrower: Option<String>,
) -> Result<()> {
    let mut debts = match &borrower {
        Some(name) => service.debts_for_borrower(service.find_borrower(name)?.id),
        None => service.debts(),
    };

    if let Some(month_str) = month {
        let month: MonthKey = month_str.parse()?;
        debts.retain(|d| month.contains(d.date));
    }

    if debts.is_empty() {
        println!("No debts found.");
        return Ok(());
    }

    print_debt_header();
    for debt in &debts {
        print_debt_row(service, debt);
    }
    Ok(())
}

fn run_sections_command(service: &LedgerService, borrower: Option<String>) -> Result<()> {
    let sections = match &borrower {
        Some(name) => {
            let borrower = service.find_borrower(name)?;
            println!("{}'s debts", borrower.name);
            service.sorted_month_sections(borrower.id)
        }
        None => service.all_month_sections(),
    };

    if sections.is_empty() {
        println!("No debts found.");
        return Ok(());
    }

    for section in sections {
        println!();
        println!(
            "{} - Total: {} (Unpaid: {})",
            section.month.label(),
            format_currency(section.total()),
            format_currency(section.unpaid())
        );
        for debt in &section.debts {
            print_debt_row(service, debt);
            if let Some(tag) = &debt.tag {
                println!("    Tag: {}", tag);
            }
            if let Some(description) = &debt.description {
                println!("    {}", description);
            }
        }
    }
    Ok(())
}

fn print_debt_header() {
    println!(
        "{:<36}  {:<10}  {:<20}  {:<16}  {:>10}  {:<6}",
        "ID", "DATE", "NAME", "BORROWER", "AMOUNT", "STATUS"
    );
    println!("{}", "-".repeat(108));
}

fn print_debt_row(service: &LedgerService, debt: &Debt) {
    println!(
        "{:<36}  {:<10}  {:<20}  {:<16}  {:>10}  {:<6}",
        debt.id,
        debt.date.format("%Y-%m-%d"),
        truncate(&debt.name, 20),
        truncate(&service.borrower_label(debt.borrower_id), 16),
        format_amount(debt.amount),
        if debt.is_paid { "paid" } else { "unpaid" }
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

/// Empty optional text means "unset", as in the input forms.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_debt_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).context("Invalid debt ID format (expected UUID)")
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    use chrono::NaiveDate;

    // Parse YYYY-MM-DD format
    let naive_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")?;

    // Convert to UTC datetime at midnight
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(DateTime::from_naive_utc_and_offset(naive_datetime, Utc))
}
