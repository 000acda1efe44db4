mod config;
mod error;
mod ledger;

use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use crate::config::store::Store;
use crate::config::{
    commit_store, config_dir, load_config, load_store, CONFIG_TEMPLATE,
};
use crate::error::{LedgerError, Result};
use crate::ledger::reconcile::{
    add_entry, format_doc_number, record_payment, recompute_all, EntryDraft, PaymentDraft,
};
use crate::ledger::summary::compute_due_summary;
use crate::ledger::{
    parse_allocation, Allocation, EntryRef, LedgerEntry, LedgerKind, PaymentMethod, PaymentStatus,
};

#[derive(Parser)]
#[command(name = "duebook")]
#[command(version, about = "Small-business ledger and payment reconciliation CLI", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.duebook or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// Add a ledger entry
    Add {
        /// Entry kind: sale, purchase, expense or payroll
        kind: String,

        /// Customer, supplier, expense category or employee
        #[arg(short, long)]
        party: String,

        /// Total amount owed (fixed at creation)
        #[arg(short, long, allow_negative_numbers = true)]
        total: f64,

        /// Entry date (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Free-form note
        #[arg(long)]
        notes: Option<String>,
    },

    /// List ledger entries
    List {
        /// Filter by kind (sale, purchase, expense, payroll)
        #[arg(short, long)]
        kind: Option<String>,

        /// Filter by status (pending, partial, paid)
        #[arg(short, long)]
        status: Option<String>,

        /// Number of entries to show (default: all)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Emit the entries as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Record a payment and apply it to one or more entries
    Pay {
        /// Payment amount
        #[arg(short, long, allow_negative_numbers = true)]
        amount: f64,

        /// Payment method: cash, card, bank, check or other
        #[arg(short, long, default_value = "cash")]
        method: String,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Free-form note
        #[arg(long)]
        notes: Option<String>,

        /// Who recorded the payment
        #[arg(long)]
        by: Option<String>,

        /// Allocations in format "kind:id:amount" (can be repeated)
        #[arg(short = 't', long = "to", value_name = "KIND:ID:AMOUNT")]
        to: Vec<String>,
    },

    /// Show payments, all of them or those applied to one entry
    Payments {
        /// Entry reference like sale:3 (default: all payments)
        entry: Option<String>,
    },

    /// Show the payments & dues summary across all entry kinds
    Dues {
        /// Emit the summary as JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Re-derive every entry's cached payment status from its links
    Recompute,

    /// Show config, counters and next document numbers
    Status,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Add {
            kind,
            party,
            total,
            date,
            notes,
        } => cmd_add(&cfg_dir, &kind, &party, total, date, notes),
        Commands::List {
            kind,
            status,
            limit,
            json,
        } => cmd_list(&cfg_dir, kind, status, limit, json),
        Commands::Pay {
            amount,
            method,
            date,
            notes,
            by,
            to,
        } => cmd_pay(&cfg_dir, amount, &method, date, notes, by, &to),
        Commands::Payments { entry } => cmd_payments(&cfg_dir, entry),
        Commands::Dues { json } => cmd_dues(&cfg_dir, json),
        Commands::Recompute => cmd_recompute(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &PathBuf) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(LedgerError::AlreadyInitialized(cfg_dir.clone()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    // Seed an empty ledger so the first real commit has a revision to check
    let mut store = Store::default();
    commit_store(cfg_dir, &mut store)?;

    println!("Initialized duebook config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your company details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Add your first entry:       duebook add sale --party <name> --total <amount>");
    println!("  3. Record a payment:           duebook pay --amount <amount> --to sale:1:<amount>");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "REF")]
    reference: String,
    #[tabled(rename = "NUMBER")]
    number: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "PARTY")]
    party: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "PAID")]
    paid: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

#[derive(Tabled)]
struct PaymentRow {
    #[tabled(rename = "#")]
    id: u32,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "METHOD")]
    method: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
    #[tabled(rename = "APPLIED")]
    applied: String,
}

#[derive(Tabled)]
struct AppliedRow {
    #[tabled(rename = "#")]
    id: u32,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "METHOD")]
    method: String,
    #[tabled(rename = "APPLIED")]
    applied: String,
}

#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "PAID")]
    paid: String,
    #[tabled(rename = "DUE")]
    due: String,
    #[tabled(rename = "# PENDING")]
    pending: usize,
    #[tabled(rename = "# PARTIAL")]
    partial: usize,
    #[tabled(rename = "# PAID")]
    paid_count: usize,
}

fn format_whole_money(value: f64, currency_symbol: &str) -> String {
    let rounded = value.round() as i64;
    let grouped = format_grouped_int(rounded);
    format!("{}{:>6}", currency_symbol, grouped)
}

fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

/// Format a money amount with two decimal places and thousands separators
fn format_amount(value: f64) -> String {
    let rounded = format!("{:.2}", value);
    let parts: Vec<&str> = rounded.split('.').collect();
    let whole = parts[0];
    let frac = parts[1];

    // Group digits in the whole part
    let negative = whole.starts_with('-');
    let digits = if negative { &whole[1..] } else { whole };
    let grouped = format_grouped_int(digits.parse::<i64>().unwrap_or(0));

    if negative {
        format!("-{}.{}", grouped, frac)
    } else {
        format!("{}.{}", grouped, frac)
    }
}

fn add_financial_footer(table: &str, total: &str, paid: &str, outstanding: &str) -> String {
    let lines: Vec<&str> = table.lines().collect();
    if lines.len() < 4 {
        return table.to_string();
    }

    // Parse the top border to discover column widths
    let top = lines[0];
    let Some(inner) = top.strip_prefix('╭').and_then(|s| s.strip_suffix('╮')) else {
        return table.to_string();
    };

    let widths: Vec<usize> = inner.split('┬').map(|p| p.chars().count()).collect();
    if widths.len() < 8 {
        return table.to_string();
    }

    // Merge REF, NUMBER, DATE, PARTY into one label cell; keep the TOTAL
    // column; drop PAID, DUE and STATUS
    let left_width = widths[0] + widths[1] + widths[2] + widths[3] + 3;
    let total_width = widths[4];

    let rows = [
        ("TOTAL", total),
        ("(-) PAID", paid),
        ("(=) OUTSTANDING", outstanding),
    ];

    // Strip the original bottom border and start building
    let mut out = lines[..lines.len() - 1].join("\n");
    out.push('\n');

    // First separator: merge left 4 columns, keep TOTAL, close off the rest
    out.push_str(&format!(
        "├{}┴{}┴{}┴{}┼{}┼{}┴{}┴{}╯\n",
        "─".repeat(widths[0]),
        "─".repeat(widths[1]),
        "─".repeat(widths[2]),
        "─".repeat(widths[3]),
        "─".repeat(total_width),
        "─".repeat(widths[5]),
        "─".repeat(widths[6]),
        "─".repeat(widths[7]),
    ));

    // Summary rows with separators between them
    for (idx, (label, value)) in rows.iter().enumerate() {
        out.push_str(&format!(
            "│ {:>left$} │ {:>total$} │\n",
            label,
            value,
            left = left_width - 2,
            total = total_width - 2
        ));
        if idx < rows.len() - 1 {
            out.push_str(&format!(
                "├{}┼{}┤\n",
                "─".repeat(left_width),
                "─".repeat(total_width)
            ));
        }
    }

    // Bottom border
    out.push_str(&format!(
        "╰{}┴{}╯",
        "─".repeat(left_width),
        "─".repeat(total_width)
    ));

    out
}

/// Fetch an exchange rate from the Frankfurter API. Returns None on
/// any failure (network, timeout, parse error) so the caller can
/// silently skip the converted line.
fn fetch_rate(base: &str, quote: &str) -> Option<f64> {
    use std::time::Duration;
    use ureq::Agent;

    let agent: Agent = Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(3)))
        .build()
        .into();

    let url = format!("https://api.frankfurter.dev/v1/latest?base={base}&symbols={quote}");
    let body: String = agent
        .get(&url)
        .call()
        .ok()?
        .body_mut()
        .read_to_string()
        .ok()?;

    let json: serde_json::Value = serde_json::from_str(&body).ok()?;
    json["rates"][quote].as_f64()
}

/// Parse a --date argument, defaulting to today
fn parse_date(input: Option<String>) -> Result<NaiveDate> {
    match input {
        Some(s) => {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| LedgerError::InvalidDate(s))
        }
        None => Ok(chrono::Local::now().date_naive()),
    }
}

/// Add a ledger entry
fn cmd_add(
    cfg_dir: &PathBuf,
    kind: &str,
    party: &str,
    total: f64,
    date: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.clone()));
    }

    let kind: LedgerKind = kind.parse()?;
    let date = parse_date(date)?;
    let config = load_config(cfg_dir)?;
    let mut store = load_store(cfg_dir)?;

    let entry_ref = add_entry(
        &mut store,
        EntryDraft {
            kind,
            party: party.to_string(),
            total_amount: total,
            date,
            notes,
        },
        &config.ledger.number_format,
    )?;

    commit_store(cfg_dir, &mut store)?;

    if let Some(entry) = store.find_entry(entry_ref) {
        println!("Added {} ({})", entry_ref, entry.number);
        println!("  Party:  {}", entry.party);
        println!("  Date:   {}", entry.date);
        println!(
            "  Total:  {}{}",
            config.ledger.currency_symbol,
            format_amount(entry.total_amount)
        );
        println!("  Status: {}", entry.payment_status);
    }

    Ok(())
}

/// List ledger entries with derived three-way status
fn cmd_list(
    cfg_dir: &PathBuf,
    kind: Option<String>,
    status: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let store = load_store(cfg_dir)?;

    let kind_filter: Option<LedgerKind> = kind.map(|s| s.parse()).transpose()?;
    let status_filter: Option<PaymentStatus> = status.map(|s| s.parse()).transpose()?;

    // Newest first
    let mut shown: Vec<&LedgerEntry> = store
        .entries
        .iter()
        .rev()
        .filter(|e| kind_filter.map_or(true, |k| e.kind == k))
        .filter(|e| status_filter.map_or(true, |s| e.payment_status == s))
        .collect();
    if let Some(n) = limit {
        shown.truncate(n);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&shown).map_err(json_err)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!("No matching entries.");
        return Ok(());
    }

    let rows: Vec<EntryRow> = shown
        .iter()
        .map(|e| EntryRow {
            reference: e.entry_ref().to_string(),
            number: e.number.clone(),
            date: e.date.to_string(),
            party: e.party.clone(),
            total: format_whole_money(e.total_amount, &config.ledger.currency_symbol),
            paid: format_whole_money(e.paid_amount, &config.ledger.currency_symbol),
            due: format_whole_money(e.remaining().max(0.0), &config.ledger.currency_symbol),
            status: e.payment_status.to_string(),
        })
        .collect();

    // Financial summary covers the shown entries
    let shown_total: f64 = shown.iter().map(|e| e.total_amount).sum();
    let shown_paid: f64 = shown.iter().map(|e| e.paid_amount).sum();
    let shown_outstanding: f64 = shown_total - shown_paid;

    let table = Table::new(rows).with(Style::rounded()).to_string();
    let total_amount = format_whole_money(shown_total, &config.ledger.currency_symbol);
    let paid_amount = format_whole_money(shown_paid, &config.ledger.currency_symbol);
    let outstanding_amount =
        format_whole_money(shown_outstanding, &config.ledger.currency_symbol);
    let table = add_financial_footer(&table, &total_amount, &paid_amount, &outstanding_amount);

    println!("{table}");

    println!();
    println!("Total: {} of {} entries", shown.len(), store.entries.len());
    println!("Use the REF column with pay/payments (e.g., 'duebook payments sale:1')");

    Ok(())
}

/// Record a payment against one or more entries
fn cmd_pay(
    cfg_dir: &PathBuf,
    amount: f64,
    method: &str,
    date: Option<String>,
    notes: Option<String>,
    by: Option<String>,
    to: &[String],
) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.clone()));
    }

    let method: PaymentMethod = method.parse()?;
    let date = parse_date(date)?;
    let allocations: Vec<Allocation> = to
        .iter()
        .map(|s| parse_allocation(s))
        .collect::<Result<_>>()?;

    let config = load_config(cfg_dir)?;
    let mut store = load_store(cfg_dir)?;

    let payment_id = record_payment(
        &mut store,
        PaymentDraft {
            amount,
            method,
            date,
            notes,
            created_by: by,
            allocations: allocations.clone(),
        },
    )?;

    commit_store(cfg_dir, &mut store)?;

    let symbol = &config.ledger.currency_symbol;
    println!(
        "Recorded {}{} payment #{} ({})",
        symbol,
        format_amount(amount),
        payment_id,
        method
    );
    for alloc in &allocations {
        if let Some(entry) = store.find_entry(alloc.entry) {
            if entry.payment_status == PaymentStatus::Paid {
                println!(
                    "  {} ({}): {}{} applied (fully paid)",
                    alloc.entry,
                    entry.number,
                    symbol,
                    format_amount(alloc.amount)
                );
            } else {
                println!(
                    "  {} ({}): {}{} applied ({}{} remaining)",
                    alloc.entry,
                    entry.number,
                    symbol,
                    format_amount(alloc.amount),
                    symbol,
                    format_amount(entry.remaining())
                );
            }
        }
    }

    Ok(())
}

/// Show payment history, for one entry or the whole ledger
fn cmd_payments(cfg_dir: &PathBuf, entry: Option<String>) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let store = load_store(cfg_dir)?;
    let symbol = &config.ledger.currency_symbol;

    if let Some(reference) = entry {
        let entry_ref: EntryRef = reference.parse()?;
        let entry = store
            .find_entry(entry_ref)
            .ok_or_else(|| LedgerError::EntryNotFound(entry_ref.to_string()))?;

        println!("Payments for {} ({})", entry_ref, entry.number);

        let links = store.links_for(entry_ref);
        if links.is_empty() {
            println!("  No payments recorded.");
        } else {
            let rows: Vec<AppliedRow> = links
                .iter()
                .map(|link| {
                    let payment = store.find_payment(link.payment_id);
                    AppliedRow {
                        id: link.payment_id,
                        date: payment.map_or(String::from("-"), |p| p.date.to_string()),
                        method: payment.map_or(String::from("-"), |p| p.method.to_string()),
                        applied: format!("{}{}", symbol, format_amount(link.applied_amount)),
                    }
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
        }

        println!(
            "Total paid: {}{} / {}{} (Status: {})",
            symbol,
            format_amount(entry.paid_amount),
            symbol,
            format_amount(entry.total_amount),
            entry.payment_status
        );

        return Ok(());
    }

    if store.payments.is_empty() {
        println!("No payments recorded yet.");
        return Ok(());
    }

    let rows: Vec<PaymentRow> = store
        .payments
        .iter()
        .rev()
        .map(|p| PaymentRow {
            id: p.id,
            date: p.date.to_string(),
            method: p.method.to_string(),
            amount: format!("{}{}", symbol, format_amount(p.amount)),
            applied: format!(
                "{}{}",
                symbol,
                format_amount(store.allocated_of_payment(p.id))
            ),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    println!();
    println!("Total: {} payments", store.payments.len());

    Ok(())
}

/// Show the payments & dues summary
fn cmd_dues(cfg_dir: &PathBuf, json: bool) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let store = load_store(cfg_dir)?;
    let summary = compute_due_summary(&store);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).map_err(json_err)?
        );
        return Ok(());
    }

    let symbol = &config.ledger.currency_symbol;

    println!("Payments & Dues");
    println!("{}", "-".repeat(50));

    let rows: Vec<KindRow> = summary
        .kinds
        .iter()
        .map(|k| KindRow {
            kind: k.kind.label().to_string(),
            total: format_whole_money(k.total_amount, symbol),
            paid: format_whole_money(k.total_paid, symbol),
            due: format_whole_money(k.total_due, symbol),
            pending: k.counts.pending,
            partial: k.counts.partial,
            paid_count: k.counts.paid,
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    println!();
    println!("Total amount: {}{}", symbol, format_amount(summary.total_amount));
    println!("Total paid:   {}{}", symbol, format_amount(summary.total_paid));
    println!("Total due:    {}{}", symbol, format_amount(summary.total_due));
    println!(
        "Open entries: {} ({} pending, {} partial)",
        summary.open_count, summary.counts.pending, summary.counts.partial
    );

    // Show the due total converted if a report currency is configured
    if summary.total_due > 0.0 {
        if let Some(quote) = &config.ledger.report_currency {
            if let Some(rate) = fetch_rate(&config.ledger.currency, quote) {
                println!(
                    "Total due in {}: {} (1 {} = {:.4} {})",
                    quote,
                    format_amount(summary.total_due * rate),
                    config.ledger.currency,
                    rate,
                    quote
                );
            }
        }
    }

    Ok(())
}

/// Re-derive every entry's cached status from the link table
fn cmd_recompute(cfg_dir: &PathBuf) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.clone()));
    }

    let mut store = load_store(cfg_dir)?;
    let changed = recompute_all(&mut store)?;

    if changed == 0 {
        println!("All {} entries already consistent.", store.entries.len());
        return Ok(());
    }

    commit_store(cfg_dir, &mut store)?;
    println!(
        "Recomputed {} entries ({} updated)",
        store.entries.len(),
        changed
    );

    Ok(())
}

/// Show ledger status
fn cmd_status(cfg_dir: &PathBuf) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(LedgerError::ConfigNotFound(cfg_dir.clone()));
    }

    let config = load_config(cfg_dir)?;
    let store = load_store(cfg_dir)?;

    let current_year = chrono::Utc::now().year() as u32;
    let next_numbers: Vec<String> = LedgerKind::ALL
        .iter()
        .map(|&kind| {
            let counter = store.counters.kind(kind);
            let seq = if counter.last_year == current_year {
                counter.last_number + 1
            } else {
                1 // Reset for new year
            };
            format_doc_number(
                &config.ledger.number_format,
                kind.prefix(),
                current_year,
                seq,
            )
        })
        .collect();

    let entry_counts: Vec<String> = LedgerKind::ALL
        .iter()
        .map(|&kind| {
            let count = store.entries.iter().filter(|e| e.kind == kind).count();
            format!("{} {}", count, kind.label().to_lowercase())
        })
        .collect();

    println!("Ledger Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Company:          {}", config.company.name);
    println!("Currency:         {}", config.ledger.currency);
    println!("Entries:          {}", entry_counts.join(", "));
    println!("Payments:         {}", store.payments.len());
    println!("Next numbers:     {}", next_numbers.join(", "));

    if !store.entries.is_empty() {
        println!();
        println!("Recent entries:");
        for entry in store.entries.iter().rev().take(5) {
            println!(
                "  {} - {} - {} - {}{}",
                entry.entry_ref(),
                entry.number,
                entry.party,
                config.ledger.currency_symbol,
                format_amount(entry.total_amount)
            );
        }
    }

    Ok(())
}

fn json_err(e: serde_json::Error) -> LedgerError {
    LedgerError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        e.to_string(),
    ))
}
