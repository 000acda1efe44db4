pub mod reconcile;
pub mod summary;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// Amounts within one cent of each other count as settled.
pub const SETTLE_TOLERANCE: f64 = 0.01;

/// Round a monetary amount to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The four kinds of ledger entries money can be owed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Sale,
    Purchase,
    Expense,
    Payroll,
}

impl LedgerKind {
    pub const ALL: [LedgerKind; 4] = [
        LedgerKind::Sale,
        LedgerKind::Purchase,
        LedgerKind::Expense,
        LedgerKind::Payroll,
    ];

    /// Document number prefix (e.g., INV-2026-0001).
    pub fn prefix(&self) -> &'static str {
        match self {
            LedgerKind::Sale => "INV",
            LedgerKind::Purchase => "PUR",
            LedgerKind::Expense => "EXP",
            LedgerKind::Payroll => "PAY",
        }
    }

    /// Human-facing section label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            LedgerKind::Sale => "Sales",
            LedgerKind::Purchase => "Purchases",
            LedgerKind::Expense => "Expenses",
            LedgerKind::Payroll => "Payroll",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedgerKind::Sale => "sale",
            LedgerKind::Purchase => "purchase",
            LedgerKind::Expense => "expense",
            LedgerKind::Payroll => "payroll",
        };
        write!(f, "{name}")
    }
}

impl FromStr for LedgerKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sale" => Ok(LedgerKind::Sale),
            "purchase" => Ok(LedgerKind::Purchase),
            "expense" => Ok(LedgerKind::Expense),
            "payroll" => Ok(LedgerKind::Payroll),
            other => Err(LedgerError::UnknownKind(other.to_string())),
        }
    }
}

/// Derived settlement state of an entry. Only the reconciliation
/// engine writes this; everything else reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    /// Pending and partial entries still carry an open balance.
    pub fn is_open(&self) -> bool {
        !matches!(self, PaymentStatus::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Paid => "PAID",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PaymentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "partial" => Ok(PaymentStatus::Partial),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(LedgerError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Bank,
    Check,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Check => "check",
            PaymentMethod::Other => "other",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PaymentMethod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "bank" => Ok(PaymentMethod::Bank),
            "check" => Ok(PaymentMethod::Check),
            "other" => Ok(PaymentMethod::Other),
            other => Err(LedgerError::UnknownMethod(other.to_string())),
        }
    }
}

/// Polymorphic reference to a ledger entry, rendered as `kind:id`
/// (e.g., `sale:3`). All four kinds share one reference shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub kind: LedgerKind,
    pub id: u32,
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for EntryRef {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 {
            return Err(LedgerError::InvalidEntryRef(s.to_string()));
        }
        let kind: LedgerKind = parts[0]
            .parse()
            .map_err(|_| LedgerError::InvalidEntryRef(s.to_string()))?;
        let id: u32 = parts[1]
            .parse()
            .map_err(|_| LedgerError::InvalidEntryRef(s.to_string()))?;
        Ok(EntryRef { kind, id })
    }
}

/// One invoice, expense or payroll record carrying a total owed.
///
/// `total_amount` is fixed at creation. `paid_amount` and
/// `payment_status` are caches derived from the payment links and
/// are rewritten whenever a linked payment lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub kind: LedgerKind,
    pub id: u32,
    pub number: String,
    pub party: String,
    pub date: NaiveDate,
    pub total_amount: f64,
    #[serde(default)]
    pub paid_amount: f64,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LedgerEntry {
    pub fn entry_ref(&self) -> EntryRef {
        EntryRef {
            kind: self.kind,
            id: self.id,
        }
    }

    /// Balance still owed. Negative when an entry was overpaid;
    /// the aggregator clamps that at zero.
    pub fn remaining(&self) -> f64 {
        round2(self.total_amount) - round2(self.paid_amount)
    }
}

/// A single cash/card/bank transaction, possibly split across
/// several entries via payment links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: u32,
    pub amount: f64,
    pub method: PaymentMethod,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Applied-amount junction between one payment and one entry.
/// Immutable once written; corrections are new payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLink {
    pub payment_id: u32,
    pub kind: LedgerKind,
    pub entry_id: u32,
    pub applied_amount: f64,
}

impl PaymentLink {
    pub fn entry_ref(&self) -> EntryRef {
        EntryRef {
            kind: self.kind,
            id: self.entry_id,
        }
    }
}

/// How much of a payment goes to which entry.
#[derive(Debug, Clone, Copy)]
pub struct Allocation {
    pub entry: EntryRef,
    pub amount: f64,
}

/// Parse allocation input like "sale:3:250.00" into an [`Allocation`].
pub fn parse_allocation(input: &str) -> Result<Allocation> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() != 3 {
        return Err(LedgerError::InvalidAllocationFormat(input.to_string()));
    }

    let entry: EntryRef = format!("{}:{}", parts[0], parts[1])
        .parse()
        .map_err(|_| LedgerError::InvalidAllocationFormat(input.to_string()))?;

    let amount: f64 = parts[2]
        .parse()
        .map_err(|_| LedgerError::InvalidAllocationFormat(input.to_string()))?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(LedgerError::InvalidAllocationAmount {
            entry: entry.to_string(),
        });
    }

    Ok(Allocation { entry, amount })
}
