use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::ledger::{EntryRef, LedgerEntry, LedgerKind, Payment, PaymentLink};

/// The whole persisted ledger: entries of all four kinds, payments,
/// and the links tying payments to entries. Loaded and saved as one
/// TOML document; `revision` backs the optimistic commit check.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Store {
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub counters: Counters,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default)]
    pub links: Vec<PaymentLink>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Counters {
    #[serde(default)]
    pub sale: KindCounter,
    #[serde(default)]
    pub purchase: KindCounter,
    #[serde(default)]
    pub expense: KindCounter,
    #[serde(default)]
    pub payroll: KindCounter,
    /// Last payment id handed out.
    #[serde(default)]
    pub last_payment: u32,
}

impl Counters {
    pub fn kind(&self, kind: LedgerKind) -> &KindCounter {
        match kind {
            LedgerKind::Sale => &self.sale,
            LedgerKind::Purchase => &self.purchase,
            LedgerKind::Expense => &self.expense,
            LedgerKind::Payroll => &self.payroll,
        }
    }

    pub fn kind_mut(&mut self, kind: LedgerKind) -> &mut KindCounter {
        match kind {
            LedgerKind::Sale => &mut self.sale,
            LedgerKind::Purchase => &mut self.purchase,
            LedgerKind::Expense => &mut self.expense,
            LedgerKind::Payroll => &mut self.payroll,
        }
    }
}

/// Per-kind id and document-number state. Ids never reset; the
/// document sequence restarts each calendar year.
#[derive(Debug, Deserialize, Serialize)]
pub struct KindCounter {
    pub last_id: u32,
    pub last_number: u32,
    pub last_year: u32,
}

impl Default for KindCounter {
    fn default() -> Self {
        Self {
            last_id: 0,
            last_number: 0,
            last_year: chrono::Utc::now().year() as u32,
        }
    }
}

impl Store {
    pub fn find_entry(&self, entry_ref: EntryRef) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .find(|e| e.kind == entry_ref.kind && e.id == entry_ref.id)
    }

    pub fn find_entry_mut(&mut self, entry_ref: EntryRef) -> Option<&mut LedgerEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.kind == entry_ref.kind && e.id == entry_ref.id)
    }

    pub fn find_payment(&self, id: u32) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == id)
    }

    pub fn links_for(&self, entry_ref: EntryRef) -> Vec<&PaymentLink> {
        self.links
            .iter()
            .filter(|l| l.entry_ref() == entry_ref)
            .collect()
    }

    /// Sum of all amounts applied against an entry.
    pub fn applied_total(&self, entry_ref: EntryRef) -> f64 {
        self.links
            .iter()
            .filter(|l| l.entry_ref() == entry_ref)
            .map(|l| l.applied_amount)
            .sum()
    }

    /// Sum of a payment's allocations (may be below its amount when
    /// part of the payment was left unapplied).
    pub fn allocated_of_payment(&self, payment_id: u32) -> f64 {
        self.links
            .iter()
            .filter(|l| l.payment_id == payment_id)
            .map(|l| l.applied_amount)
            .sum()
    }
}
