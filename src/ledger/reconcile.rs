//! The reconciliation engine: status derivation, entry creation,
//! payment recording, and full-rescan recompute.

use chrono::{Datelike, NaiveDate};

use super::{
    round2, Allocation, EntryRef, LedgerEntry, LedgerKind, Payment, PaymentLink, PaymentMethod,
    PaymentStatus, SETTLE_TOLERANCE,
};
use crate::config::store::Store;
use crate::error::{LedgerError, Result};

/// A new entry before it gets an id and a document number.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub kind: LedgerKind,
    pub party: String,
    pub total_amount: f64,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// A payment plus how it is split across entries.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub amount: f64,
    pub method: PaymentMethod,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub allocations: Vec<Allocation>,
}

/// Derive `(status, paid_amount)` from an entry's total and the sum
/// applied against it. Both sides are compared at two decimal places;
/// anything within one cent of the total counts as paid, so a
/// zero-total entry derives paid straight away.
pub fn derive_status(total_amount: f64, applied_sum: f64) -> (PaymentStatus, f64) {
    let total = round2(total_amount);
    let paid = round2(applied_sum);

    let status = if paid >= total - SETTLE_TOLERANCE {
        PaymentStatus::Paid
    } else if paid > 0.0 {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    };

    (status, paid)
}

/// Format a document number from the configured pattern.
pub fn format_doc_number(format: &str, prefix: &str, year: u32, seq: u32) -> String {
    format
        .replace("{prefix}", prefix)
        .replace("{year}", &year.to_string())
        .replace("{seq:04}", &format!("{:04}", seq))
        .replace("{seq:05}", &format!("{:05}", seq))
        .replace("{seq:03}", &format!("{:03}", seq))
}

/// Create a ledger entry. The total is fixed here for good; negative
/// or non-finite totals are rejected.
pub fn add_entry(store: &mut Store, draft: EntryDraft, number_format: &str) -> Result<EntryRef> {
    if !draft.total_amount.is_finite() || draft.total_amount < 0.0 {
        return Err(LedgerError::InvalidEntryTotal {
            entry: draft.kind.to_string(),
            amount: draft.total_amount,
        });
    }

    let year = draft.date.year() as u32;
    let counter = store.counters.kind_mut(draft.kind);
    let id = counter.last_id + 1;
    let seq = if counter.last_year == year {
        counter.last_number + 1
    } else {
        1 // Reset for new year
    };
    counter.last_id = id;
    counter.last_number = seq;
    counter.last_year = year;

    let number = format_doc_number(number_format, draft.kind.prefix(), year, seq);
    let (status, paid) = derive_status(draft.total_amount, 0.0);

    store.entries.push(LedgerEntry {
        kind: draft.kind,
        id,
        number,
        party: draft.party,
        date: draft.date,
        total_amount: draft.total_amount,
        paid_amount: paid,
        payment_status: status,
        notes: draft.notes,
    });

    Ok(EntryRef {
        kind: draft.kind,
        id,
    })
}

/// Re-derive one entry's cached `paid_amount`/`payment_status` from
/// the link table. Idempotent; touches nothing else. Returns whether
/// either cached field changed.
pub fn recompute_entry(store: &mut Store, entry_ref: EntryRef) -> Result<bool> {
    let applied = store.applied_total(entry_ref);
    let entry = store
        .find_entry_mut(entry_ref)
        .ok_or_else(|| LedgerError::EntryNotFound(entry_ref.to_string()))?;

    if !entry.total_amount.is_finite() || entry.total_amount < 0.0 {
        return Err(LedgerError::InvalidEntryTotal {
            entry: entry_ref.to_string(),
            amount: entry.total_amount,
        });
    }

    let (status, paid) = derive_status(entry.total_amount, applied);
    let changed = entry.payment_status != status || entry.paid_amount != paid;
    entry.paid_amount = paid;
    entry.payment_status = status;
    Ok(changed)
}

/// Re-derive every entry's cache, e.g. after the ledger file was
/// edited by hand. Returns how many entries changed.
pub fn recompute_all(store: &mut Store) -> Result<usize> {
    let refs: Vec<EntryRef> = store.entries.iter().map(LedgerEntry::entry_ref).collect();
    let mut changed = 0;
    for entry_ref in refs {
        if recompute_entry(store, entry_ref)? {
            changed += 1;
        }
    }
    Ok(changed)
}

/// Record one payment and apply it across the drafted allocations,
/// then recompute every affected entry.
///
/// All validation happens before any mutation: a returned error
/// leaves the store exactly as it was. An allocation may exceed an
/// entry's remaining balance (the entry just derives paid), but the
/// allocations together must not exceed the payment amount.
pub fn record_payment(store: &mut Store, draft: PaymentDraft) -> Result<u32> {
    if !draft.amount.is_finite() || draft.amount <= 0.0 {
        return Err(LedgerError::InvalidPaymentAmount);
    }
    if draft.allocations.is_empty() {
        return Err(LedgerError::NoAllocations);
    }

    for alloc in &draft.allocations {
        if !alloc.amount.is_finite() || alloc.amount <= 0.0 {
            return Err(LedgerError::InvalidAllocationAmount {
                entry: alloc.entry.to_string(),
            });
        }
        let entry = store
            .find_entry(alloc.entry)
            .ok_or_else(|| LedgerError::EntryNotFound(alloc.entry.to_string()))?;
        if !entry.total_amount.is_finite() || entry.total_amount < 0.0 {
            return Err(LedgerError::InvalidEntryTotal {
                entry: alloc.entry.to_string(),
                amount: entry.total_amount,
            });
        }
    }

    let allocated: f64 = draft.allocations.iter().map(|a| a.amount).sum();
    if round2(allocated) > round2(draft.amount) + SETTLE_TOLERANCE {
        return Err(LedgerError::OverAllocation {
            amount: draft.amount,
            allocated: round2(allocated),
        });
    }

    // Validation complete; nothing below can fail for validated input.
    let payment_id = store.counters.last_payment + 1;
    store.counters.last_payment = payment_id;
    store.payments.push(Payment {
        id: payment_id,
        amount: draft.amount,
        method: draft.method,
        date: draft.date,
        notes: draft.notes,
        created_by: draft.created_by,
    });

    let mut affected: Vec<EntryRef> = Vec::new();
    for alloc in &draft.allocations {
        store.links.push(PaymentLink {
            payment_id,
            kind: alloc.entry.kind,
            entry_id: alloc.entry.id,
            applied_amount: alloc.amount,
        });
        if !affected.contains(&alloc.entry) {
            affected.push(alloc.entry);
        }
    }

    for entry_ref in affected {
        recompute_entry(store, entry_ref)?;
    }

    Ok(payment_id)
}
