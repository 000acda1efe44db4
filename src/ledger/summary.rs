//! Cross-kind aggregation for the payments & dues view.

use serde::Serialize;

use super::{round2, LedgerKind, PaymentStatus};
use crate::config::store::Store;

/// Entry counts per settlement status.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub partial: usize,
    pub paid: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: PaymentStatus) {
        match status {
            PaymentStatus::Pending => self.pending += 1,
            PaymentStatus::Partial => self.partial += 1,
            PaymentStatus::Paid => self.paid += 1,
        }
    }

    /// Entries that still owe something.
    pub fn open(&self) -> usize {
        self.pending + self.partial
    }

    pub fn total(&self) -> usize {
        self.pending + self.partial + self.paid
    }
}

/// One ledger kind's slice of the dues picture.
#[derive(Debug, Clone, Serialize)]
pub struct KindSummary {
    pub kind: LedgerKind,
    pub total_amount: f64,
    pub total_paid: f64,
    pub total_due: f64,
    pub counts: StatusCounts,
}

/// Aggregate totals and counts across all four ledger kinds.
/// Computed at read time, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DueSummary {
    pub total_amount: f64,
    pub total_paid: f64,
    pub total_due: f64,
    pub open_count: usize,
    pub counts: StatusCounts,
    pub kinds: Vec<KindSummary>,
}

/// Fold every entry of every kind into a [`DueSummary`]. The due of
/// an overpaid entry is clamped at zero rather than going negative.
pub fn compute_due_summary(store: &Store) -> DueSummary {
    let mut kinds: Vec<KindSummary> = Vec::with_capacity(LedgerKind::ALL.len());

    for &kind in LedgerKind::ALL.iter() {
        let mut slice = KindSummary {
            kind,
            total_amount: 0.0,
            total_paid: 0.0,
            total_due: 0.0,
            counts: StatusCounts::default(),
        };

        for entry in store.entries.iter().filter(|e| e.kind == kind) {
            slice.total_amount += entry.total_amount;
            slice.total_paid += entry.paid_amount;
            slice.total_due += entry.remaining().max(0.0);
            slice.counts.bump(entry.payment_status);
        }

        slice.total_amount = round2(slice.total_amount);
        slice.total_paid = round2(slice.total_paid);
        slice.total_due = round2(slice.total_due);
        kinds.push(slice);
    }

    let mut counts = StatusCounts::default();
    let mut total_amount = 0.0;
    let mut total_paid = 0.0;
    let mut total_due = 0.0;
    for slice in &kinds {
        counts.pending += slice.counts.pending;
        counts.partial += slice.counts.partial;
        counts.paid += slice.counts.paid;
        total_amount += slice.total_amount;
        total_paid += slice.total_paid;
        total_due += slice.total_due;
    }

    DueSummary {
        total_amount: round2(total_amount),
        total_paid: round2(total_paid),
        total_due: round2(total_due),
        open_count: counts.open(),
        counts,
        kinds,
    }
}
