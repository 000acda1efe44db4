pub mod config;
pub mod error;
pub mod ledger;

pub use config::store::Store;
pub use config::{Company, Config, LedgerSettings};
pub use error::{LedgerError, Result};
pub use ledger::reconcile::{
    add_entry, derive_status, record_payment, recompute_all, recompute_entry, EntryDraft,
    PaymentDraft,
};
pub use ledger::summary::{compute_due_summary, DueSummary};
pub use ledger::{
    parse_allocation, Allocation, EntryRef, LedgerEntry, LedgerKind, Payment, PaymentLink,
    PaymentMethod, PaymentStatus,
};
