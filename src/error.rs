use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Config directory not found at {0}. Run 'duebook init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Unknown ledger kind '{0}'. Use sale, purchase, expense or payroll.")]
    UnknownKind(String),

    #[error("Unknown payment method '{0}'. Use cash, card, bank, check or other.")]
    UnknownMethod(String),

    #[error("Unknown payment status '{0}'. Use pending, partial or paid.")]
    UnknownStatus(String),

    #[error("Invalid entry reference '{0}'. Expected 'kind:id' (e.g., 'sale:3')")]
    InvalidEntryRef(String),

    #[error("Entry {0} not found in ledger")]
    EntryNotFound(String),

    #[error("Invalid total {amount:.2} for {entry}: must be zero or positive")]
    InvalidEntryTotal { entry: String, amount: f64 },

    #[error("Invalid allocation '{0}'. Expected 'kind:id:amount' (e.g., 'sale:3:250.00')")]
    InvalidAllocationFormat(String),

    #[error("Applied amount for {entry} must be greater than zero")]
    InvalidAllocationAmount { entry: String },

    #[error("Allocations total {allocated:.2} exceeds payment amount {amount:.2}")]
    OverAllocation { amount: f64, allocated: f64 },

    #[error("Payment amount must be greater than zero")]
    InvalidPaymentAmount,

    #[error("Payment has no allocations. Use --to kind:id:amount to apply it.")]
    NoAllocations,

    #[error("Ledger was modified by another process (loaded revision {expected}, found {found}). Retry the operation.")]
    ConcurrentUpdate { expected: u64, found: u64 },

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
