use chrono::NaiveDate;
use duebook::config::{commit_store, load_store};
use duebook::{
    add_entry, compute_due_summary, record_payment, recompute_all, recompute_entry, Allocation,
    EntryDraft, EntryRef, LedgerError, LedgerKind, PaymentDraft, PaymentMethod, PaymentStatus,
    Store,
};
use tempfile::TempDir;

const NUMBER_FORMAT: &str = "{prefix}-{year}-{seq:04}";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn add(store: &mut Store, kind: LedgerKind, party: &str, total: f64) -> EntryRef {
    add_entry(
        store,
        EntryDraft {
            kind,
            party: party.to_string(),
            total_amount: total,
            date: date("2026-01-10"),
            notes: None,
        },
        NUMBER_FORMAT,
    )
    .unwrap()
}

fn pay(
    store: &mut Store,
    amount: f64,
    allocations: &[(EntryRef, f64)],
) -> duebook::Result<u32> {
    record_payment(
        store,
        PaymentDraft {
            amount,
            method: PaymentMethod::Cash,
            date: date("2026-01-15"),
            notes: None,
            created_by: None,
            allocations: allocations
                .iter()
                .map(|&(entry, amount)| Allocation { entry, amount })
                .collect(),
        },
    )
}

fn state_of(store: &Store, entry_ref: EntryRef) -> (PaymentStatus, f64) {
    let entry = store.find_entry(entry_ref).unwrap();
    (entry.payment_status, entry.paid_amount)
}

#[test]
fn new_entry_starts_pending() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);

    assert_eq!(state_of(&store, sale), (PaymentStatus::Pending, 0.0));
    assert_eq!(store.find_entry(sale).unwrap().number, "INV-2026-0001");
}

#[test]
fn ids_and_numbers_advance_per_kind() {
    let mut store = Store::default();
    let first = add(&mut store, LedgerKind::Sale, "Amal Trading", 100.0);
    let second = add(&mut store, LedgerKind::Sale, "Noor Trading", 200.0);
    let purchase = add(&mut store, LedgerKind::Purchase, "Imdad Supplies", 300.0);

    assert_eq!(first.to_string(), "sale:1");
    assert_eq!(second.to_string(), "sale:2");
    assert_eq!(purchase.to_string(), "purchase:1");
    assert_eq!(store.find_entry(second).unwrap().number, "INV-2026-0002");
    assert_eq!(store.find_entry(purchase).unwrap().number, "PUR-2026-0001");
}

#[test]
fn partial_then_paid() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);

    pay(&mut store, 400.0, &[(sale, 400.0)]).unwrap();
    assert_eq!(state_of(&store, sale), (PaymentStatus::Partial, 400.0));

    pay(&mut store, 600.0, &[(sale, 600.0)]).unwrap();
    assert_eq!(state_of(&store, sale), (PaymentStatus::Paid, 1000.0));
}

#[test]
fn split_payment_settles_one_and_partially_covers_another() {
    let mut store = Store::default();
    let small = add(&mut store, LedgerKind::Sale, "Cash Customer", 30.0);
    let large = add(&mut store, LedgerKind::Purchase, "Imdad Supplies", 100.0);

    pay(&mut store, 50.0, &[(small, 30.0), (large, 20.0)]).unwrap();

    assert_eq!(state_of(&store, small), (PaymentStatus::Paid, 30.0));
    assert_eq!(state_of(&store, large), (PaymentStatus::Partial, 20.0));
}

#[test]
fn paid_within_one_cent_tolerance() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);

    pay(&mut store, 999.99, &[(sale, 999.99)]).unwrap();
    assert_eq!(store.find_entry(sale).unwrap().payment_status, PaymentStatus::Paid);
}

#[test]
fn zero_total_entry_is_paid_immediately() {
    let mut store = Store::default();
    let payroll = add(&mut store, LedgerKind::Payroll, "Unpaid Intern", 0.0);

    assert_eq!(state_of(&store, payroll), (PaymentStatus::Paid, 0.0));
}

#[test]
fn negative_total_is_rejected() {
    let mut store = Store::default();
    let result = add_entry(
        &mut store,
        EntryDraft {
            kind: LedgerKind::Expense,
            party: "Maintenance".to_string(),
            total_amount: -50.0,
            date: date("2026-01-10"),
            notes: None,
        },
        NUMBER_FORMAT,
    );

    assert!(matches!(result, Err(LedgerError::InvalidEntryTotal { .. })));
    assert!(store.entries.is_empty());
}

#[test]
fn over_allocation_is_rejected_atomically() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);
    pay(&mut store, 100.0, &[(sale, 100.0)]).unwrap();

    // 150 allocated from a 100 payment
    let err = pay(&mut store, 100.0, &[(sale, 150.0)]).unwrap_err();
    assert!(matches!(err, LedgerError::OverAllocation { .. }));

    // Nothing moved: no payment, no link, no status change
    assert_eq!(store.payments.len(), 1);
    assert_eq!(store.links.len(), 1);
    assert_eq!(store.counters.last_payment, 1);
    assert_eq!(state_of(&store, sale), (PaymentStatus::Partial, 100.0));
}

#[test]
fn over_allocation_across_entries_is_rejected() {
    let mut store = Store::default();
    let a = add(&mut store, LedgerKind::Sale, "Amal Trading", 100.0);
    let b = add(&mut store, LedgerKind::Expense, "Transport", 100.0);

    let err = pay(&mut store, 100.0, &[(a, 60.0), (b, 60.0)]).unwrap_err();
    assert!(matches!(err, LedgerError::OverAllocation { .. }));
    assert_eq!(state_of(&store, a), (PaymentStatus::Pending, 0.0));
    assert_eq!(state_of(&store, b), (PaymentStatus::Pending, 0.0));
}

#[test]
fn unknown_entry_is_rejected_atomically() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 100.0);
    let ghost = EntryRef {
        kind: LedgerKind::Payroll,
        id: 99,
    };

    let err = pay(&mut store, 100.0, &[(sale, 40.0), (ghost, 40.0)]).unwrap_err();
    assert!(matches!(err, LedgerError::EntryNotFound(_)));
    assert!(store.payments.is_empty());
    assert!(store.links.is_empty());
    assert_eq!(state_of(&store, sale), (PaymentStatus::Pending, 0.0));
}

#[test]
fn payment_and_allocation_amounts_must_be_positive() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 100.0);

    assert!(matches!(
        pay(&mut store, 0.0, &[(sale, 10.0)]),
        Err(LedgerError::InvalidPaymentAmount)
    ));
    assert!(matches!(
        pay(&mut store, -20.0, &[(sale, 10.0)]),
        Err(LedgerError::InvalidPaymentAmount)
    ));
    assert!(matches!(
        pay(&mut store, 20.0, &[(sale, 0.0)]),
        Err(LedgerError::InvalidAllocationAmount { .. })
    ));
    assert!(matches!(
        pay(&mut store, 20.0, &[]),
        Err(LedgerError::NoAllocations)
    ));
    assert!(store.payments.is_empty());
}

#[test]
fn overpaying_one_entry_is_allowed_and_due_clamps_at_zero() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 100.0);

    pay(&mut store, 120.0, &[(sale, 120.0)]).unwrap();
    assert_eq!(state_of(&store, sale), (PaymentStatus::Paid, 120.0));

    let summary = compute_due_summary(&store);
    assert_eq!(summary.total_amount, 100.0);
    assert_eq!(summary.total_paid, 120.0);
    assert_eq!(summary.total_due, 0.0);
}

#[test]
fn duplicate_refs_in_one_payment_accumulate() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 100.0);

    pay(&mut store, 100.0, &[(sale, 50.0), (sale, 50.0)]).unwrap();

    assert_eq!(store.links.len(), 2);
    assert_eq!(state_of(&store, sale), (PaymentStatus::Paid, 100.0));
}

#[test]
fn recompute_is_idempotent() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);
    pay(&mut store, 400.0, &[(sale, 400.0)]).unwrap();

    // First recompute after the payment already ran; nothing changes
    assert!(!recompute_entry(&mut store, sale).unwrap());
    let first = state_of(&store, sale);
    assert!(!recompute_entry(&mut store, sale).unwrap());
    assert_eq!(state_of(&store, sale), first);
}

#[test]
fn paid_amount_is_monotonic_across_payments() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 500.0);

    let mut last_paid = 0.0;
    for amount in [120.0, 80.0, 150.0, 150.0] {
        pay(&mut store, amount, &[(sale, amount)]).unwrap();
        let (_, paid) = state_of(&store, sale);
        assert!(paid >= last_paid);
        last_paid = paid;
    }
    assert_eq!(state_of(&store, sale), (PaymentStatus::Paid, 500.0));
}

#[test]
fn cached_paid_amounts_reconcile_with_links() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);
    let purchase = add(&mut store, LedgerKind::Purchase, "Imdad Supplies", 400.0);
    let payroll = add(&mut store, LedgerKind::Payroll, "Ahmed Ali", 5000.0);

    pay(&mut store, 700.0, &[(sale, 500.0), (purchase, 200.0)]).unwrap();
    pay(&mut store, 2500.0, &[(payroll, 2500.0)]).unwrap();
    pay(&mut store, 300.0, &[(sale, 100.0), (purchase, 200.0)]).unwrap();

    let cached: f64 = store.entries.iter().map(|e| e.paid_amount).sum();
    let applied: f64 = store.links.iter().map(|l| l.applied_amount).sum();
    assert!((cached - applied).abs() < 0.005);
}

#[test]
fn payment_ids_are_sequential() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);

    let first = pay(&mut store, 100.0, &[(sale, 100.0)]).unwrap();
    let second = pay(&mut store, 100.0, &[(sale, 100.0)]).unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert!(store.find_payment(2).is_some());
}

#[test]
fn due_summary_counts_and_totals_per_kind() {
    let mut store = Store::default();
    let a = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);
    let b = add(&mut store, LedgerKind::Sale, "Cash Customer", 30.0);
    let c = add(&mut store, LedgerKind::Purchase, "Imdad Supplies", 100.0);
    add(&mut store, LedgerKind::Expense, "Maintenance", 200.0);
    add(&mut store, LedgerKind::Payroll, "Unpaid Intern", 0.0);

    pay(&mut store, 400.0, &[(a, 400.0)]).unwrap();
    pay(&mut store, 50.0, &[(b, 30.0), (c, 20.0)]).unwrap();

    let summary = compute_due_summary(&store);
    assert_eq!(summary.total_amount, 1330.0);
    assert_eq!(summary.total_paid, 450.0);
    assert_eq!(summary.total_due, 880.0);
    assert_eq!(summary.open_count, 3);
    assert_eq!(summary.counts.pending, 1);
    assert_eq!(summary.counts.partial, 2);
    assert_eq!(summary.counts.paid, 2);

    let sales = &summary.kinds[0];
    assert_eq!(sales.total_amount, 1030.0);
    assert_eq!(sales.total_paid, 430.0);
    assert_eq!(sales.total_due, 600.0);
    assert_eq!(sales.counts.partial, 1);
    assert_eq!(sales.counts.paid, 1);

    let payroll = &summary.kinds[3];
    assert_eq!(payroll.total_amount, 0.0);
    assert_eq!(payroll.counts.paid, 1);
}

#[test]
fn recompute_all_repairs_drifted_caches() {
    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);
    pay(&mut store, 400.0, &[(sale, 400.0)]).unwrap();

    // Drift the cache the way a hand-edited file would
    {
        let entry = store.find_entry_mut(sale).unwrap();
        entry.paid_amount = 0.0;
        entry.payment_status = PaymentStatus::Pending;
    }

    let changed = recompute_all(&mut store).unwrap();
    assert_eq!(changed, 1);
    assert_eq!(state_of(&store, sale), (PaymentStatus::Partial, 400.0));

    // Second pass finds nothing to do
    assert_eq!(recompute_all(&mut store).unwrap(), 0);
}

#[test]
fn store_round_trip_preserves_everything() {
    let dir = TempDir::new().unwrap();
    let cfg = dir.path().to_path_buf();

    let mut store = Store::default();
    let sale = add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);
    add(&mut store, LedgerKind::Expense, "Transport", 75.5);
    pay(&mut store, 400.0, &[(sale, 400.0)]).unwrap();

    commit_store(&cfg, &mut store).unwrap();
    assert_eq!(store.revision, 1);

    let reloaded = load_store(&cfg).unwrap();
    assert_eq!(reloaded.revision, 1);
    assert_eq!(reloaded.entries.len(), 2);
    assert_eq!(reloaded.payments.len(), 1);
    assert_eq!(reloaded.links.len(), 1);
    assert_eq!(
        state_of(&reloaded, sale),
        (PaymentStatus::Partial, 400.0)
    );
    assert_eq!(reloaded.counters.last_payment, 1);
}

#[test]
fn stale_store_commit_is_rejected() {
    let dir = TempDir::new().unwrap();
    let cfg = dir.path().to_path_buf();

    let mut store = Store::default();
    add(&mut store, LedgerKind::Sale, "Amal Trading", 1000.0);
    commit_store(&cfg, &mut store).unwrap();

    let mut fresh = load_store(&cfg).unwrap();
    let mut stale = load_store(&cfg).unwrap();

    add(&mut fresh, LedgerKind::Sale, "Noor Trading", 200.0);
    commit_store(&cfg, &mut fresh).unwrap();

    add(&mut stale, LedgerKind::Sale, "Fajr Trading", 300.0);
    let err = commit_store(&cfg, &mut stale).unwrap_err();
    assert!(matches!(err, LedgerError::ConcurrentUpdate { .. }));

    // The losing writer changed nothing on disk
    let on_disk = load_store(&cfg).unwrap();
    assert_eq!(on_disk.revision, 2);
    assert_eq!(on_disk.entries.len(), 2);
}
