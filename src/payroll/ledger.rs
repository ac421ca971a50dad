use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::invoice::{InvoiceStatus, LedgerEntry, PayrollInvoice};
use crate::model::payroll::{PaymentMethod, PayrollConfig};
use crate::payroll::date_cursor::IsoDate;
use crate::payroll::key::{normalize_amount, payroll_invoice_key};
use crate::payroll::schedule::build_due_dates;

/// Result of merging one payroll run into the ledger.
#[derive(Debug)]
pub struct PayrollRun {
    pub ledger: Vec<LedgerEntry>,
    pub created: Vec<PayrollInvoice>,
}

impl PayrollRun {
    fn unchanged(ledger: Vec<LedgerEntry>) -> Self {
        PayrollRun {
            ledger,
            created: Vec::new(),
        }
    }

    /// Nothing new was generated; the ledger does not need to be written.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

/// Generates pending invoices for every due date up to `today` that the
/// ledger does not already hold, and prepends them oldest first.
pub fn apply_payroll_run<Tz: TimeZone>(
    current: Vec<LedgerEntry>,
    employee_id: u64,
    config: &PayrollConfig,
    today: IsoDate,
    tz: &Tz,
) -> PayrollRun {
    let Some(start_date) = config.start_date.filter(|_| config.is_active()) else {
        return PayrollRun::unchanged(current);
    };
    let due_dates = build_due_dates(Some(start_date), Some(today), config.pay_system, tz);
    if due_dates.is_empty() {
        return PayrollRun::unchanged(current);
    }

    let mut known: HashSet<String> = current.iter().filter_map(LedgerEntry::dedup_key).collect();
    let seed = if config.run_seed.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        config.run_seed.clone()
    };
    let amount = normalize_amount(config.amount);

    let mut created = Vec::new();
    for date in due_dates {
        let payroll_key = payroll_invoice_key(
            employee_id,
            date,
            config.pay_system,
            amount,
            config.payment_method,
        );
        if !known.insert(payroll_key.clone()) {
            continue;
        }

        let mut details = format!(
            "{} payroll for employee #{employee_id}: {amount} via {} (due {date})",
            config.pay_system, config.payment_method
        );
        if !config.note.trim().is_empty() {
            details.push_str(" - ");
            details.push_str(config.note.trim());
        }

        created.push(PayrollInvoice {
            id: format!("pay-{seed}-{date}"),
            payroll_key,
            status: InvoiceStatus::Pending,
            date,
            amount,
            employee_id,
            pay_system: config.pay_system,
            payment_method: config.payment_method,
            start_date,
            details,
            approved_at: None,
        });
    }

    if created.is_empty() {
        return PayrollRun::unchanged(current);
    }

    let mut ledger: Vec<LedgerEntry> = created.iter().cloned().map(LedgerEntry::from).collect();
    ledger.extend(current);
    PayrollRun { ledger, created }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Approval {
    Approved,
    AlreadyApproved,
    NotFound,
}

/// Flips a pending payroll invoice to approved.
pub fn approve(ledger: &mut [LedgerEntry], id: &str, now: DateTime<Utc>) -> Approval {
    let entry = ledger
        .iter_mut()
        .find(|entry| entry.as_payroll().is_some_and(|invoice| invoice.id == id));

    match entry {
        None => Approval::NotFound,
        Some(entry) => {
            if entry.mark_approved(now) {
                Approval::Approved
            } else {
                Approval::AlreadyApproved
            }
        }
    }
}

/// Deletes the entry with `id`, of any kind. Returns whether one was removed.
pub fn remove(ledger: &mut Vec<LedgerEntry>, id: &str) -> bool {
    let before = ledger.len();
    ledger.retain(|entry| entry.id().as_deref() != Some(id));
    ledger.len() != before
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct LedgerSummary {
    pub approved_count: usize,
    pub approved_total: f64,
    pub pending_count: usize,
    pub pending_total: f64,
    /// Approved totals per payment method.
    pub approved_by_method: BTreeMap<PaymentMethod, f64>,
}

/// Totals over payroll invoices. Only approved invoices count as paid out.
pub fn summarize(ledger: &[LedgerEntry]) -> LedgerSummary {
    let mut summary = LedgerSummary::default();
    for invoice in ledger.iter().filter_map(LedgerEntry::as_payroll) {
        match invoice.status {
            InvoiceStatus::Pending => {
                summary.pending_count += 1;
                summary.pending_total += invoice.amount;
            }
            InvoiceStatus::Approved => {
                summary.approved_count += 1;
                summary.approved_total += invoice.amount;
                *summary
                    .approved_by_method
                    .entry(invoice.payment_method)
                    .or_default() += invoice.amount;
            }
        }
    }
    summary
}
