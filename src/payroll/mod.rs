//! Recurring payroll: due-date resolution and invoice generation.
//!
//! Everything here is pure. Persistence lives in [`crate::store`], which
//! calls [`plan_payroll_save`] while holding its lock or transaction.

pub mod date_cursor;
pub mod key;
pub mod ledger;
pub mod schedule;

use chrono::{DateTime, TimeZone, Utc};

use crate::model::invoice::LedgerEntry;
use crate::model::payroll::PayrollConfig;
use date_cursor::IsoDate;
use ledger::{PayrollRun, apply_payroll_run};
use schedule::next_due_after;

/// Stamps the run bookkeeping onto `config` and merges the due invoices
/// into `ledger`. Returns the config to persist alongside the run.
pub fn plan_payroll_save<Tz: TimeZone>(
    employee_id: u64,
    mut config: PayrollConfig,
    ledger: Vec<LedgerEntry>,
    today: IsoDate,
    now: DateTime<Utc>,
    tz: &Tz,
) -> (PayrollConfig, PayrollRun) {
    config.run_seed = uuid::Uuid::new_v4().to_string();
    let run = apply_payroll_run(ledger, employee_id, &config, today, tz);

    if config.is_active() {
        config.last_run_at = Some(now);
        config.next_run_date = config
            .start_date
            .and_then(|start| next_due_after(start, today, config.pay_system, tz));
    } else {
        config.next_run_date = None;
    }

    (config, run)
}
