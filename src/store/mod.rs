pub mod memory;
pub mod mysql;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::employee::{Employee, EmployeeDraft, EmployeePatch};
use crate::model::invoice::{LedgerEntry, PayrollInvoice};
use crate::model::payroll::PayrollConfig;
use crate::payroll::date_cursor::IsoDate;
use memory::MemoryStore;
use mysql::MySqlStore;

/// What a payroll save wrote: the stored employee and the new invoices.
#[derive(Debug)]
pub struct PayrollRunOutcome {
    pub employee: Employee,
    pub created: Vec<PayrollInvoice>,
}

/// Persistence backend, chosen at startup from `DATABASE_URL`.
pub enum Store {
    Memory(MemoryStore),
    MySql(MySqlStore),
}

impl Store {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::MySql(_) => "mysql",
        }
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee>> {
        match self {
            Store::Memory(s) => s.list_employees(),
            Store::MySql(s) => s.list_employees().await,
        }
    }

    pub async fn get_employee(&self, id: u64) -> Result<Option<Employee>> {
        match self {
            Store::Memory(s) => s.get_employee(id),
            Store::MySql(s) => s.get_employee(id).await,
        }
    }

    pub async fn create_employee(&self, draft: EmployeeDraft) -> Result<Employee> {
        match self {
            Store::Memory(s) => s.create_employee(draft),
            Store::MySql(s) => s.create_employee(draft).await,
        }
    }

    pub async fn update_employee(&self, id: u64, patch: EmployeePatch) -> Result<Option<Employee>> {
        match self {
            Store::Memory(s) => s.update_employee(id, patch),
            Store::MySql(s) => s.update_employee(id, patch).await,
        }
    }

    pub async fn delete_employee(&self, id: u64) -> Result<bool> {
        match self {
            Store::Memory(s) => s.delete_employee(id),
            Store::MySql(s) => s.delete_employee(id).await,
        }
    }

    pub async fn finance_get(&self, key: &str) -> Result<Option<Value>> {
        match self {
            Store::Memory(s) => s.finance_get(key),
            Store::MySql(s) => s.finance_get(key).await,
        }
    }

    /// Full replace of the value under `key`.
    pub async fn finance_set(&self, key: &str, value: Value) -> Result<()> {
        match self {
            Store::Memory(s) => s.finance_set(key, value),
            Store::MySql(s) => s.finance_set(key, &value).await,
        }
    }

    /// Saves payroll settings and appends the due invoices atomically.
    /// `None` when the employee does not exist.
    pub async fn save_payroll(
        &self,
        employee_id: u64,
        config: PayrollConfig,
        today: IsoDate,
        now: DateTime<Utc>,
    ) -> Result<Option<PayrollRunOutcome>> {
        match self {
            Store::Memory(s) => s.save_payroll(employee_id, config, today, now),
            Store::MySql(s) => s.save_payroll(employee_id, config, today, now).await,
        }
    }

    /// Locked read-modify-write of the invoice ledger. `edit` returns its
    /// result and whether the ledger changed.
    pub async fn update_auto_invoices<T>(
        &self,
        edit: impl FnOnce(&mut Vec<LedgerEntry>) -> (T, bool),
    ) -> Result<T> {
        match self {
            Store::Memory(s) => s.update_auto_invoices(edit),
            Store::MySql(s) => s.update_auto_invoices(edit).await,
        }
    }
}
