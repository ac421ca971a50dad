use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, Utc};
use serde_json::Value;

use crate::model::employee::{Employee, EmployeeDraft, EmployeePatch};
use crate::model::invoice::{AUTO_INVOICES, LedgerEntry, parse_ledger};
use crate::model::payroll::PayrollConfig;
use crate::payroll::date_cursor::IsoDate;
use crate::payroll::plan_payroll_save;
use crate::store::PayrollRunOutcome;

#[derive(Default)]
struct MemoryState {
    employees: BTreeMap<u64, Employee>,
    last_id: u64,
    finance: HashMap<String, Value>,
}

/// Process-local backend used when no database is configured. One lock
/// guards employees and the finance store together.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    pub fn list_employees(&self) -> Result<Vec<Employee>> {
        Ok(self.read()?.employees.values().rev().cloned().collect())
    }

    pub fn get_employee(&self, id: u64) -> Result<Option<Employee>> {
        Ok(self.read()?.employees.get(&id).cloned())
    }

    pub fn create_employee(&self, draft: EmployeeDraft) -> Result<Employee> {
        let mut state = self.write()?;
        state.last_id += 1;
        let employee = Employee {
            id: state.last_id,
            name: draft.name,
            phone: draft.phone,
            position: draft.position,
            payroll: PayrollConfig::default(),
        };
        state.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    pub fn update_employee(&self, id: u64, patch: EmployeePatch) -> Result<Option<Employee>> {
        let mut state = self.write()?;
        let Some(employee) = state.employees.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            employee.name = name;
        }
        if let Some(phone) = patch.phone {
            employee.phone = Some(phone);
        }
        if let Some(position) = patch.position {
            employee.position = Some(position);
        }
        Ok(Some(employee.clone()))
    }

    pub fn delete_employee(&self, id: u64) -> Result<bool> {
        Ok(self.write()?.employees.remove(&id).is_some())
    }

    pub fn finance_get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read()?.finance.get(key).cloned())
    }

    pub fn finance_set(&self, key: &str, value: Value) -> Result<()> {
        self.write()?.finance.insert(key.to_string(), value);
        Ok(())
    }

    pub fn save_payroll(
        &self,
        employee_id: u64,
        config: PayrollConfig,
        today: IsoDate,
        now: DateTime<Utc>,
    ) -> Result<Option<PayrollRunOutcome>> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let Some(employee) = state.employees.get_mut(&employee_id) else {
            return Ok(None);
        };

        let ledger = parse_ledger(state.finance.get(AUTO_INVOICES))?;
        let (config, run) = plan_payroll_save(employee_id, config, ledger, today, now, &Local);
        let ledger_blob = if run.is_noop() {
            None
        } else {
            Some(serde_json::to_value(&run.ledger)?)
        };

        // nothing below can fail, so both writes land or neither does
        if let Some(blob) = ledger_blob {
            state.finance.insert(AUTO_INVOICES.to_string(), blob);
        }
        employee.payroll = config;

        Ok(Some(PayrollRunOutcome {
            employee: employee.clone(),
            created: run.created,
        }))
    }

    pub fn update_auto_invoices<T>(
        &self,
        edit: impl FnOnce(&mut Vec<LedgerEntry>) -> (T, bool),
    ) -> Result<T> {
        let mut state = self.write()?;
        let mut ledger = parse_ledger(state.finance.get(AUTO_INVOICES))?;
        let (out, changed) = edit(&mut ledger);
        if changed {
            state
                .finance
                .insert(AUTO_INVOICES.to_string(), serde_json::to_value(&ledger)?);
        }
        Ok(out)
    }
}
