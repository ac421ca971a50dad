use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde_json::Value;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::debug;

use crate::model::employee::{Employee, EmployeeDraft, EmployeePatch};
use crate::model::invoice::{AUTO_INVOICES, LedgerEntry, parse_ledger};
use crate::model::payroll::PayrollConfig;
use crate::payroll::date_cursor::IsoDate;
use crate::payroll::plan_payroll_save;
use crate::store::PayrollRunOutcome;

#[derive(sqlx::FromRow)]
struct EmployeeRow {
    id: u64,
    name: String,
    phone: Option<String>,
    position: Option<String>,
    payroll: String,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = anyhow::Error;

    fn try_from(row: EmployeeRow) -> Result<Self> {
        let payroll = if row.payroll.trim().is_empty() {
            PayrollConfig::default()
        } else {
            serde_json::from_str(&row.payroll)
                .with_context(|| format!("employee {} has an unreadable payroll record", row.id))?
        };
        Ok(Employee {
            id: row.id,
            name: row.name,
            phone: row.phone,
            position: row.position,
            payroll,
        })
    }
}

const SELECT_EMPLOYEE: &str = "SELECT id, name, phone, position, payroll FROM employees";

/// Tables: `employees` (payroll as JSON text) and `finance_store`
/// (`store_key` -> JSON text), see `migrations/`.
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn list_employees(&self) -> Result<Vec<Employee>> {
        let sql = format!("{SELECT_EMPLOYEE} ORDER BY id DESC");
        debug!(sql = %sql, "Fetching employees");

        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch employees")?;
        rows.into_iter().map(Employee::try_from).collect()
    }

    pub async fn get_employee(&self, id: u64) -> Result<Option<Employee>> {
        let sql = format!("{SELECT_EMPLOYEE} WHERE id = ?");
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch employee {id}"))?
            .map(Employee::try_from)
            .transpose()
    }

    pub async fn create_employee(&self, draft: EmployeeDraft) -> Result<Employee> {
        let payroll = PayrollConfig::default();
        let result = sqlx::query(
            r#"
            INSERT INTO employees (name, phone, position, payroll)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.phone)
        .bind(&draft.position)
        .bind(serde_json::to_string(&payroll)?)
        .execute(&self.pool)
        .await
        .context("Failed to create employee")?;

        Ok(Employee {
            id: result.last_insert_id(),
            name: draft.name,
            phone: draft.phone,
            position: draft.position,
            payroll,
        })
    }

    pub async fn update_employee(&self, id: u64, patch: EmployeePatch) -> Result<Option<Employee>> {
        sqlx::query(
            r#"
            UPDATE employees
            SET name = COALESCE(?, name),
                phone = COALESCE(?, phone),
                position = COALESCE(?, position)
            WHERE id = ?
            "#,
        )
        .bind(patch.name)
        .bind(patch.phone)
        .bind(patch.position)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update employee {id}"))?;

        // rows_affected is 0 for a no-op update as well, so re-read
        self.get_employee(id).await
    }

    pub async fn delete_employee(&self, id: u64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete employee {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn finance_get(&self, key: &str) -> Result<Option<Value>> {
        let row = sqlx::query_as::<_, (String,)>(
            "SELECT store_value FROM finance_store WHERE store_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read finance key `{key}`"))?;

        row.map(|(raw,)| serde_json::from_str(&raw))
            .transpose()
            .with_context(|| format!("Finance key `{key}` holds invalid JSON"))
    }

    pub async fn finance_set(&self, key: &str, value: &Value) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        upsert_finance(&mut conn, key, value).await
    }

    /// Payroll settings and the generated invoices commit in one
    /// transaction; the ledger row is locked for the read-modify-write.
    pub async fn save_payroll(
        &self,
        employee_id: u64,
        config: PayrollConfig,
        today: IsoDate,
        now: DateTime<Utc>,
    ) -> Result<Option<PayrollRunOutcome>> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let sql = format!("{SELECT_EMPLOYEE} WHERE id = ? FOR UPDATE");
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(employee_id)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("Failed to lock employee {employee_id}"))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut employee = Employee::try_from(row)?;

        let ledger = locked_ledger(&mut tx).await?;
        let (config, run) = plan_payroll_save(employee_id, config, ledger, today, now, &Local);

        sqlx::query("UPDATE employees SET payroll = ? WHERE id = ?")
            .bind(serde_json::to_string(&config)?)
            .bind(employee_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to save payroll settings for employee {employee_id}"))?;

        if !run.is_noop() {
            upsert_finance(&mut tx, AUTO_INVOICES, &serde_json::to_value(&run.ledger)?).await?;
        }

        tx.commit().await.context("Failed to commit payroll run")?;

        employee.payroll = config;
        Ok(Some(PayrollRunOutcome {
            employee,
            created: run.created,
        }))
    }

    pub async fn update_auto_invoices<T>(
        &self,
        edit: impl FnOnce(&mut Vec<LedgerEntry>) -> (T, bool),
    ) -> Result<T> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        let mut ledger = locked_ledger(&mut tx).await?;
        let (out, changed) = edit(&mut ledger);
        if changed {
            upsert_finance(&mut tx, AUTO_INVOICES, &serde_json::to_value(&ledger)?).await?;
        }

        tx.commit().await.context("Failed to commit ledger update")?;
        Ok(out)
    }
}

async fn locked_ledger(conn: &mut MySqlConnection) -> Result<Vec<LedgerEntry>> {
    let row = sqlx::query_as::<_, (String,)>(
        "SELECT store_value FROM finance_store WHERE store_key = ? FOR UPDATE",
    )
    .bind(AUTO_INVOICES)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to lock invoice ledger")?;

    let blob = row
        .map(|(raw,)| serde_json::from_str::<Value>(&raw))
        .transpose()
        .context("Invoice ledger holds invalid JSON")?;
    parse_ledger(blob.as_ref())
}

async fn upsert_finance(conn: &mut MySqlConnection, key: &str, value: &Value) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO finance_store (store_key, store_value)
        VALUES (?, ?)
        ON DUPLICATE KEY UPDATE store_value = VALUES(store_value)
        "#,
    )
    .bind(key)
    .bind(serde_json::to_string(value)?)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("Failed to write finance key `{key}`"))?;
    Ok(())
}
