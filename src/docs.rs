use crate::api::employee::{CreateEmployee, UpdateEmployee};
use crate::api::finance::AutoInvoiceFilter;
use crate::api::payroll::{
    DueDatesQuery, DueDatesResponse, PayrollSaveResponse, PayrollSettingsRequest,
};
use crate::model::employee::Employee;
use crate::model::invoice::{InvoiceStatus, PayrollInvoice};
use crate::model::payroll::{PaySystem, PaymentMethod, PayrollConfig};
use crate::payroll::ledger::LedgerSummary;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ISP Payroll API",
        version = "1.0.0",
        description = r#"
## ISP back-office: employees, payroll and finance ledger

### Key Features
- **Employee Management**
  - Create, update, list, view and delete employees
- **Recurring Payroll**
  - Daily, weekly or monthly pay cycles from a start date
  - Saving payroll settings generates a pending invoice for every due date
    up to today, exactly once per cycle
- **Finance Store**
  - Key/value JSON blobs (`autoInvoices` holds generated invoices)
  - Approve or delete generated invoices, payroll totals

### Storage
MySQL when `DATABASE_URL` is set, in-memory otherwise.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::payroll::save_payroll,
        crate::api::payroll::due_dates,

        crate::api::finance::get_value,
        crate::api::finance::put_value,
        crate::api::finance::list_auto_invoices,
        crate::api::finance::approve_auto_invoice,
        crate::api::finance::delete_auto_invoice,
        crate::api::finance::summary
    ),
    components(
        schemas(
            Employee,
            CreateEmployee,
            UpdateEmployee,
            PayrollConfig,
            PaySystem,
            PaymentMethod,
            PayrollSettingsRequest,
            PayrollSaveResponse,
            DueDatesQuery,
            DueDatesResponse,
            PayrollInvoice,
            InvoiceStatus,
            AutoInvoiceFilter,
            LedgerSummary
        )
    ),
    tags(
        (name = "Employee", description = "Employee management APIs"),
        (name = "Payroll", description = "Recurring payroll APIs"),
        (name = "Finance", description = "Finance store and invoice ledger APIs"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_payroll_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/employee/{employee_id}/payroll"));
        assert!(doc.paths.paths.contains_key("/api/finance/summary"));
    }
}
