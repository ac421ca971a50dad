use actix_web::{HttpResponse, Responder, web};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::model::employee::Employee;
use crate::model::invoice::{AUTO_INVOICES, PayrollInvoice};
use crate::model::payroll::{PaySystem, PaymentMethod, PayrollConfig};
use crate::payroll::date_cursor::IsoDate;
use crate::payroll::key::lenient_amount;
use crate::payroll::schedule::{DueDates, resolve_due_dates};
use crate::state::AppState;

/// Payroll form submission.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayrollSettingsRequest {
    #[serde(default)]
    pub enabled: bool,

    /// Number or numeric string.
    #[serde(default, deserialize_with = "lenient_amount")]
    #[schema(example = 1000.0, value_type = f64)]
    pub amount: f64,

    #[serde(default)]
    pub payment_method: PaymentMethod,

    #[serde(default)]
    pub pay_system: PaySystem,

    #[serde(default)]
    #[schema(example = "2024-01-01", format = "date")]
    pub start_date: String,

    #[serde(default)]
    pub note: String,
}

impl PayrollSettingsRequest {
    pub fn validate(self) -> Result<PayrollConfig, ApiError> {
        let start_date = match self.start_date.trim() {
            "" => None,
            raw => Some(IsoDate::parse(raw).ok_or_else(|| {
                ApiError::BadRequest(format!("startDate `{raw}` must be YYYY-MM-DD"))
            })?),
        };

        if self.amount < 0.0 {
            return Err(ApiError::BadRequest("amount must not be negative".into()));
        }
        if self.enabled && self.amount <= 0.0 {
            return Err(ApiError::BadRequest(
                "amount must be greater than zero when payroll is enabled".into(),
            ));
        }
        if self.enabled && start_date.is_none() {
            return Err(ApiError::BadRequest(
                "startDate is required when payroll is enabled".into(),
            ));
        }

        Ok(PayrollConfig {
            enabled: self.enabled,
            amount: self.amount,
            payment_method: self.payment_method,
            pay_system: self.pay_system,
            start_date,
            note: self.note.trim().to_string(),
            ..PayrollConfig::default()
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct PayrollSaveResponse {
    pub employee: Employee,
    #[schema(example = 3)]
    pub created_count: usize,
    pub created: Vec<PayrollInvoice>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DueDatesQuery {
    /// Last date to include; defaults to today.
    #[schema(example = "2024-03-01")]
    pub until: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DueDatesResponse {
    #[schema(value_type = Vec<String>, example = json!(["2024-01-01", "2024-02-01", "2024-03-01"]))]
    pub dates: Vec<IsoDate>,
    /// Set when the schedule hit the per-call cap.
    pub truncated: bool,
}

/// Save payroll settings and generate the due invoices
///
/// Every due date from `startDate` through today that has no invoice yet
/// gets a pending one. Re-submitting the same settings creates nothing.
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}/payroll",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = PayrollSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = PayrollSaveResponse),
        (status = 400, description = "Invalid settings"),
        (status = 404, description = "Employee not found"),
        (status = 500, description = "Save failed, nothing was written")
    ),
    tag = "Payroll"
)]
#[instrument(name = "payroll_save", skip_all, fields(employee_id = *path))]
pub async fn save_payroll(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<PayrollSettingsRequest>,
) -> Result<impl Responder, ApiError> {
    let employee_id = path.into_inner();
    let config = body.into_inner().validate()?;
    let today = state.clock.today();

    let outcome = state
        .store
        .save_payroll(employee_id, config, today, state.clock.now())
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))?;

    if !outcome.created.is_empty() {
        state.cache.invalidate(AUTO_INVOICES).await;
    }
    info!(%today, created = outcome.created.len(), "Payroll settings saved");

    Ok(HttpResponse::Ok().json(PayrollSaveResponse {
        created_count: outcome.created.len(),
        employee: outcome.employee,
        created: outcome.created,
    }))
}

/// Preview the due dates of an employee's saved schedule
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}/payroll/due-dates",
    params(
        ("employee_id", Path, description = "Employee ID"),
        DueDatesQuery
    ),
    responses(
        (status = 200, body = DueDatesResponse),
        (status = 400, description = "Invalid `until` date"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Payroll"
)]
pub async fn due_dates(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<DueDatesQuery>,
) -> Result<impl Responder, ApiError> {
    let employee_id = path.into_inner();
    let until = match query.until.as_deref() {
        Some(raw) => IsoDate::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("until `{raw}` must be YYYY-MM-DD")))?,
        None => state.clock.today(),
    };

    let employee = state
        .store
        .get_employee(employee_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Employee not found".into()))?;

    let payroll = &employee.payroll;
    let DueDates { dates, truncated } = if payroll.is_active() {
        resolve_due_dates(payroll.start_date, Some(until), payroll.pay_system, &Local)
    } else {
        DueDates::default()
    };

    Ok(HttpResponse::Ok().json(DueDatesResponse { dates, truncated }))
}
