use std::str::FromStr;

use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::model::invoice::{AUTO_INVOICES, InvoiceStatus, LedgerEntry, parse_ledger};
use crate::payroll::date_cursor::compare_iso;
use crate::payroll::ledger::{Approval, approve, remove, summarize};
use crate::state::AppState;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AutoInvoiceFilter {
    /// `pending` or `approved`
    #[schema(example = "pending")]
    pub status: Option<String>,
    #[schema(example = 1)]
    pub employee_id: Option<u64>,
}

/// Reads a finance key through the cache.
async fn cached_value(state: &AppState, key: &str) -> Result<Option<Value>, ApiError> {
    let value = state
        .cache
        .get_or_load(key, || state.store.finance_get(key))
        .await?;
    debug!(key, found = value.is_some(), "Finance value read");
    Ok(value)
}

async fn load_auto_invoices(state: &AppState) -> Result<Vec<LedgerEntry>, ApiError> {
    let blob = cached_value(state, AUTO_INVOICES).await?;
    Ok(parse_ledger(blob.as_ref())?)
}

/// Read a finance store value
#[utoipa::path(
    get,
    path = "/api/finance/{key}",
    params(
        ("key", Path, description = "Finance store key, e.g. autoInvoices")
    ),
    responses(
        (status = 200, description = "Stored JSON value", body = Object),
        (status = 404, description = "Key not set")
    ),
    tag = "Finance"
)]
pub async fn get_value(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let key = path.into_inner();
    match cached_value(&state, &key).await? {
        Some(value) => Ok(HttpResponse::Ok().json(value)),
        None => Err(ApiError::NotFound(format!("Finance key `{key}` is not set"))),
    }
}

/// Replace a finance store value
///
/// `autoInvoices` must be a list of invoice entries.
#[utoipa::path(
    put,
    path = "/api/finance/{key}",
    params(
        ("key", Path, description = "Finance store key")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Value stored"),
        (status = 400, description = "Value rejected for this key")
    ),
    tag = "Finance"
)]
pub async fn put_value(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> Result<impl Responder, ApiError> {
    let key = path.into_inner();
    let value = body.into_inner();

    if key == AUTO_INVOICES {
        parse_ledger(Some(&value)).map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;
    }

    state.store.finance_set(&key, value).await?;
    state.cache.invalidate(&key).await;

    info!(key = %key, "Finance value replaced");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Saved"
    })))
}

/// List auto invoices, latest due date first
///
/// With a filter only payroll invoices are returned.
#[utoipa::path(
    get,
    path = "/api/finance/auto-invoices",
    params(AutoInvoiceFilter),
    responses(
        (status = 200, description = "Ledger entries", body = Object),
        (status = 400, description = "Unknown status")
    ),
    tag = "Finance"
)]
pub async fn list_auto_invoices(
    state: web::Data<AppState>,
    query: web::Query<AutoInvoiceFilter>,
) -> Result<impl Responder, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(InvoiceStatus::from_str)
        .transpose()
        .map_err(|_| ApiError::BadRequest("status must be `pending` or `approved`".into()))?;

    let mut entries = load_auto_invoices(&state).await?;
    if status.is_some() || query.employee_id.is_some() {
        entries.retain(|entry| {
            entry.as_payroll().is_some_and(|invoice| {
                status.is_none_or(|s| invoice.status == s)
                    && query.employee_id.is_none_or(|id| invoice.employee_id == id)
            })
        });
    }
    entries.sort_by(|a, b| compare_iso(&b.date_text(), &a.date_text()));

    Ok(HttpResponse::Ok().json(entries))
}

/// Approve a pending payroll invoice
#[utoipa::path(
    put,
    path = "/api/finance/auto-invoices/{invoice_id}/approve",
    params(
        ("invoice_id", Path, description = "Invoice ID")
    ),
    responses(
        (status = 200, description = "Approved, or already approved", body = Object, example = json!({
            "message": "Invoice approved"
        })),
        (status = 404, description = "No payroll invoice with this id")
    ),
    tag = "Finance"
)]
pub async fn approve_auto_invoice(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let invoice_id = path.into_inner();
    let now = state.clock.now();

    let outcome = state
        .store
        .update_auto_invoices(|ledger| {
            let outcome = approve(ledger, &invoice_id, now);
            let changed = outcome == Approval::Approved;
            (outcome, changed)
        })
        .await?;

    let message = match outcome {
        Approval::NotFound => return Err(ApiError::NotFound("Invoice not found".into())),
        Approval::AlreadyApproved => "Invoice already approved",
        Approval::Approved => {
            state.cache.invalidate(AUTO_INVOICES).await;
            info!(invoice_id = %invoice_id, "Invoice approved");
            "Invoice approved"
        }
    };
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

/// Delete an auto invoice
#[utoipa::path(
    delete,
    path = "/api/finance/auto-invoices/{invoice_id}",
    params(
        ("invoice_id", Path, description = "Invoice ID")
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Invoice not found")
    ),
    tag = "Finance"
)]
pub async fn delete_auto_invoice(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let invoice_id = path.into_inner();

    let removed = state
        .store
        .update_auto_invoices(|ledger| {
            let removed = remove(ledger, &invoice_id);
            (removed, removed)
        })
        .await?;
    if !removed {
        return Err(ApiError::NotFound("Invoice not found".into()));
    }

    state.cache.invalidate(AUTO_INVOICES).await;
    info!(invoice_id = %invoice_id, "Invoice deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

/// Payroll totals; pending invoices are reported but not counted as paid
#[utoipa::path(
    get,
    path = "/api/finance/summary",
    responses(
        (status = 200, body = LedgerSummary)
    ),
    tag = "Finance"
)]
pub async fn summary(state: web::Data<AppState>) -> Result<impl Responder, ApiError> {
    let entries = load_auto_invoices(&state).await?;
    Ok(HttpResponse::Ok().json(summarize(&entries)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test, web};
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};

    use crate::clock::FixedClock;
    use crate::model::employee::EmployeeDraft;
    use crate::model::payroll::{PaySystem, PayrollConfig};
    use crate::payroll::date_cursor::IsoDate;
    use crate::routes;
    use crate::state::AppState;

    /// Two employees with generated invoices plus one manual entry.
    async fn seeded_state() -> web::Data<AppState> {
        let clock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()));
        let state = web::Data::new(AppState::in_memory(clock));
        state
            .store
            .finance_set("autoInvoices", json!([{"id": "manual-1", "title": "Fiber", "date": "2024-02-15"}]))
            .await
            .unwrap();

        for (name, amount) in [("Nadia", 1000.0), ("Imran", 400.0)] {
            let draft = EmployeeDraft {
                name: name.into(),
                phone: None,
                position: None,
            };
            let employee = state.store.create_employee(draft).await.unwrap();
            let config = PayrollConfig {
                enabled: true,
                amount,
                pay_system: PaySystem::Monthly,
                start_date: IsoDate::parse("2024-01-01"),
                ..PayrollConfig::default()
            };
            let today = state.clock.today();
            let now = state.clock.now();
            state.store.save_payroll(employee.id, config, today, now).await.unwrap();
        }
        state
    }

    #[actix_web::test]
    async fn list_sorts_and_filters() {
        let app = test::init_service(App::new().app_data(seeded_state().await).service(routes::api_scope("/api"))).await;

        let req = test::TestRequest::get().uri("/api/finance/auto-invoices").to_request();
        let all: Value = test::call_and_read_body_json(&app, req).await;
        let dates: Vec<&str> = all.as_array().unwrap().iter().map(|e| e["date"].as_str().unwrap()).collect();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], "2024-03-01");
        assert_eq!(dates[6], "2024-01-01");
        assert!(dates.contains(&"2024-02-15"));

        let req = test::TestRequest::get()
            .uri("/api/finance/auto-invoices?status=pending&employee_id=2")
            .to_request();
        let filtered: Value = test::call_and_read_body_json(&app, req).await;
        let filtered = filtered.as_array().unwrap();
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|e| e["employeeId"] == 2 && e["amount"] == 400.0));

        let req = test::TestRequest::get()
            .uri("/api/finance/auto-invoices?status=paid")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn approve_then_summarize_then_delete() {
        let state = seeded_state().await;
        let app = test::init_service(App::new().app_data(state.clone()).service(routes::api_scope("/api"))).await;

        let req = test::TestRequest::get()
            .uri("/api/finance/auto-invoices?employee_id=1")
            .to_request();
        let list: Value = test::call_and_read_body_json(&app, req).await;
        let id = list[0]["id"].as_str().unwrap().to_string();

        // warm the cache so approval has to invalidate it
        let req = test::TestRequest::get().uri("/api/finance/summary").to_request();
        let before: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(before["approved_count"], 0);
        assert_eq!(before["pending_total"], 4200.0);

        let req = test::TestRequest::put()
            .uri(&format!("/api/finance/auto-invoices/{id}/approve"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Invoice approved");

        let req = test::TestRequest::put()
            .uri(&format!("/api/finance/auto-invoices/{id}/approve"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Invoice already approved");

        let req = test::TestRequest::get().uri("/api/finance/summary").to_request();
        let after: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(after["approved_count"], 1);
        assert_eq!(after["approved_total"], 1000.0);
        assert_eq!(after["approved_by_method"]["cash"], 1000.0);
        assert_eq!(after["pending_total"], 3200.0);

        let req = test::TestRequest::delete()
            .uri("/api/finance/auto-invoices/manual-1")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri("/api/finance/auto-invoices/manual-1")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri("/api/finance/auto-invoices/nope/approve")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let ledger = state.store.finance_get("autoInvoices").await.unwrap().unwrap();
        assert_eq!(ledger.as_array().unwrap().len(), 6);
    }

    #[actix_web::test]
    async fn raw_finance_values() {
        let app = test::init_service(App::new().app_data(seeded_state().await).service(routes::api_scope("/api"))).await;

        let req = test::TestRequest::get().uri("/api/finance/manualInvoices").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::put()
            .uri("/api/finance/manualInvoices")
            .set_json(json!([{"id": "m-9", "amount": 15}]))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/finance/manualInvoices").to_request();
        let value: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(value[0]["id"], "m-9");

        let req = test::TestRequest::put()
            .uri("/api/finance/autoInvoices")
            .set_json(json!("not a list"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
