use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::model::employee::{EmployeeDraft, EmployeePatch};
use crate::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Karim Hasan")]
    pub name: String,
    #[schema(example = "+8801712345678")]
    pub phone: Option<String>,
    #[schema(example = "Field technician")]
    pub position: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateEmployee {
    pub fn validate(self) -> Result<EmployeeDraft, ApiError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ApiError::BadRequest("Employee name must not be empty".into()));
        }
        Ok(EmployeeDraft {
            name,
            phone: non_blank(self.phone),
            position: non_blank(self.position),
        })
    }
}

impl UpdateEmployee {
    pub fn validate(self) -> Result<EmployeePatch, ApiError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ApiError::BadRequest("Employee name must not be empty".into()));
        }
        Ok(EmployeePatch {
            name: non_blank(self.name),
            phone: non_blank(self.phone),
            position: non_blank(self.position),
        })
    }
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload", body = Object, example = json!({
            "message": "Employee name must not be empty"
        }))
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    state: web::Data<AppState>,
    payload: web::Json<CreateEmployee>,
) -> Result<impl Responder, ApiError> {
    let draft = payload.into_inner().validate()?;
    let employee = state.store.create_employee(draft).await?;

    info!(employee_id = employee.id, "Employee created");
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    responses(
        (status = 200, description = "All employees, newest first", body = [Employee])
    ),
    tag = "Employee"
)]
pub async fn list_employees(state: web::Data<AppState>) -> Result<impl Responder, ApiError> {
    let employees = state.store.list_employees().await?;
    debug!(count = employees.len(), "Listed employees");
    Ok(HttpResponse::Ok().json(employees))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let employee_id = path.into_inner();

    match state.store.get_employee(employee_id).await? {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Err(ApiError::NotFound("Employee not found".into())),
    }
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee"
)]
pub async fn update_employee(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
) -> Result<impl Responder, ApiError> {
    let employee_id = path.into_inner();
    let patch = body.into_inner().validate()?;

    match state.store.update_employee(employee_id, patch).await? {
        Some(employee) => Ok(HttpResponse::Ok().json(employee)),
        None => Err(ApiError::NotFound("Employee not found".into())),
    }
}

/// Delete Employee
///
/// Generated invoices stay in the ledger.
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee"
)]
pub async fn delete_employee(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<impl Responder, ApiError> {
    let employee_id = path.into_inner();

    if !state.store.delete_employee(employee_id).await? {
        return Err(ApiError::NotFound("Employee not found".into()));
    }

    info!(employee_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};

    use crate::clock::FixedClock;
    use crate::routes;
    use crate::state::AppState;

    fn state() -> actix_web::web::Data<AppState> {
        let clock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()));
        actix_web::web::Data::new(AppState::in_memory(clock))
    }

    #[actix_web::test]
    async fn create_get_update_delete() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .service(routes::api_scope("/api")),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/employee")
            .set_json(json!({"name": "  Rafi ", "phone": "", "position": "NOC"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["name"], "Rafi");
        assert_eq!(created["phone"], Value::Null);
        assert_eq!(created["payroll"]["enabled"], false);

        let req = test::TestRequest::put()
            .uri("/api/employee/1")
            .set_json(json!({"position": "Field lead"}))
            .to_request();
        let updated: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(updated["position"], "Field lead");

        let req = test::TestRequest::get().uri("/api/employee").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let req = test::TestRequest::delete().uri("/api/employee/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/employee/1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Employee not found");
    }

    #[actix_web::test]
    async fn blank_name_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(state())
                .service(routes::api_scope("/api")),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/employee")
            .set_json(json!({"name": "   "}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
