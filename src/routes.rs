use crate::api::{employee, finance, payroll};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{Scope, web};

/// Per-IP limiter for the API scope.
pub fn build_limiter(
    requests_per_min: u32,
) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min} per minute"))?;
    Ok(Governor::new(&cfg))
}

/// Every API route under `prefix`. The caller adds the rate limiter.
pub fn api_scope(prefix: &str) -> Scope {
    web::scope(prefix)
        .service(
            web::scope("/employee")
                // /employee
                .service(
                    web::resource("")
                        .route(web::post().to(employee::create_employee))
                        .route(web::get().to(employee::list_employees)),
                )
                // /employee/{id}
                .service(
                    web::resource("/{id}")
                        .route(web::put().to(employee::update_employee))
                        .route(web::get().to(employee::get_employee))
                        .route(web::delete().to(employee::delete_employee)),
                )
                // /employee/{id}/payroll
                .service(web::resource("/{id}/payroll").route(web::put().to(payroll::save_payroll)))
                // /employee/{id}/payroll/due-dates
                .service(
                    web::resource("/{id}/payroll/due-dates")
                        .route(web::get().to(payroll::due_dates)),
                ),
        )
        .service(
            web::scope("/finance")
                // fixed paths first, `/{key}` would swallow them
                .service(
                    web::resource("/auto-invoices")
                        .route(web::get().to(finance::list_auto_invoices)),
                )
                .service(
                    web::resource("/auto-invoices/{id}")
                        .route(web::delete().to(finance::delete_auto_invoice)),
                )
                .service(
                    web::resource("/auto-invoices/{id}/approve")
                        .route(web::put().to(finance::approve_auto_invoice)),
                )
                .service(web::resource("/summary").route(web::get().to(finance::summary)))
                .service(
                    web::resource("/{key}")
                        .route(web::get().to(finance::get_value))
                        .route(web::put().to(finance::put_value)),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_extremes() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(1).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
