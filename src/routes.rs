use crate::{
    api::{employee, material, report, supervisor, time_record},
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

/// Extractor failures answer with the same `{"message": ...}` body as handlers.
pub fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let record_limiter = Arc::new(build_limiter(config.rate_record_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/record")
                    .wrap(record_limiter)
                    .route("/arrival", web::post().to(time_record::arrival))
                    .route("/lunch-start", web::post().to(time_record::lunch_start))
                    .route("/lunch-end", web::post().to(time_record::lunch_end))
                    .route("/departure", web::post().to(time_record::departure))
                    .route("/status", web::get().to(time_record::status))
                    .route("/history", web::get().to(time_record::history)),
            )
            .service(
                web::scope("/supervisor")
                    .route("/checkin", web::post().to(supervisor::create_checkin))
                    .route("/checkins/{supervisor_id}", web::get().to(supervisor::list_checkins))
                    .route("/questionnaire", web::post().to(supervisor::submit_questionnaire))
                    .route(
                        "/correction-requests",
                        web::post().to(supervisor::create_correction_request),
                    ),
            )
            .service(
                web::scope("/admin")
                    // /admin/employees
                    .service(
                        web::resource("/employees")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /admin/employees/{id}
                    .service(
                        web::resource("/employees/{employee_id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .route("/time-records", web::get().to(time_record::list_time_records))
                    // /admin/reports/*
                    .service(
                        web::scope("/reports")
                            .route("/lateness", web::get().to(report::lateness_report))
                            .route("/hours-worked", web::get().to(report::hours_worked_report))
                            .route("/absences", web::get().to(report::absences_report)),
                    )
                    // /admin/correction-requests
                    .service(
                        web::scope("/correction-requests")
                            .route("", web::get().to(supervisor::list_correction_requests))
                            .route(
                                "/{request_id}/approve",
                                web::put().to(supervisor::approve_correction),
                            )
                            .route(
                                "/{request_id}/reject",
                                web::put().to(supervisor::reject_correction),
                            ),
                    )
                    // /admin/materials
                    .service(
                        web::scope("/materials")
                            .service(
                                web::resource("/types")
                                    .route(web::post().to(material::create_material_type))
                                    .route(web::get().to(material::list_material_types)),
                            )
                            .service(
                                web::resource("/types/{type_id}")
                                    .route(web::put().to(material::update_material_type))
                                    .route(web::delete().to(material::delete_material_type)),
                            )
                            .service(
                                web::resource("/logs")
                                    .route(web::post().to(material::create_material_log))
                                    .route(web::get().to(material::list_material_logs)),
                            ),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DocumentRenderer;
    use actix_web::{App, http::StatusCode, test};
    use sqlx::mysql::MySqlPoolOptions;

    #[actix_web::test]
    async fn malformed_query_is_a_json_validation_error() {
        let config = Config::for_tests();
        let pool = MySqlPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(DocumentRenderer::new(None)))
                .configure(extractor_configs)
                .configure(|cfg| configure(cfg, config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/record/status?employee_id=abc")
            .peer_addr("127.0.0.1:8080".parse().unwrap())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].is_string());
    }
}
