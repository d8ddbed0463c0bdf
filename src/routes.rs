use actix_web::{web, HttpRequest};

use crate::error::PortalError;
use crate::handlers;

fn bad_body(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "rejected request body");
    PortalError::invalid_field("body").into()
}

fn bad_path(err: actix_web::error::PathError, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, path = req.path(), "rejected path parameter");
    PortalError::invalid_field("id").into()
}

/// Registers every route of the portal API on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(bad_body))
        .app_data(web::PathConfig::default().error_handler(bad_path))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .route("/register", web::post().to(handlers::register))
                        .route("/login", web::post().to(handlers::login)),
                )
                .route("/users/{id}", web::get().to(handlers::get_user))
                .service(
                    web::resource("/patients/{id}")
                        .route(web::get().to(handlers::get_patient_by_user))
                        .route(web::patch().to(handlers::update_patient)),
                )
                .route("/doctors", web::get().to(handlers::list_doctors))
                .service(
                    web::resource("/doctors/{id}")
                        .route(web::get().to(handlers::get_doctor_by_user))
                        .route(web::patch().to(handlers::update_doctor)),
                )
                .service(
                    web::scope("/appointments")
                        .route(
                            "/patient/{patient_id}",
                            web::get().to(handlers::appointments_for_patient),
                        )
                        .route(
                            "/doctor/{doctor_id}",
                            web::get().to(handlers::appointments_for_doctor),
                        )
                        .route("", web::post().to(handlers::create_appointment))
                        .service(
                            web::resource("/{id}")
                                .route(web::get().to(handlers::get_appointment))
                                .route(web::patch().to(handlers::update_appointment))
                                .route(web::delete().to(handlers::delete_appointment)),
                        ),
                )
                .route(
                    "/health-metrics",
                    web::post().to(handlers::create_health_metric),
                )
                .service(
                    web::resource("/health-metrics/{patient_id}")
                        .route(web::get().to(handlers::health_metrics_for_patient))
                        .route(web::post().to(handlers::create_health_metric_for_patient)),
                )
                .route(
                    "/medical-records",
                    web::post().to(handlers::create_medical_record),
                )
                .service(
                    web::resource("/medical-records/{id}")
                        .route(web::get().to(handlers::medical_records_for_patient))
                        .route(web::post().to(handlers::create_medical_record_for_patient))
                        .route(web::delete().to(handlers::delete_medical_record)),
                )
                .route("/messages", web::post().to(handlers::send_message))
                .route(
                    "/messages/{id}/read",
                    web::patch().to(handlers::mark_message_read),
                )
                .route(
                    "/messages/{user_id}/{other_id}",
                    web::get().to(handlers::conversation),
                ),
        )
        .route("/", web::get().to(handlers::hello));
}
