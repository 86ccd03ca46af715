//! API router assembly.
//!
//! Audio upload routes live at the root; everything else is nested under
//! `/api`. CORS is permissive — the service fronts a browser app on
//! another origin.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Maximum upload size (audio recordings dominate): 50 MB.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Build the full application router.
pub fn api_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/checkins/summaries", get(endpoints::checkins::summaries))
        .route(
            "/checkins/:id",
            get(endpoints::checkins::get).delete(endpoints::checkins::delete),
        )
        .route("/prescriptions/upload", post(endpoints::prescriptions::upload))
        .route("/prescriptions/summaries", get(endpoints::prescriptions::summaries))
        .route(
            "/prescriptions",
            get(endpoints::prescriptions::list).post(endpoints::prescriptions::create),
        )
        .route(
            "/prescriptions/:id",
            get(endpoints::prescriptions::get)
                .put(endpoints::prescriptions::update)
                .delete(endpoints::prescriptions::delete),
        )
        .route("/lab-reports/upload", post(endpoints::lab_reports::upload))
        .route("/lab-reports/summaries", get(endpoints::lab_reports::summaries))
        .route(
            "/lab-reports",
            get(endpoints::lab_reports::list).post(endpoints::lab_reports::create),
        )
        .route(
            "/lab-reports/:id",
            get(endpoints::lab_reports::get)
                .put(endpoints::lab_reports::update)
                .delete(endpoints::lab_reports::delete),
        )
        .route("/overall-reports/generate", post(endpoints::overall_reports::generate))
        .route("/overall-reports", get(endpoints::overall_reports::list))
        .route(
            "/overall-reports/:id",
            get(endpoints::overall_reports::get).delete(endpoints::overall_reports::delete),
        )
        .route("/overall-reports/:id/pdf", get(endpoints::overall_reports::pdf))
        .route(
            "/hospitals",
            get(endpoints::hospitals::list).post(endpoints::hospitals::create),
        )
        .route(
            "/hospitals/:id",
            get(endpoints::hospitals::get)
                .put(endpoints::hospitals::update)
                .delete(endpoints::hospitals::delete),
        )
        .route(
            "/insurances",
            get(endpoints::insurances::list).post(endpoints::insurances::create),
        )
        .route(
            "/insurances/:id",
            get(endpoints::insurances::get)
                .put(endpoints::insurances::update)
                .delete(endpoints::insurances::delete),
        );

    Router::new()
        .route("/", get(endpoints::health::root))
        .route("/health", get(endpoints::health::check))
        .route("/upload-checkin", post(endpoints::checkins::upload))
        .route(
            "/upload-insurance-consultation",
            post(endpoints::checkins::upload_insurance_consultation),
        )
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
