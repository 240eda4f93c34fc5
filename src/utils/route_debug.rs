use actix_web::{get, web, HttpResponse, Responder};
use metrics_exporter_prometheus::PrometheusHandle;

/// Served routes, kept in step with `main.rs` by hand.
pub const ROUTES: &[&str] = &[
    "GET /health",
    "GET /routes",
    "POST /scan",
    "POST /scan/csv",
    "POST /scan/mtf",
    "POST /scan/mtf/csv",
];

/// Mounted only when a Prometheus recorder is installed.
pub const METRICS_ROUTE: &str = "GET /metrics";

#[get("/routes")]
pub async fn dump_routes(prometheus: Option<web::Data<PrometheusHandle>>) -> impl Responder {
    let mut routes: Vec<&str> = ROUTES.to_vec();
    if prometheus.is_some() {
        routes.push(METRICS_ROUTE);
    }
    HttpResponse::Ok().json(routes)
}
