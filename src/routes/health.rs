use actix_web::{get, web, HttpResponse, Scope};
use serde_json::json;

#[get("")]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "ok": true }))
}

pub fn health_scope() -> Scope {
    web::scope("/health")
        .service(health_check)
}
