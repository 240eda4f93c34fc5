// src/routes/scan.rs

use actix_web::dev::HttpServiceFactory;
use actix_web::{error, post, web, HttpResponse, Responder};
use metrics::increment_counter;
use serde::Serialize;

use crate::config::settings::Settings;
use crate::middleware::path_logger::PathLogger;
use crate::services::candle_input::{candles_from_csv, candles_from_records, ScanBody, ScanOverrides};
use crate::services::scanner::{scan, scan_mtf, MtfSignal, ScanResult};
use crate::utils::errors::ApiError;
use crate::utils::types::ApiResponse;

/// Short label for logs and the outcome counter.
trait ScanOutcome: Serialize {
    fn label(&self) -> &'static str;
}

impl ScanOutcome for ScanResult {
    fn label(&self) -> &'static str {
        self.direction.as_str()
    }
}

impl ScanOutcome for MtfSignal {
    fn label(&self) -> &'static str {
        self.status.as_str()
    }
}

fn reply<T: ScanOutcome>(kind: &'static str, outcome: Result<T, ApiError>) -> HttpResponse {
    match outcome {
        Ok(res) => {
            let label = res.label();
            log::info!("{kind}: {label}");
            increment_counter!("scan_results_total", "kind" => kind, "outcome" => label);
            HttpResponse::Ok().json(ApiResponse::ok(res))
        }
        Err(e) => {
            log::warn!("{kind} rejected: {e}");
            increment_counter!("scan_results_total", "kind" => kind, "outcome" => "error");
            HttpResponse::build(e.status_code()).json(ApiResponse::<()>::err(e.to_string()))
        }
    }
}

/// POST /scan
#[post("")]
pub async fn scan_json(body: web::Json<ScanBody>, settings: web::Data<Settings>) -> impl Responder {
    let ScanBody { data, overrides } = body.into_inner();
    let params = overrides.resolve(&settings.scan_defaults);

    let outcome = candles_from_records(data)
        .and_then(|candles| scan(&candles, &params).map_err(ApiError::from));
    reply("scan", outcome)
}

/// POST /scan/csv — CSV text as the body, parameters in the query string
#[post("/csv")]
pub async fn scan_csv(
    body: web::Bytes,
    query: web::Query<ScanOverrides>,
    settings: web::Data<Settings>,
) -> impl Responder {
    let params = query.resolve(&settings.scan_defaults);

    let outcome = candles_from_csv(&body)
        .and_then(|candles| scan(&candles, &params).map_err(ApiError::from));
    reply("scan_csv", outcome)
}

/// POST /scan/mtf
#[post("/mtf")]
pub async fn scan_mtf_json(body: web::Json<ScanBody>, settings: web::Data<Settings>) -> impl Responder {
    let ScanBody { data, overrides } = body.into_inner();
    let params = overrides.resolve(&settings.scan_defaults);
    let body_ratio = overrides.body_ratio_filter.unwrap_or(settings.body_ratio_filter);

    // an empty array is a valid "no data yet" poll for this scanner
    let outcome = if data.is_empty() {
        scan_mtf(&[], &params, body_ratio).map_err(ApiError::from)
    } else {
        candles_from_records(data)
            .and_then(|candles| scan_mtf(&candles, &params, body_ratio).map_err(ApiError::from))
    };
    reply("scan_mtf", outcome)
}

/// POST /scan/mtf/csv
#[post("/mtf/csv")]
pub async fn scan_mtf_csv(
    body: web::Bytes,
    query: web::Query<ScanOverrides>,
    settings: web::Data<Settings>,
) -> impl Responder {
    let params = query.resolve(&settings.scan_defaults);
    let body_ratio = query.body_ratio_filter.unwrap_or(settings.body_ratio_filter);

    // a header-only upload is the CSV form of an empty poll
    let outcome = match candles_from_csv(&body) {
        Err(ApiError::NoUsableRows { total: 0 }) => {
            scan_mtf(&[], &params, body_ratio).map_err(ApiError::from)
        }
        parsed => parsed
            .and_then(|candles| scan_mtf(&candles, &params, body_ratio).map_err(ApiError::from)),
    };
    reply("scan_mtf_csv", outcome)
}

/// JSON extractor config: size limit plus errors in the usual envelope.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let body = ApiResponse::<()>::err(format!("JSON error: {err}"));
            error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let body = ApiResponse::<()>::err(format!("Query error: {err}"));
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

pub fn scan_scope(max_body_bytes: usize) -> impl HttpServiceFactory {
    web::scope("/scan")
        .wrap(PathLogger)
        .app_data(json_config(max_body_bytes))
        .app_data(query_config())
        .app_data(web::PayloadConfig::new(max_body_bytes))
        .service(scan_json)
        .service(scan_csv)
        .service(scan_mtf_json)
        .service(scan_mtf_csv)
}
