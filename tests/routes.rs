// tests/routes.rs
use actix_web::{test, web, App};
use serde_json::{json, Value};

use scanner_backend::config::settings::Settings;
use scanner_backend::routes::health::health_scope;
use scanner_backend::routes::scan::scan_scope;
use scanner_backend::utils::route_debug::dump_routes;

/// highs [10, 11, 9], lows [8, 9, 7] then one close at `last_close`.
fn zone_rows(last_close: f64) -> Vec<Value> {
    let mut rows = vec![
        json!({"time": "2024-03-01 00:00", "open": 9.0,  "high": 10.0, "low": 8.0, "close": 9.5}),
        json!({"time": "2024-03-01 00:05", "open": 10.0, "high": 11.0, "low": 9.0, "close": 10.5}),
        json!({"time": "2024-03-01 00:10", "open": 8.0,  "high": 9.0,  "low": 7.0, "close": 8.5}),
    ];
    rows.push(json!({
        "time": "2024-03-01 00:15",
        "open": last_close,
        "high": last_close + 0.5,
        "low": last_close - 0.5,
        "close": last_close
    }));
    rows
}

macro_rules! app {
    () => {{
        let settings = Settings::default();
        test::init_service(
            App::new()
                .app_data(web::Data::new(settings.clone()))
                .service(health_scope())
                .service(scan_scope(settings.max_body_bytes))
                .service(dump_routes),
        )
        .await
    }};
}

#[actix_rt::test]
async fn health_reports_ok() {
    let app = app!();
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ok": true}));
}

#[actix_rt::test]
async fn routes_listing_includes_scan_endpoints() {
    let app = app!();
    let req = test::TestRequest::get().uri("/routes").to_request();
    let body: Vec<String> = test::call_and_read_body_json(&app, req).await;
    assert!(body.iter().any(|r| r == "POST /scan"));
    assert!(body.iter().any(|r| r == "POST /scan/mtf/csv"));
    // no recorder registered in this app
    assert!(!body.iter().any(|r| r == "GET /metrics"));
}

#[actix_rt::test]
async fn json_scan_reports_upside_breakout() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan")
        .set_json(json!({
            "data": zone_rows(12.0),
            "retest_window": 1,
            "sl_offset_points": 2,
            "tp1_points": 5,
            "tp2_points": 10
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["direction"], "up");
    assert_eq!(data["retest"], false);
    assert_eq!(data["zone_high"], 11.0);
    assert_eq!(data["zone_low"], 7.0);
    assert_eq!(data["stop_loss"], 5.0);
    assert_eq!(data["take_profit_1"], 17.0);
    assert_eq!(data["take_profit_2"], 22.0);
}

#[actix_rt::test]
async fn json_scan_accepts_short_parameter_names() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan")
        .set_json(json!({"data": zone_rows(12.0), "retest_m5_window": 1, "sl_after_zone": 3}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["stop_loss"], 4.0);
    // tp1 falls back to the configured default of 25
    assert_eq!(body["data"]["take_profit_1"], 37.0);
}

#[actix_rt::test]
async fn inside_close_has_no_levels() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan")
        .set_json(json!({"data": zone_rows(9.0), "retest_window": 1}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let data = &body["data"];
    assert_eq!(data["direction"], "none");
    assert_eq!(data["retest"], false);
    assert!(data.get("stop_loss").is_none());
    assert!(data.get("take_profit_2").is_none());
}

#[actix_rt::test]
async fn single_candle_is_unprocessable() {
    let app = app!();
    let mut rows = zone_rows(12.0);
    rows.truncate(1);
    let req = test::TestRequest::post()
        .uri("/scan")
        .set_json(json!({"data": rows}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 422);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("insufficient data"));
}

#[actix_rt::test]
async fn negative_offset_is_bad_request() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan")
        .set_json(json!({"data": zone_rows(12.0), "sl_offset_points": -5}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("sl_offset_points"));
}

#[actix_rt::test]
async fn malformed_json_uses_error_envelope() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"data\": [")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_rt::test]
async fn csv_scan_with_query_parameters() {
    let app = app!();
    let csv = "time,open,high,low,close\n\
               2024-03-01 00:00,9,10,8,9.5\n\
               2024-03-01 00:05,10,11,9,10.5\n\
               2024-03-01 00:10,8,9,7,8.5\n\
               2024-03-01 00:15,7,7.2,5.5,6\n";
    let req = test::TestRequest::post()
        .uri("/scan/csv?retest_window=1&sl_offset_points=2&tp1_points=1&tp2_points=3")
        .insert_header(("content-type", "text/csv"))
        .set_payload(csv)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    let data = &body["data"];
    assert_eq!(data["direction"], "down");
    assert_eq!(data["stop_loss"], 13.0);
    assert_eq!(data["take_profit_1"], 5.0);
    assert_eq!(data["take_profit_2"], 3.0);
}

#[actix_rt::test]
async fn csv_without_required_columns_is_rejected() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan/csv")
        .set_payload("time,open,close\n2024-03-01,1,1\n")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("high"));
}

#[actix_rt::test]
async fn bad_query_value_uses_error_envelope() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan/csv?retest_window=abc")
        .set_payload("time,open,high,low,close\n")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_rt::test]
async fn mtf_empty_data_is_no_data() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan/mtf")
        .set_json(json!({"data": []}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "NO_DATA");
}

#[actix_rt::test]
async fn mtf_short_history_is_no_setup() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan/mtf")
        .set_json(json!({"data": zone_rows(12.0)}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "NO_SETUP");
    assert!(body["data"]["reason"].as_array().is_some());
}

#[actix_rt::test]
async fn mtf_csv_route_is_served() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan/mtf/csv?body_ratio_filter=0.5")
        .set_payload("time,open,high,low,close\n2024-03-01 00:00,9,10,8,9.5\n")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "NO_SETUP");
}

#[actix_rt::test]
async fn mtf_csv_with_only_headers_is_no_data() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan/mtf/csv")
        .set_payload("time,open,high,low,close\n")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "NO_DATA");
}

#[actix_rt::test]
async fn core_csv_with_only_headers_is_rejected() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/scan/csv")
        .set_payload("time,open,high,low,close\n")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "no usable candle rows out of 0");
}

#[actix_rt::test]
async fn unknown_route_is_not_found() {
    let app = app!();
    let req = test::TestRequest::get().uri("/scan/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
