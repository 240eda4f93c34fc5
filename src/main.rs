use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use scanner_backend::{
    config::settings::Settings,
    middleware::metrics::Metrics,
    routes::{
        health::health_scope,
        metrics::{install_recorder, metrics_endpoint},
        scan::scan_scope,
    },
    utils::route_debug::dump_routes,
};

fn init_logging() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_logging();
    log::info!("Starting breakout scanner backend…");

    let settings = Settings::new().unwrap_or_else(|e| {
        log::error!("Failed to load settings: {e}");
        std::process::exit(1);
    });

    let prometheus = if settings.metrics_enabled {
        match install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("metrics disabled, recorder install failed: {e}");
                None
            }
        }
    } else {
        None
    };

    let bind = (settings.server_host.clone(), settings.server_port);
    log::info!(
        "listening on {}:{} (retest_window={}, sl={}, tp1={}, tp2={})",
        bind.0,
        bind.1,
        settings.scan_defaults.retest_window,
        settings.scan_defaults.sl_offset_points,
        settings.scan_defaults.tp1_points,
        settings.scan_defaults.tp2_points,
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(Metrics)
            .wrap(Logger::default())
            .app_data(web::Data::new(settings.clone()))
            .configure(|cfg| {
                if let Some(handle) = &prometheus {
                    cfg.app_data(web::Data::new(handle.clone()))
                        .service(metrics_endpoint);
                }
            })

            //scope
            .service(health_scope())
            .service(scan_scope(settings.max_body_bytes))

            .service(dump_routes)
    })
        .bind(bind)?
        .run()
        .await
}
