use std::sync::Arc;

use actix_web::{middleware::DefaultHeaders, web, App, HttpServer};

use crate::metrics::Metrics;
use crate::service::OrderLookupService;
use super::handlers::configure;

pub(crate) fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new().add(("Access-Control-Allow-Origin", "*"))
}

/// Serve the order API until the server is stopped (Ctrl+C / SIGTERM).
pub async fn run_http_server(
    addr: &str,
    service: Arc<OrderLookupService>,
    metrics: Arc<Metrics>,
) -> std::io::Result<()> {
    tracing::info!("🌐 Starting HTTP server on http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_headers())
            .app_data(web::Data::from(service.clone()))
            .app_data(web::Data::from(metrics.clone()))
            .configure(configure)
    })
    .bind(addr)?
    .run()
    .await
}
