use actix_web::{
    http::{header, StatusCode},
    web, HttpResponse, Responder, ResponseError,
};

use crate::metrics::Metrics;
use crate::service::{LookupError, OrderLookupService};

// ============================================================================
// HTTP Handlers
// ============================================================================
//
//   GET /order/{order_uid}  → order JSON (cache-aside)
//   GET /order/             → 400, no id
//   GET /health             → store reachability + cache size
//   GET /metrics            → Prometheus text format
//
// ============================================================================

/// Register every route. Expects `web::Data<OrderLookupService>` and
/// `web::Data<Metrics>` in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/order/{order_uid}", web::get().to(get_order))
        .route("/order/", web::get().to(missing_order_id))
        .route("/order", web::get().to(missing_order_id))
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler));
}

impl ResponseError for LookupError {
    fn status_code(&self) -> StatusCode {
        match self {
            LookupError::MissingId => StatusCode::BAD_REQUEST,
            LookupError::NotFound => StatusCode::NOT_FOUND,
            LookupError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            LookupError::Store(_) => "Failed to load order".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

async fn get_order(
    path: web::Path<String>,
    service: web::Data<OrderLookupService>,
    metrics: web::Data<Metrics>,
) -> Result<HttpResponse, LookupError> {
    let order_uid = path.into_inner();

    match service.get_order(&order_uid).await {
        Ok(lookup) => {
            metrics.record_order_lookup(lookup.source.as_label(), 200);
            Ok(HttpResponse::Ok().json(&*lookup.order))
        }
        Err(e) => {
            metrics.record_order_lookup("none", e.status_code().as_u16());
            if let LookupError::Store(cause) = &e {
                tracing::error!(order_uid = %order_uid, error = %cause, "Order lookup failed");
            }
            Err(e)
        }
    }
}

async fn missing_order_id(metrics: web::Data<Metrics>) -> Result<HttpResponse, LookupError> {
    metrics.record_order_lookup("none", 400);
    Err(LookupError::MissingId)
}

async fn health(service: web::Data<OrderLookupService>) -> impl Responder {
    let store_healthy = service.store_healthy().await;
    let cache = service.cache();

    let body = serde_json::json!({
        "status": if store_healthy { "healthy" } else { "degraded" },
        "service": "order-ingest",
        "store": if store_healthy { "up" } else { "down" },
        "cache_size": cache.len(),
        "cache_capacity": cache.capacity(),
    });

    if store_healthy {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

async fn metrics_handler(metrics: web::Data<Metrics>) -> HttpResponse {
    match metrics.encode() {
        Ok(buffer) => HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "text/plain; version=0.0.4"))
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError()
                .json(serde_json::json!({ "error": "Failed to encode metrics" }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::OrderCache;
    use crate::db::memory::InMemoryOrderRepository;
    use crate::db::OrderRepository;
    use crate::domain::order::Order;
    use crate::http::server::cors_headers;
    use actix_web::{test, App};
    use std::sync::Arc;

    struct Fixture {
        repository: Arc<InMemoryOrderRepository>,
        cache: Arc<OrderCache>,
        service: Arc<OrderLookupService>,
        metrics: Arc<Metrics>,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let cache = Arc::new(OrderCache::new(8).unwrap());
        let metrics = Arc::new(Metrics::new().unwrap());
        let service = Arc::new(OrderLookupService::new(
            cache.clone(),
            repository.clone(),
            metrics.clone(),
        ));
        Fixture {
            repository,
            cache,
            service,
            metrics,
        }
    }

    macro_rules! app {
        ($f:expr) => {
            test::init_service(
                App::new()
                    .wrap(cors_headers())
                    .app_data(web::Data::from($f.service.clone()))
                    .app_data(web::Data::from($f.metrics.clone()))
                    .configure(configure),
            )
            .await
        };
    }

    fn order(order_uid: &str) -> Order {
        Order::from_json(
            serde_json::json!({
                "order_uid": order_uid,
                "track_number": "WBILMTESTTRACK",
                "delivery": {"name": "A", "phone": "1"},
                "payment": {"transaction": "t1", "amount": 1817},
                "items": [{"chrt_id": 9934930, "name": "Mascaras", "price": 453}],
            })
            .to_string()
            .as_bytes(),
        )
        .unwrap()
    }

    #[actix_web::test]
    async fn test_get_order_from_store() {
        let f = fixture();
        let uid = uuid::Uuid::new_v4().to_string();
        f.repository.persist_order(&order(&uid)).await.unwrap();
        let app = app!(f);

        let req = test::TestRequest::get().uri(&format!("/order/{uid}")).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );

        let body: Order = test::read_body_json(resp).await;
        assert_eq!(body, order(&uid));
        assert!(f.cache.contains(&uid));
        assert_eq!(f.metrics.order_lookups.with_label_values(&["store", "200"]).get(), 1);
    }

    #[actix_web::test]
    async fn test_scenario_a_order_served_from_cache() {
        let f = fixture();
        f.cache.set("abc123", order("abc123")).unwrap();
        let app = app!(f);

        let req = test::TestRequest::get().uri("/order/abc123").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["order_uid"], "abc123");
        assert_eq!(body["delivery"]["name"], "A");
        assert_eq!(body["payment"]["transaction"], "t1");
        assert_eq!(f.repository.find_calls(), 0);
    }

    #[actix_web::test]
    async fn test_missing_id_is_bad_request() {
        let f = fixture();
        let app = app!(f);

        let req = test::TestRequest::get().uri("/order/").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({"error": "Order ID is required"}));
    }

    #[actix_web::test]
    async fn test_unknown_order_is_not_found() {
        let f = fixture();
        let app = app!(f);

        let req = test::TestRequest::get().uri("/order/nope").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({"error": "Order not found"}));
        assert!(f.cache.is_empty());
    }

    #[actix_web::test]
    async fn test_store_failure_is_internal_error() {
        let f = fixture();
        f.repository.fail_reads(true);
        let app = app!(f);

        let req = test::TestRequest::get().uri("/order/abc123").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Failed to load order");
    }

    #[actix_web::test]
    async fn test_health_reports_store_state() {
        let f = fixture();
        let app = app!(f);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["cache_capacity"], 8);

        f.repository.fail_reads(true);
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_registry() {
        let f = fixture();
        let app = app!(f);

        let req = test::TestRequest::get().uri("/order/nope").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("order_lookups_total"));
        assert!(text.contains("cache_lookups_total"));
    }
}
