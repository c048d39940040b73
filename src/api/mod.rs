//! HTTP surface of the gateway integration

pub mod health;
pub mod wspay;

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::commerce::CommerceStore;
use crate::config::Config;
use crate::payments::traits::PaymentProvider;
use crate::views::Views;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn CommerceStore>,
    pub provider: Arc<dyn PaymentProvider>,
    pub views: Arc<Views>,
}

const NEVER_CACHE: &str = "no-cache, no-store, must-revalidate, max-age=0";

/// Build the application router
pub fn router(state: AppState) -> Router {
    let prefix = format!("/{}", state.provider.namespace());
    let path = |suffix: &str| format!("{}{}", prefix, suffix);

    let payments = Router::new()
        .route(&path("/"), get(wspay::payment_view))
        .route(
            &path("/choice"),
            get(wspay::payment_choice).post(wspay::select_payment),
        )
        .route(&path("/request"), get(wspay::payment_request))
        .route(&path("/return/"), get(wspay::return_callback))
        .route(&path("/error/"), get(wspay::error_callback))
        .route(&path("/cancel/"), get(wspay::cancel_callback))
        // Staff only, guarded by the admin bearer token.
        .route(&path("/orders/:id/acknowledge"), post(wspay::acknowledge))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NEVER_CACHE),
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(payments)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
