use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::commerce::Order;
use crate::config::WsPayConfig;
use crate::error::{AppError, AppResult};
use crate::payments::signature::signatures_match;
use crate::payments::types::{CallbackOutcome, PaymentChoice, PaymentRequest, PaymentView};

/// Header carrying the one-shot message for the page the customer lands on
pub const FLASH_HEADER: HeaderName = HeaderName::from_static("x-flash-message");

const DEFAULT_LOCALE: &str = "hr";

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    cart: Option<String>,
}

impl CartQuery {
    fn cart_id(&self) -> Option<i64> {
        self.cart.as_deref().and_then(|id| id.trim().parse().ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChoiceQuery {
    cart: i64,
}

pub async fn payment_choice(
    State(state): State<AppState>,
    Query(query): Query<ChoiceQuery>,
) -> AppResult<Json<PaymentChoice>> {
    let choice = state.provider.payment_choice(query.cart).await?;
    Ok(Json(choice))
}

pub async fn select_payment(
    State(state): State<AppState>,
    Query(query): Query<ChoiceQuery>,
) -> AppResult<Json<PaymentChoice>> {
    let choice = state.provider.select_payment(query.cart).await?;
    Ok(Json(choice))
}

pub async fn payment_view(
    State(state): State<AppState>,
    Query(query): Query<CartQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let view = state
        .provider
        .payment_view(query.cart_id(), locale(&headers))
        .await?;

    match view {
        PaymentView::Render { cart, form } => {
            let html = state.views.payment(&cart, &form)?;
            Ok(Html(html).into_response())
        }
        PaymentView::Redirect(location) => Ok(redirect(&location, None)),
    }
}

pub async fn payment_request(
    State(state): State<AppState>,
    Query(query): Query<CartQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let Some(cart_id) = query.cart_id() else {
        return Ok(redirect(&state.config.wspay.cart_url, None));
    };

    match state.provider.payment_request(cart_id, locale(&headers)).await? {
        PaymentRequest::Script(script) => Ok((
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            script,
        )
            .into_response()),
        PaymentRequest::Redirect(location) => Ok(redirect(&location, None)),
    }
}

pub async fn return_callback(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let outcome = state.provider.handle_return(&query).await?;
    outcome_response(&state, outcome)
}

pub async fn error_callback(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let outcome = state.provider.handle_error(shopping_cart_id(&query)).await?;
    outcome_response(&state, outcome)
}

pub async fn cancel_callback(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let outcome = state.provider.handle_cancel(shopping_cart_id(&query)).await?;
    outcome_response(&state, outcome)
}

pub async fn acknowledge(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<Order>> {
    require_admin(&state.config.wspay, &headers)?;
    let order = state.provider.acknowledge_payment(order_id).await?;
    Ok(Json(order))
}

fn outcome_response(state: &AppState, outcome: CallbackOutcome) -> AppResult<Response> {
    match outcome {
        CallbackOutcome::Redirect { location, message } => {
            Ok(redirect(&location, message.as_deref()))
        }
        CallbackOutcome::Render { page, message } => {
            let html = state.views.page(page, message.as_deref())?;
            Ok(Html(html).into_response())
        }
    }
}

/// See-other redirect, with the flash message attached when it fits in a header.
fn redirect(location: &str, message: Option<&str>) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(message) = message {
        match HeaderValue::from_str(message) {
            Ok(value) => {
                headers.insert(FLASH_HEADER, value);
            }
            Err(_) => debug!("Flash message is not a valid header value, dropping it"),
        }
    }
    (headers, Redirect::to(location)).into_response()
}

/// Bearer token check for shop staff operations.
fn require_admin(config: &WsPayConfig, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = config.admin_token() else {
        return Err(AppError::unauthorized("admin access is not configured"));
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

    if !signatures_match(expected, provided.trim()) {
        warn!("Rejected admin request with an invalid token");
        return Err(AppError::unauthorized("invalid bearer token"));
    }
    Ok(())
}

fn shopping_cart_id(query: &HashMap<String, String>) -> Option<i64> {
    query
        .get("ShoppingCartID")
        .and_then(|id| id.trim().parse().ok())
}

/// First language tag of the Accept-Language header.
fn locale(headers: &HeaderMap) -> &str {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split([',', ';']).next())
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .unwrap_or(DEFAULT_LOCALE)
}
