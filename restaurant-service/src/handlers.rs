use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Html,
    Json,
};
use common_auth::resolve_token;
use common_http_errors::ApiError;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::accounts;
use crate::app::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::extract::{ApiJson, ApiPath, OptionalJson};
use crate::guard::AuthenticatedUser;
use crate::menu;
use crate::orders::{self, OrderStatus, StatusChange};
use crate::store::{Item, NewItem, Stats, UserRecord};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Body carried by privileged requests that have nothing else to say.
#[derive(Debug, Default, Deserialize)]
pub struct TokenBody {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MenuItemInput {
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Deserialize)]
pub struct AddMenuRequest {
    #[serde(default)]
    pub token: Option<String>,
    pub item: MenuItemInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: &'static str,
    pub user: UserRecord,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct MenuItemResponse {
    pub success: bool,
    pub item: Item,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct OrderPlacedResponse {
    pub success: bool,
    pub order_id: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub order_id: i64,
    /// `None` once the order has been served and removed.
    pub status: Option<OrderStatus>,
    pub removed: bool,
}

async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    body_token: Option<&str>,
) -> ServiceResult<AuthenticatedUser> {
    let token = resolve_token(headers, body_token)?;
    state.guard.resolve(&token).await
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ServiceResult<Json<SignupResponse>> {
    let user = accounts::signup(state.store.as_ref(), &body.username, &body.password).await?;
    Ok(Json(SignupResponse { message: "User created", user }))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Credentials>,
) -> ServiceResult<Json<LoginResponse>> {
    let result = accounts::login(state.store.as_ref(), &state.signer, &body.username, &body.password).await;
    let outcome = if result.is_ok() { "success" } else { "failure" };
    state.metrics.logins_total.with_label_values(&[outcome]).inc();

    let issued = result?;
    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: issued.token_type,
        expires_in: issued.expires_in,
    }))
}

/// Adding to the menu reports a missing admin role as 400, unlike the other admin routes.
pub async fn add_menu_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<AddMenuRequest>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let requester = authenticate(&state, &headers, body.token.as_deref()).await?;
    let item = NewItem { name: body.item.name, price: body.item.price };
    let item = menu::add_item(state.store.as_ref(), &requester, item)
        .await
        .map_err(|err| match err {
            ServiceError::Forbidden { required } => {
                ApiError::bad_request("missing_role", format!("you are not an {required}"))
            }
            other => other.into(),
        })?;
    Ok(Json(MenuItemResponse { success: true, item }))
}

pub async fn remove_menu_item(
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<i64>,
    headers: HeaderMap,
    OptionalJson(body): OptionalJson<TokenBody>,
) -> ServiceResult<(StatusCode, Json<SuccessResponse>)> {
    let requester = authenticate(&state, &headers, body.token.as_deref()).await?;
    menu::remove_item(state.store.as_ref(), &requester, item_id).await?;
    Ok((StatusCode::ACCEPTED, Json(SuccessResponse { success: true })))
}

pub async fn list_menu(State(state): State<AppState>) -> ServiceResult<Json<Vec<Item>>> {
    Ok(Json(menu::list_items(state.store.as_ref()).await?))
}

pub async fn place_order(
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<i64>,
    headers: HeaderMap,
    OptionalJson(body): OptionalJson<PlaceOrderRequest>,
) -> ServiceResult<(StatusCode, Json<OrderPlacedResponse>)> {
    let user = authenticate(&state, &headers, body.token.as_deref()).await?;
    let price = orders::price_for(state.store.as_ref(), item_id, body.price).await?;

    let placed = orders::place_order(state.store.as_ref(), &user, item_id, price).await?;
    state.metrics.orders_placed_total.inc();
    if !placed.stats_recorded {
        state.metrics.stats_update_failures_total.inc();
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(OrderPlacedResponse { success: true, order_id: placed.order.id }),
    ))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<i64>,
    headers: HeaderMap,
    OptionalJson(body): OptionalJson<TokenBody>,
) -> ServiceResult<Json<StatusResponse>> {
    let requester = authenticate(&state, &headers, body.token.as_deref()).await?;

    let response = match orders::advance_status(state.store.as_ref(), &requester, order_id).await? {
        StatusChange::Advanced { order_id, to, .. } => {
            state.metrics.order_status_transitions_total.with_label_values(&[to.as_str()]).inc();
            StatusResponse { order_id, status: Some(to), removed: false }
        }
        StatusChange::Removed { order_id } => {
            state.metrics.order_status_transitions_total.with_label_values(&["removed"]).inc();
            StatusResponse { order_id, status: None, removed: true }
        }
    };
    Ok(Json(response))
}

pub async fn revenue(
    State(state): State<AppState>,
    headers: HeaderMap,
    OptionalJson(body): OptionalJson<TokenBody>,
) -> ServiceResult<Json<Stats>> {
    let requester = authenticate(&state, &headers, body.token.as_deref()).await?;
    Ok(Json(orders::revenue_snapshot(state.store.as_ref(), &requester).await?))
}

pub async fn documentation(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    match tokio::fs::read_to_string(&state.config.docs_path).await {
        Ok(page) => Ok(Html(page)),
        Err(err) => {
            error!(path = %state.config.docs_path.display(), error = %err, "Failed to read documentation");
            Err(ApiError::internal("documentation unavailable"))
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics.render() {
        Ok(text) => (StatusCode::OK, text),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, format!("metrics encode error: {err}")),
    }
}

