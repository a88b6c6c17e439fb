use axum::{http::{Request, StatusCode}, routing::get, Router};
use common_auth::Role;
use http_body_util::BodyExt;
use restaurant_service::store::StoreError;
use restaurant_service::ServiceError;
use tower::ServiceExt; // for oneshot

async fn respond(err: fn() -> ServiceError) -> (StatusCode, String, serde_json::Value) {
    let app = Router::new().route("/boom", get(move || async move { Err::<String, _>(err()) }));
    let req = Request::builder().uri("/boom").body(axum::body::Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let code = resp.headers().get("X-Error-Code").unwrap().to_str().unwrap().to_string();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, code, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn storage_failure_is_opaque_500() {
    let (status, code, body) =
        respond(|| ServiceError::Storage(StoreError::Database(sqlx::Error::PoolTimedOut))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(code, "internal_error");
    assert_eq!(body["error"], "storage error");
}

#[tokio::test]
async fn forbidden_names_missing_role() {
    let (status, code, body) = respond(|| ServiceError::Forbidden { required: Role::Admin }).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code, "missing_role");
    assert_eq!(body["missing_role"], "admin");
    assert_eq!(body["error"], "you are not an admin");
}

#[tokio::test]
async fn insufficient_funds_is_not_acceptable() {
    let (status, code, body) = respond(|| ServiceError::InsufficientFunds).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(code, "insufficient_funds");
    assert_eq!(body["code"], "insufficient_funds");
}

#[tokio::test]
async fn invalid_state_is_conflict() {
    let (status, code, _) =
        respond(|| ServiceError::InvalidState { order_id: 9, status: "lost".into() }).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(code, "invalid_order_state");
}
