//! `HttpGateway` against an in-process axum stub of the storefront API:
//! status-code mapping, payload shapes, and one full manager round trip.

use anyhow::Result;
use axum::extract::Path;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{patch, post};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use vetrina_session::{
    AuthGateway, FileStore, GatewayError, HttpGateway, NewAccount, SessionManager, SessionStore,
};

async fn login(Json(body): Json<Value>) -> impl IntoResponse {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    match (email, password) {
        ("locked@shop.test", _) => (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "Account not activated"})),
        )
            .into_response(),
        ("limited@shop.test", _) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"detail": "Too many attempts"})),
        )
            .into_response(),
        ("a@b.com", "secret") => Json(json!({
            "access_token": "T",
            "id": 7,
            "name": "A",
            "is_guest": false,
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid credentials"})),
        )
            .into_response(),
    }
}

async fn logout(headers: HeaderMap) -> StatusCode {
    let bearer = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if bearer == Some("Bearer T") {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn register(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"].as_str() == Some("taken@shop.test") {
        return (
            StatusCode::CONFLICT,
            Json(json!({"detail": "Email already registered"})),
        )
            .into_response();
    }
    StatusCode::CREATED.into_response()
}

async fn activate(Path(token): Path<String>) -> StatusCode {
    if token == "good-token" {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn forgot_password(Json(body): Json<Value>) -> impl IntoResponse {
    if body["email"].as_str() == Some("ghost@x.com") {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found"}))).into_response();
    }
    StatusCode::OK.into_response()
}

async fn reset_password(Path(token): Path<String>, Json(body): Json<Value>) -> impl IntoResponse {
    if token != "good-token" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found"}))).into_response();
    }
    if body["password"].as_str().map_or(0, str::len) < 8 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"non_field_errors": ["This password is too short."]})),
        )
            .into_response();
    }
    StatusCode::OK.into_response()
}

async fn spawn_stub() -> Result<String> {
    let app = Router::new()
        .route("/api/v1/login/", post(login))
        .route("/api/v1/logout/", post(logout))
        .route("/api/v1/register/user/", post(register))
        .route("/api/v1/activate/:token/", post(activate))
        .route("/api/v1/forgot-password/", post(forgot_password))
        .route(
            "/api/v1/password-reset/new-password/:token/",
            patch(reset_password),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    Ok(format!("http://{addr}"))
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

#[tokio::test]
async fn login_returns_grant_on_success() -> Result<()> {
    let gateway = HttpGateway::new(&spawn_stub().await?)?;

    let grant = gateway.login("a@b.com", &secret("secret")).await?;

    assert_eq!(grant.access_token, "T");
    assert_eq!(grant.id, "7");
    assert_eq!(grant.name, "A");
    assert!(!grant.is_guest);
    Ok(())
}

#[tokio::test]
async fn login_maps_rejection_statuses() -> Result<()> {
    let gateway = HttpGateway::new(&spawn_stub().await?)?;

    let err = gateway.login("a@b.com", &secret("wrong")).await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidCredentials));

    let err = gateway
        .login("locked@shop.test", &secret("secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotActivated));

    let err = gateway
        .login("limited@shop.test", &secret("secret"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::RateLimited));
    Ok(())
}

#[tokio::test]
async fn logout_sends_the_bearer_credential() -> Result<()> {
    let gateway = HttpGateway::new(&spawn_stub().await?)?;

    gateway.logout("T").await?;

    let err = gateway.logout("stale").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidCredentials));
    Ok(())
}

#[tokio::test]
async fn register_maps_conflict_to_email_taken() -> Result<()> {
    let gateway = HttpGateway::new(&spawn_stub().await?)?;
    let account = NewAccount {
        email: "ann@shop.test".to_string(),
        first_name: "Ann".to_string(),
        last_name: "Lee".to_string(),
        password: secret("longenough"),
        password_confirmation: secret("longenough"),
    };

    gateway.register(&account).await?;

    let taken = NewAccount {
        email: "taken@shop.test".to_string(),
        ..account
    };
    let err = gateway.register(&taken).await.unwrap_err();
    assert!(matches!(err, GatewayError::EmailTaken));
    Ok(())
}

#[tokio::test]
async fn activate_maps_unknown_token() -> Result<()> {
    let gateway = HttpGateway::new(&spawn_stub().await?)?;

    gateway.activate("good-token").await?;

    let err = gateway.activate("stale-token").await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidToken));
    Ok(())
}

#[tokio::test]
async fn forgot_password_maps_not_found() -> Result<()> {
    let gateway = HttpGateway::new(&spawn_stub().await?)?;

    gateway.forgot_password("ann@x.com").await?;

    let err = gateway.forgot_password("ghost@x.com").await.unwrap_err();
    assert!(matches!(err, GatewayError::EmailNotFound));
    Ok(())
}

#[tokio::test]
async fn reset_password_maps_token_and_validation_failures() -> Result<()> {
    let gateway = HttpGateway::new(&spawn_stub().await?)?;

    gateway
        .reset_password("good-token", &secret("brand-new-password"), &secret("brand-new-password"))
        .await?;

    let err = gateway
        .reset_password("stale-token", &secret("brand-new-password"), &secret("brand-new-password"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidToken));

    let err = gateway
        .reset_password("good-token", &secret("short"), &secret("short"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
    Ok(())
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() -> Result<()> {
    // Grab a free port, then close it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let gateway = HttpGateway::new(&format!("http://{addr}"))?;
    let err = gateway.login("a@b.com", &secret("secret")).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
    Ok(())
}

#[tokio::test]
async fn manager_round_trip_over_http() -> Result<()> {
    let base_url = spawn_stub().await?;
    let dir = tempfile::tempdir()?;
    let store = FileStore::new(dir.path().join("session.json"));
    let manager = SessionManager::new(
        store,
        std::sync::Arc::new(HttpGateway::new(&base_url)?),
    );

    manager.bootstrap().await;
    let session = manager.log_in("a@b.com", "secret").await?;
    assert_eq!(session.id(), Some("7"));

    let persisted = FileStore::new(dir.path().join("session.json")).load()?;
    assert_eq!(persisted.map(|record| record.access_token), Some("T".to_string()));

    let session = manager.log_out().await;
    assert!(session.is_guest());
    assert_eq!(FileStore::new(dir.path().join("session.json")).load()?, None);
    Ok(())
}
