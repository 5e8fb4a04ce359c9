//! `reqwest` implementation of the auth gateway.

use super::{AuthGateway, GatewayError, LoginGrant, NewAccount};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, info_span, Instrument};
use url::Url;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

const LOGIN_PATH: &str = "/api/v1/login/";
const LOGOUT_PATH: &str = "/api/v1/logout/";
const REGISTER_PATH: &str = "/api/v1/register/user/";
const ACTIVATE_PATH: &str = "/api/v1/activate/";
const FORGOT_PASSWORD_PATH: &str = "/api/v1/forgot-password/";
const RESET_PASSWORD_PATH: &str = "/api/v1/password-reset/new-password/";

fn error_message(json_response: &Value) -> &str {
    json_response
        .get("detail")
        .and_then(Value::as_str)
        .or_else(|| {
            json_response
                .get("non_field_errors")
                .and_then(|v| v.get(0))
                .and_then(Value::as_str)
        })
        .unwrap_or("")
}

// Maps the statuses every endpoint shares; callers handle
// endpoint-specific ones (404 email, 409 register, token rejections)
// before falling back to this.
async fn error_from(response: Response) -> GatewayError {
    let status = response.status();
    let json_response: Value = response.json().await.unwrap_or(Value::Null);
    let message = error_message(&json_response);

    match status {
        StatusCode::UNAUTHORIZED => GatewayError::InvalidCredentials,
        StatusCode::FORBIDDEN => GatewayError::NotActivated,
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited,
        _ => GatewayError::Rejected(if message.is_empty() {
            status.to_string()
        } else {
            message.to_string()
        }),
    }
}

fn base_url(url: &str) -> Result<String, GatewayError> {
    let url = Url::parse(url).map_err(|err| GatewayError::Transport(err.to_string()))?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| GatewayError::Transport("no host in base URL".to_string()))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => {
                return Err(GatewayError::Transport(format!(
                    "unsupported scheme {scheme}"
                )))
            }
        },
    };

    Ok(format!("{scheme}://{host}:{port}"))
}

/// HTTP client for the storefront's REST auth endpoints.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    /// # Errors
    ///
    /// Returns an error if `url` cannot be parsed, has no host, or uses an
    /// unsupported scheme, or if the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self, GatewayError> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;
        let base_url = base_url(url)?;

        Ok(Self { client, base_url })
    }

    fn endpoint_url(&self, path: &str) -> String {
        let endpoint_url = format!("{}{path}", self.base_url);

        debug!("endpoint URL: {}", endpoint_url);

        endpoint_url
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginGrant, GatewayError> {
        let login_url = self.endpoint_url(LOGIN_PATH);

        let payload = json!({
            "email": email,
            "password": password.expose_secret(),
        });

        let span = info_span!(
            "gateway.login",
            http.method = "POST",
            url = %login_url
        );
        let response = self
            .client
            .post(&login_url)
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let grant: LoginGrant = response.json().await?;

        Ok(grant)
    }

    async fn logout(&self, access_token: &str) -> Result<(), GatewayError> {
        let logout_url = self.endpoint_url(LOGOUT_PATH);

        let span = info_span!(
            "gateway.logout",
            http.method = "POST",
            url = %logout_url
        );
        let response = self
            .client
            .post(&logout_url)
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .instrument(span)
            .await?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        Ok(())
    }

    async fn register(&self, account: &NewAccount) -> Result<(), GatewayError> {
        let register_url = self.endpoint_url(REGISTER_PATH);

        let payload = json!({
            "email": account.email,
            "first_name": account.first_name,
            "last_name": account.last_name,
            "password": account.password.expose_secret(),
            "password_confirmation": account.password_confirmation.expose_secret(),
        });

        let span = info_span!(
            "gateway.register",
            http.method = "POST",
            url = %register_url
        );
        let response = self
            .client
            .post(&register_url)
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(GatewayError::EmailTaken);
        }
        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        Ok(())
    }

    async fn activate(&self, token: &str) -> Result<(), GatewayError> {
        let activate_url = format!("{}{token}/", self.endpoint_url(ACTIVATE_PATH));

        let span = info_span!(
            "gateway.activate",
            http.method = "POST",
            url = %activate_url
        );
        let response = self
            .client
            .post(&activate_url)
            .send()
            .instrument(span)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(GatewayError::InvalidToken)
            }
            _ => Err(error_from(response).await),
        }
    }

    async fn forgot_password(&self, email: &str) -> Result<(), GatewayError> {
        let forgot_url = self.endpoint_url(FORGOT_PASSWORD_PATH);

        let payload = json!({ "email": email });

        let span = info_span!(
            "gateway.forgot_password",
            http.method = "POST",
            url = %forgot_url
        );
        let response = self
            .client
            .post(&forgot_url)
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // The session manager folds this into the generic reply.
            StatusCode::NOT_FOUND => Err(GatewayError::EmailNotFound),
            _ => Err(error_from(response).await),
        }
    }

    async fn reset_password(
        &self,
        token: &str,
        password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<(), GatewayError> {
        let reset_url = format!("{}{token}/", self.endpoint_url(RESET_PASSWORD_PATH));

        let payload = json!({
            "password": password.expose_secret(),
            "password_confirmation": confirmation.expose_secret(),
        });

        let span = info_span!(
            "gateway.reset_password",
            http.method = "PATCH",
            url = %reset_url
        );
        let response = self
            .client
            .patch(&reset_url)
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(GatewayError::InvalidToken),
            _ => Err(error_from(response).await),
        }
    }
}
