use actix_web::http::header::{self, HeaderMap};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;
use secrecy::ExposeSecret;
use subtle::ConstantTimeEq;

use crate::{
    config::GoogleSheetsSettings,
    domain::{
        new_subscriber::{NewSubscriber, NewSubscriberBody},
        subscription_record::SubscriptionRecord,
    },
    errors::error_chain_fmt,
    google_auth::{GoogleAuthClient, GoogleAuthError, ServiceAccount},
    sheets_client::SheetsClient,
    startup::ApiToken,
};

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Email is required.")]
    ValidationError(String),
    #[error("Sheet ID is not configured.")]
    SheetNotConfigured,
    #[error("Failed to store email.")]
    TokenError(#[from] GoogleAuthError),
    #[error("Failed to store email.")]
    AppendError(#[source] reqwest::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscribeError::ValidationError(reason) => write!(f, "{} ({})", self, reason),
            _ => error_chain_fmt(self, f),
        }
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            SubscribeError::Unauthorized => StatusCode::UNAUTHORIZED,
            SubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscribeError::SheetNotConfigured
            | SubscribeError::TokenError(_)
            | SubscribeError::AppendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Only the display message reaches the caller, the cause chain stays in the logs
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[tracing::instrument(
    name = "Adding a new subscriber to the waitlist",
    skip(request, body, sheets_settings, api_token, auth_client, sheets_client),
    fields(subscriber_email = tracing::field::Empty)
)]
pub async fn handle_subscribe(
    request: HttpRequest,
    body: web::Bytes,
    sheets_settings: web::Data<GoogleSheetsSettings>,
    api_token: web::Data<ApiToken>,
    auth_client: web::Data<GoogleAuthClient>,
    sheets_client: web::Data<SheetsClient>,
) -> Result<HttpResponse, SubscribeError> {
    check_api_token(request.headers(), &api_token)?;

    let new_subscriber: NewSubscriber = NewSubscriberBody::from_bytes(&body)
        .try_into()
        .map_err(SubscribeError::ValidationError)?;
    tracing::Span::current().record(
        "subscriber_email",
        tracing::field::display(&new_subscriber.email),
    );

    let sheet_id = sheets_settings
        .get_sheet_id()
        .ok_or(SubscribeError::SheetNotConfigured)?;
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(String::from);

    if let Err(err) = store_subscription(
        &auth_client,
        &sheets_client,
        &sheets_settings,
        sheet_id,
        new_subscriber,
        user_agent,
    )
    .await
    {
        tracing::error!("Failed to store subscription: {:?}", err);
        return Err(err);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "ok": true })))
}

/// Fallback for every method other than POST on the subscribe resource.
pub async fn handle_subscribe_method_not_allowed() -> Result<HttpResponse, SubscribeError> {
    Err(SubscribeError::MethodNotAllowed)
}

#[tracing::instrument(
    name = "Store a subscription in Google Sheets",
    skip(auth_client, sheets_client, sheets_settings, new_subscriber, user_agent)
)]
async fn store_subscription(
    auth_client: &GoogleAuthClient,
    sheets_client: &SheetsClient,
    sheets_settings: &GoogleSheetsSettings,
    sheet_id: &str,
    new_subscriber: NewSubscriber,
    user_agent: Option<String>,
) -> Result<(), SubscribeError> {
    let service_account = ServiceAccount::from_settings(sheets_settings)?;
    let access_token = auth_client
        .fetch_access_token(&service_account, Utc::now())
        .await?;
    let record = SubscriptionRecord::new(new_subscriber, user_agent, Utc::now());

    sheets_client
        .append_row(
            access_token,
            sheet_id,
            sheets_settings.get_tab_name(),
            &record,
        )
        .await
        .map_err(SubscribeError::AppendError)
}

fn check_api_token(headers: &HeaderMap, api_token: &ApiToken) -> Result<(), SubscribeError> {
    let expected = match &api_token.0 {
        Some(expected) => expected,
        None => return Ok(()),
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(provided) if tokens_match(provided, expected.expose_secret()) => Ok(()),
        _ => Err(SubscribeError::Unauthorized),
    }
}

/// Compares in constant time for equal lengths.
fn tokens_match(provided: &str, expected: &str) -> bool {
    bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
}
