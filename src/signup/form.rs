use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::new_subscriber::DEFAULT_SOURCE;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::signup::seen_list::{SeenStore, SeenStoreError};

pub const DEFAULT_ENDPOINT: &str = "/api/subscribe";

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum SignupError {
    #[error("Please enter a valid email.")]
    EmptyEmail,
    #[error("Email endpoint is not configured yet.")]
    EndpointNotConfigured,
    #[error("This email is already on the list.")]
    AlreadyOnList,
    #[error("Could not submit. Please try again.")]
    RequestFailed(#[source] reqwest::Error),
    #[error("Could not submit. Please try again.")]
    StorageFailed(#[from] SeenStoreError),
}

/// Where the form posts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A full URL on another origin. The response is opaque to the page, so
    /// only transport failures are noticed.
    CrossOrigin(String),
    /// A path on the page's own origin, resolved to a full URL.
    SameOrigin(String),
}

impl Endpoint {
    /// `configured` falls back to [`DEFAULT_ENDPOINT`] when unset or empty.
    /// Paths need the page `origin` to resolve.
    pub fn resolve(configured: Option<&str>, origin: Option<&str>) -> Option<Endpoint> {
        let configured = configured
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT);

        if configured.starts_with("http") {
            return Some(Endpoint::CrossOrigin(String::from(configured)));
        }

        let origin = origin
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty())?;
        let path = configured.trim_start_matches('/');

        Some(Endpoint::SameOrigin(format!("{}/{}", origin, path)))
    }
}

/// The waitlist form: input field, submitted flag and the message shown to
/// the visitor.
pub struct SignupForm<S> {
    http_client: Client,
    endpoint: Option<Endpoint>,
    api_token: Option<Secret<String>>,
    store: S,
    pub email: String,
    submitted: bool,
    error: Option<String>,
}

impl<S: SeenStore> SignupForm<S> {
    pub fn new(
        endpoint: Option<Endpoint>,
        api_token: Option<Secret<String>>,
        store: S,
        timeout: Option<time::Duration>,
    ) -> Result<SignupForm<S>, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(SignupForm {
            http_client,
            endpoint,
            api_token,
            store,
            email: String::new(),
            submitted: false,
            error: None,
        })
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Submits the current input. On success the form is marked submitted and
    /// the input cleared; on failure the error message is kept for display.
    #[tracing::instrument(name = "Submitting the waitlist form", skip(self))]
    pub async fn submit(&mut self) -> Result<SubscriberEmail, SignupError> {
        self.error = None;

        match self.try_submit().await {
            Ok(email) => {
                self.submitted = true;
                self.email.clear();
                Ok(email)
            }
            Err(err) => {
                tracing::warn!("Waitlist submission rejected: {:?}", err);
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn try_submit(&mut self) -> Result<SubscriberEmail, SignupError> {
        let email =
            SubscriberEmail::normalize(&self.email).map_err(|_| SignupError::EmptyEmail)?;
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or(SignupError::EndpointNotConfigured)?;

        let mut seen = self.store.load();
        if seen.contains(email.as_ref()) {
            return Err(SignupError::AlreadyOnList);
        }

        self.send(endpoint, &email)
            .await
            .map_err(SignupError::RequestFailed)?;

        seen.push(String::from(email.as_ref()));
        self.store.save(&seen)?;

        Ok(email)
    }

    async fn send(
        &self,
        endpoint: &Endpoint,
        email: &SubscriberEmail,
    ) -> Result<(), reqwest::Error> {
        let body = serde_json::json!({
            "email": email.as_ref(),
            "source": DEFAULT_SOURCE,
        });

        match endpoint {
            Endpoint::CrossOrigin(url) => {
                // Plain text keeps the request simple enough to skip a CORS preflight
                self.http_client
                    .post(url)
                    .header(CONTENT_TYPE, "text/plain")
                    .body(body.to_string())
                    .send()
                    .await?;
            }
            Endpoint::SameOrigin(url) => {
                let mut request = self.http_client.post(url).json(&body);

                if let Some(api_token) = &self.api_token {
                    request = request.bearer_auth(api_token.expose_secret());
                }

                request.send().await?.error_for_status()?;
            }
        }

        Ok(())
    }
}
