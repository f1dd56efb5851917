//! HTTP client and sub-clients for the site backend.
//!
//! The main entry point is [`ApiClient`], which is built via
//! [`ApiClientBuilder`] or straight from an [`ApiConfig`]. Sub-clients for each
//! backend area are accessible via methods on the main client.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::api::error::{body_message, ApiError, ApiResult};
use crate::api::models::*;
use crate::config::ApiConfig;

/// Header carrying the per-submission idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Internal shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

/// Per-call options layered over the client defaults.
#[derive(Debug, Clone, Copy, Default)]
struct CallOptions<'a> {
    bearer: Option<&'a str>,
    idempotency_key: Option<&'a str>,
    timeout: Option<Duration>,
    single_attempt: bool,
}

impl ClientInner {
    /// Build the full URL for an API path. Paths resolve under the base URL,
    /// so a prefix such as `https://host/backend/` is kept.
    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(ApiError::UrlParse)
    }

    /// Execute a request, retrying transient failures with a fixed delay.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        opts: CallOptions<'_>,
    ) -> ApiResult<T> {
        let url = self.url(path)?;
        let timeout = opts.timeout.unwrap_or(self.timeout);
        let attempts = if opts.single_attempt {
            1
        } else {
            self.max_retries + 1
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!(%method, %url, attempt, "api request");
            let result = self
                .send_once(method.clone(), url.clone(), body.as_ref(), &opts, timeout)
                .await;

            match result {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && err.is_retryable() => {
                    warn!(%url, attempt, error = %err, "api request failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        opts: &CallOptions<'_>,
        timeout: Duration,
    ) -> ApiResult<T> {
        let mut req = self.http.request(method, url).timeout(timeout);
        if let Some(token) = opts.bearer {
            req = req.bearer_auth(token);
        }
        if let Some(key) = opts.idempotency_key {
            req = req.header(IDEMPOTENCY_KEY_HEADER, key);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|err| classify(err, timeout))?;
        Self::handle_response(resp, timeout).await
    }

    /// Process an HTTP response, returning the deserialized body or an error.
    async fn handle_response<T: DeserializeOwned>(
        resp: reqwest::Response,
        timeout: Duration,
    ) -> ApiResult<T> {
        let status = resp.status();
        let text = resp.text().await.map_err(|err| classify(err, timeout))?;

        if status.is_success() {
            let value = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text)?
            };
            Ok(serde_json::from_value(value)?)
        } else {
            let reason = status.canonical_reason().unwrap_or("Request failed");
            let body = serde_json::from_str::<Value>(&text)
                .unwrap_or_else(|_| json!({ "message": reason }));
            let message = body_message(&body).unwrap_or(reason).to_string();
            Err(ApiError::Status {
                status: status.as_u16(),
                message,
                body,
            })
        }
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        opts: CallOptions<'_>,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body)?;
        self.call(Method::POST, path, Some(body), opts).await
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(timeout)
    } else {
        ApiError::Network(err)
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// The site backend client.
///
/// ```rust,no_run
/// use haile_site::api::ApiClient;
///
/// # async fn example() -> Result<(), haile_site::api::ApiError> {
/// let client = ApiClient::builder("http://localhost:3000").build()?;
/// let ok = client.health().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Start building a new client.
    pub fn builder(base_url: &str) -> ApiClientBuilder {
        let defaults = ApiConfig::default();
        ApiClientBuilder {
            base_url: base_url.to_string(),
            timeout: defaults.timeout(),
            max_retries: defaults.max_retries,
            retry_delay: defaults.retry_delay(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Self::builder(&config.base_url)
            .timeout(config.timeout())
            .max_retries(config.max_retries)
            .retry_delay(config.retry_delay())
            .build()
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // -- Health ---------------------------------------------------------------

    /// Check whether the backend is reachable and healthy. Never fails.
    pub async fn health(&self) -> bool {
        let opts = CallOptions {
            timeout: Some(HEALTH_TIMEOUT),
            ..Default::default()
        };
        self.inner
            .call::<Value>(Method::GET, "/api/health", None, opts)
            .await
            .is_ok()
    }

    // -- Sub-clients ----------------------------------------------------------

    /// Access payment intent creation and capture.
    pub fn payments(&self) -> PaymentsClient {
        PaymentsClient {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Access account endpoints.
    pub fn auth(&self) -> AuthClient {
        AuthClient {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Access contact and registration submissions.
    pub fn forms(&self) -> FormsClient {
        FormsClient {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Access blog posts.
    pub fn blogs(&self) -> BlogsClient {
        BlogsClient {
            inner: Arc::clone(&self.inner),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl ApiClientBuilder {
    /// Per-attempt request timeout (default: 8s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries after the first attempt (default: 2).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Fixed delay between attempts (default: 1s).
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Build the client.
    pub fn build(self) -> ApiResult<ApiClient> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(ApiError::Config("base URL is empty".to_string()));
        }
        let mut base_url: Url = trimmed
            .parse()
            .map_err(|e: url::ParseError| ApiError::Config(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                max_retries: self.max_retries,
                retry_delay: self.retry_delay,
            }),
        })
    }
}

// ---------------------------------------------------------------------------
// PaymentsClient
// ---------------------------------------------------------------------------

/// Sub-client for payment intents.
#[derive(Debug, Clone)]
pub struct PaymentsClient {
    inner: Arc<ClientInner>,
}

impl PaymentsClient {
    /// Create a payment intent. Sent once; the backend deduplicates any
    /// resubmission carrying the same `idempotency_key`.
    pub async fn create_intent(
        &self,
        req: &CreateIntentRequest,
        idempotency_key: &str,
    ) -> ApiResult<CreatedIntent> {
        let opts = CallOptions {
            idempotency_key: Some(idempotency_key),
            single_attempt: true,
            ..Default::default()
        };
        self.inner.post("/api/payments/intents", req, opts).await
    }

    /// Capture an authorized intent. Issued exactly once.
    pub async fn capture(&self, payment_intent_id: &str) -> ApiResult<Value> {
        let opts = CallOptions {
            single_attempt: true,
            ..Default::default()
        };
        let req = CaptureRequest {
            payment_intent_id: payment_intent_id.to_string(),
        };
        self.inner.post("/api/payments/capture", &req, opts).await
    }
}

// ---------------------------------------------------------------------------
// AuthClient
// ---------------------------------------------------------------------------

/// Sub-client for account endpoints.
#[derive(Debug, Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

impl AuthClient {
    pub async fn login(&self, req: &LoginRequest) -> ApiResult<LoginResponse> {
        self.inner
            .post("/api/auth/login", req, CallOptions::default())
            .await
    }

    pub async fn register(&self, req: &RegisterRequest) -> ApiResult<Value> {
        self.inner
            .post("/api/auth/register", req, CallOptions::default())
            .await
    }

    pub async fn forgot_password(&self, req: &ForgotPasswordRequest) -> ApiResult<Value> {
        self.inner
            .post("/api/auth/forgot-password", req, CallOptions::default())
            .await
    }

    pub async fn reset_password(&self, req: &ResetPasswordRequest) -> ApiResult<Value> {
        self.inner
            .post("/api/auth/reset-password", req, CallOptions::default())
            .await
    }

    /// Fetch the user the token belongs to.
    pub async fn me(&self, token: &str) -> ApiResult<User> {
        let opts = CallOptions {
            bearer: Some(token),
            ..Default::default()
        };
        self.inner.call(Method::GET, "/api/auth/me", None, opts).await
    }

    pub async fn logout(&self, token: &str) -> ApiResult<Value> {
        let opts = CallOptions {
            bearer: Some(token),
            ..Default::default()
        };
        self.inner
            .call(Method::POST, "/api/auth/logout", None, opts)
            .await
    }
}

// ---------------------------------------------------------------------------
// FormsClient
// ---------------------------------------------------------------------------

/// Sub-client for contact and registration submissions.
#[derive(Debug, Clone)]
pub struct FormsClient {
    inner: Arc<ClientInner>,
}

impl FormsClient {
    pub async fn submit_contact(&self, req: &ContactSubmission) -> ApiResult<SubmissionAck> {
        let body: Value = self
            .inner
            .post("/api/contacts", req, CallOptions::default())
            .await?;
        Ok(SubmissionAck::from_body(&body))
    }

    pub async fn register_child(&self, req: &ChildRegistration) -> ApiResult<SubmissionAck> {
        let body: Value = self
            .inner
            .post("/api/registrations", req, CallOptions::default())
            .await?;
        Ok(SubmissionAck::from_body(&body))
    }
}

// ---------------------------------------------------------------------------
// BlogsClient
// ---------------------------------------------------------------------------

/// Sub-client for blog posts. Reads are public; writes need an admin token.
#[derive(Debug, Clone)]
pub struct BlogsClient {
    inner: Arc<ClientInner>,
}

impl BlogsClient {
    pub async fn list(&self) -> ApiResult<Vec<BlogPost>> {
        self.inner
            .call(Method::GET, "/api/blogs", None, CallOptions::default())
            .await
    }

    pub async fn get(&self, id: &str) -> ApiResult<BlogPost> {
        let path = format!("/api/blogs/{id}");
        self.inner
            .call(Method::GET, &path, None, CallOptions::default())
            .await
    }

    /// Create a post. Sent once so a slow response never publishes twice.
    pub async fn create(&self, draft: &BlogDraft, token: &str) -> ApiResult<Value> {
        let opts = CallOptions {
            bearer: Some(token),
            single_attempt: true,
            ..Default::default()
        };
        self.inner.post("/api/blogs", draft, opts).await
    }

    pub async fn update(&self, id: &str, draft: &BlogDraft, token: &str) -> ApiResult<Value> {
        let opts = CallOptions {
            bearer: Some(token),
            ..Default::default()
        };
        let path = format!("/api/blogs/{id}");
        let body = serde_json::to_value(draft)?;
        self.inner.call(Method::PUT, &path, Some(body), opts).await
    }

    pub async fn delete(&self, id: &str, token: &str) -> ApiResult<Value> {
        let opts = CallOptions {
            bearer: Some(token),
            ..Default::default()
        };
        let path = format!("/api/blogs/{id}");
        self.inner.call(Method::DELETE, &path, None, opts).await
    }
}
