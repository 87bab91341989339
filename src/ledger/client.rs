//! ledger::client
//!
//! Reliable delivery of prepared requests to the ledger.
//!
//! # Design
//!
//! [`DeliveryClient`] owns an auth scheme, a [`RetryPolicy`] and a dry-run
//! switch, and sends [`PreparedRequest`]s through a [`Transport`]. The body
//! is serialized once when the request is prepared and the identical bytes
//! are reused on every attempt; the ledger addresses each write by content
//! (fingerprint, flow, environment), so a retried PUT overwrites or no-ops
//! rather than duplicating.
//!
//! Each attempt moves `Pending -> Success | Retryable -> Pending | Terminal`:
//!
//! - 2xx: success; 200 means the resource was updated, any other 2xx created
//! - 5xx or a network/timeout error: retryable until attempts run out
//! - anything else: terminal, carrying the status and the ledger's body
//!
//! Backoff happens between attempts only. Attempts never overlap.
//!
//! # Example
//!
//! ```ignore
//! use trailmark::ledger::{Auth, DeliveryClient, HttpTransport, PreparedRequest, RetryPolicy};
//!
//! let policy = RetryPolicy::default();
//! let client = DeliveryClient::new(HttpTransport::new(policy.timeout)?, Auth::bearer(token), policy);
//! let request = PreparedRequest::put_json(url, &event)?;
//! match client.send(request).await? {
//!     DeliveryOutcome::Created(_) => println!("created"),
//!     DeliveryOutcome::Updated(_) => println!("updated"),
//!     DeliveryOutcome::Simulated(req) => println!("{} {}", req.method, req.url),
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::cancel::CancelSignal;

/// Errors from delivering a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The ledger answered with a non-retryable status.
    #[error("{body} (HTTP {status})")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the ledger
        body: String,
    },

    /// Every attempt failed with a retryable error.
    #[error("request failed after {attempts} attempt(s): {last_error}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Status of the last attempt, if it got a response
        status: Option<u16>,
        /// Description of the last failure
        last_error: String,
    },

    /// The operation was interrupted between attempts.
    #[error("delivery cancelled")]
    Cancelled,

    /// The request could not be constructed.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong
        message: String,
    },
}

impl DeliveryError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Rejected { status, .. } => Some(*status),
            DeliveryError::Exhausted { status, .. } => *status,
            _ => None,
        }
    }
}

/// Errors raised by a transport before a response was observed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the per-attempt timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Authentication scheme attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// No authorization header.
    None,
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// `Authorization: Basic ...`.
    Basic {
        /// User name
        username: String,
        /// Password or API token
        password: String,
    },
}

impl Auth {
    /// Bearer-token auth.
    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    /// Basic auth.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Custom Debug to avoid exposing secrets
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::None => write!(f, "Auth::None"),
            Auth::Bearer(_) => write!(f, "Auth::Bearer([redacted])"),
            Auth::Basic { username, .. } => f
                .debug_struct("Auth::Basic")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
        }
    }
}

/// Bounded-retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Pause between consecutive attempts.
    pub backoff: Duration,
    /// Upper bound on one attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(1000),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A file sent next to the JSON body as one part of a multipart form.
///
/// The bytes are read once, so every attempt uploads the same content.
#[derive(Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Form field name
    pub field: String,
    /// File name reported to the ledger
    pub file_name: String,
    /// File content
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    /// Read `path` into an attachment sent under `field`.
    pub fn read(field: impl Into<String>, path: &Path) -> Result<Self, DeliveryError> {
        let bytes = std::fs::read(path).map_err(|e| DeliveryError::InvalidRequest {
            message: format!("failed to read '{}': {e}", path.display()),
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            field: field.into(),
            file_name,
            bytes,
        })
    }
}

impl fmt::Debug for FileAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAttachment")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Form field carrying the JSON body when a request has an attachment.
pub const DATA_JSON_FIELD: &str = "data_json";

/// A fully constructed request, ready to transmit or print.
///
/// With an attachment the request goes out as `multipart/form-data`: the
/// JSON body under [`DATA_JSON_FIELD`] and the file under its own field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: Url,
    /// Serialized JSON body
    pub body: Option<String>,
    /// File uploaded alongside the body
    pub attachment: Option<FileAttachment>,
}

impl PreparedRequest {
    /// A body-less GET.
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: None,
            attachment: None,
        }
    }

    /// A PUT whose body is `payload` serialized to JSON once.
    pub fn put_json<T: Serialize>(url: Url, payload: &T) -> Result<Self, DeliveryError> {
        let body = serde_json::to_string(payload).map_err(|e| DeliveryError::InvalidRequest {
            message: e.to_string(),
        })?;
        Ok(Self {
            method: Method::PUT,
            url,
            body: Some(body),
            attachment: None,
        })
    }

    /// Send `attachment` with the body as a multipart form.
    pub fn with_attachment(mut self, attachment: FileAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// The body re-rendered with indentation, for display.
    pub fn pretty_body(&self) -> Option<String> {
        let body = self.body.as_deref()?;
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) => serde_json::to_string_pretty(&value).ok(),
            Err(_) => Some(body.to_string()),
        }
    }
}

/// A response as observed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

/// One HTTP round-trip.
///
/// Implementations must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transmit `request` once with `auth` attached.
    async fn execute(
        &self,
        request: &PreparedRequest,
        auth: &Auth,
    ) -> Result<TransportResponse, TransportError>;
}

/// A successful response from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Attempts it took, including the successful one
    pub attempts: u32,
}

/// Result of [`DeliveryClient::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The ledger created a new resource.
    Created(LedgerResponse),
    /// The ledger updated an existing resource (HTTP 200).
    Updated(LedgerResponse),
    /// Dry run: the request was built but not transmitted.
    Simulated(PreparedRequest),
}

impl DeliveryOutcome {
    /// Whether nothing was transmitted.
    pub fn is_simulated(&self) -> bool {
        matches!(self, DeliveryOutcome::Simulated(_))
    }
}

/// Bookkeeping for one send; lives only inside the retry loop.
struct DeliveryAttempt<'a> {
    request: &'a PreparedRequest,
    number: u32,
    last_status: Option<u16>,
    last_error: String,
}

impl<'a> DeliveryAttempt<'a> {
    fn new(request: &'a PreparedRequest) -> Self {
        Self {
            request,
            number: 0,
            last_status: None,
            last_error: String::new(),
        }
    }

    fn exhausted(self) -> DeliveryError {
        DeliveryError::Exhausted {
            attempts: self.number,
            status: self.last_status,
            last_error: self.last_error,
        }
    }
}

/// Sends prepared requests with retries, auth and dry-run short-circuiting.
#[derive(Debug)]
pub struct DeliveryClient<T> {
    transport: T,
    auth: Auth,
    policy: RetryPolicy,
    dry_run: bool,
    cancel: CancelSignal,
}

impl<T: Transport> DeliveryClient<T> {
    /// Create a client that transmits.
    pub fn new(transport: T, auth: Auth, policy: RetryPolicy) -> Self {
        Self {
            transport,
            auth,
            policy,
            dry_run: false,
            cancel: CancelSignal::new(),
        }
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Observe `cancel` between attempts.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether writes are simulated.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The retry policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver a write. In dry-run mode nothing is transmitted.
    pub async fn send(&self, request: PreparedRequest) -> Result<DeliveryOutcome, DeliveryError> {
        if self.dry_run {
            debug!(method = %request.method, url = %request.url, "dry run, not sending");
            return Ok(DeliveryOutcome::Simulated(request));
        }

        let response = self.transmit(&request).await?;
        if response.status == 200 {
            Ok(DeliveryOutcome::Updated(response))
        } else {
            Ok(DeliveryOutcome::Created(response))
        }
    }

    /// Perform a read. Reads have no side effects, so they are transmitted
    /// even in dry-run mode.
    pub async fn fetch(&self, request: &PreparedRequest) -> Result<LedgerResponse, DeliveryError> {
        self.transmit(request).await
    }

    async fn transmit(&self, request: &PreparedRequest) -> Result<LedgerResponse, DeliveryError> {
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = DeliveryAttempt::new(request);

        loop {
            if self.cancel.is_cancelled() {
                return Err(DeliveryError::Cancelled);
            }
            attempt.number += 1;
            debug!(
                method = %attempt.request.method,
                url = %attempt.request.url,
                attempt = attempt.number,
                max_attempts,
                "sending request"
            );

            let result = tokio::time::timeout(
                self.policy.timeout,
                self.transport.execute(attempt.request, &self.auth),
            )
            .await
            .unwrap_or(Err(TransportError::Timeout(self.policy.timeout)));

            match result {
                Ok(response) if (200..300).contains(&response.status) => {
                    debug!(status = response.status, attempt = attempt.number, "request succeeded");
                    return Ok(LedgerResponse {
                        status: response.status,
                        body: response.body,
                        attempts: attempt.number,
                    });
                }
                Ok(response) if response.status >= 500 => {
                    debug!(status = response.status, attempt = attempt.number, "server error");
                    attempt.last_status = Some(response.status);
                    attempt.last_error = format!("{} (HTTP {})", response.body, response.status);
                }
                Ok(response) => {
                    debug!(status = response.status, "request rejected");
                    return Err(DeliveryError::Rejected {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(err) => {
                    debug!(error = %err, attempt = attempt.number, "transport error");
                    attempt.last_status = None;
                    attempt.last_error = err.to_string();
                }
            }

            if attempt.number >= max_attempts {
                return Err(attempt.exhausted());
            }
            self.backoff().await?;
        }
    }

    async fn backoff(&self) -> Result<(), DeliveryError> {
        tokio::select! {
            _ = tokio::time::sleep(self.policy.backoff) => Ok(()),
            _ = self.cancel.cancelled() => Err(DeliveryError::Cancelled),
        }
    }
}
