//! ledger::http
//!
//! [`Transport`] over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use super::client::{
    Auth, DeliveryError, FileAttachment, PreparedRequest, Transport, TransportError,
    TransportResponse, DATA_JSON_FIELD,
};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("trailmark/", env!("CARGO_PKG_VERSION"));

/// HTTP transport with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| DeliveryError::InvalidRequest {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// The JSON body and the attached file as a fresh form for one attempt.
fn multipart_form(body: Option<&str>, attachment: &FileAttachment) -> Form {
    let mut form = Form::new();
    if let Some(body) = body {
        form = form.text(DATA_JSON_FIELD, body.to_string());
    }
    form.part(
        attachment.field.clone(),
        Part::bytes(attachment.bytes.clone()).file_name(attachment.file_name.clone()),
    )
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: &PreparedRequest,
        auth: &Auth,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .header(ACCEPT, "application/json");

        builder = match auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        };

        builder = match (&request.body, &request.attachment) {
            (body, Some(attachment)) => builder.multipart(multipart_form(body.as_deref(), attachment)),
            (Some(body), None) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone()),
            (None, None) => builder,
        };

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        Ok(TransportResponse { status, body })
    }
}
