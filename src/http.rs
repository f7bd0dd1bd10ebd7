use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::FetchError;

pub const MAX_RETRIES: usize = 3;
const BASE_DELAY_MS: u64 = 200;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whole-request deadline for small API calls.
pub const API_TIMEOUT: Duration = Duration::from_secs(60);
/// Whole-request deadline for large documents such as the assembly summary,
/// which runs to hundreds of megabytes.
pub const BULK_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub fn user_agent() -> String {
    format!("ncbi-fetch/{}", env!("CARGO_PKG_VERSION"))
}

/// Client with a connect timeout only; each request sets its own deadline
/// (see [`API_TIMEOUT`] and [`BULK_TIMEOUT`]).
pub fn build_client() -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent()).map_err(|err| FetchError::NcbiHttp(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|err| FetchError::NcbiHttp(err.to_string()))
}

enum AttemptError {
    Status { status: u16, message: String },
    Transport(reqwest::Error),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Status { status, .. } => is_retryable_status(*status),
            AttemptError::Transport(err) => is_retryable_error(err),
        }
    }
}

/// Sends the request built by `make_req` and reads the whole body, retrying
/// transient failures with a linearly growing delay. A connection that drops
/// while the body is streaming counts as transient. Transport errors that
/// outlive the retries become [`FetchError::ServiceUnavailable`]; an error
/// status becomes [`FetchError::NcbiStatus`].
pub fn fetch_text_with_retries<F>(service: &'static str, mut make_req: F) -> Result<String, FetchError>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 0usize;
    loop {
        let err = match try_once(make_req()) {
            Ok(text) => return Ok(text),
            Err(err) => err,
        };
        if attempt < MAX_RETRIES && err.is_retryable() {
            match &err {
                AttemptError::Status { status, .. } => {
                    debug!(service, status, attempt, "retrying after status")
                }
                AttemptError::Transport(cause) => {
                    debug!(service, error = %cause, attempt, "retrying after transport error")
                }
            }
            backoff(attempt);
            attempt += 1;
            continue;
        }
        return Err(match err {
            AttemptError::Status { status, message } => FetchError::NcbiStatus { status, message },
            AttemptError::Transport(cause) if is_retryable_error(&cause) => {
                FetchError::ServiceUnavailable {
                    service,
                    attempts: attempt + 1,
                    message: cause.to_string(),
                }
            }
            AttemptError::Transport(cause) => FetchError::NcbiHttp(cause.to_string()),
        });
    }
}

fn try_once(request: RequestBuilder) -> Result<String, AttemptError> {
    let response = request.send().map_err(AttemptError::Transport)?;
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "NCBI request failed".to_string());
        return Err(AttemptError::Status { status, message });
    }
    response.text().map_err(AttemptError::Transport)
}

fn backoff(attempt: usize) {
    let delay = BASE_DELAY_MS * (attempt as u64 + 1);
    thread::sleep(Duration::from_millis(delay));
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() || err.is_decode()
}
