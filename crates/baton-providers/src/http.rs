//! Shared HTTP plumbing: bounded retries with exponential backoff on
//! transient provider failures (408/429/5xx and timeouts).

use std::time::Duration;

use crate::client::LlmError;

const MAX_ATTEMPTS: u32 = 3;

pub(crate) fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500u64 << attempt)
}

fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 408 || status.as_u16() == 429 || status.is_server_error()
}

/// Send a request up to three times, returning the successful response body.
/// Non-retryable failures surface immediately.
pub(crate) async fn send_with_retry(
    request: reqwest::RequestBuilder,
    provider: &'static str,
) -> Result<String, LlmError> {
    let mut last_err = LlmError::Http(format!("{}: request not sent", provider));
    for attempt in 0..MAX_ATTEMPTS {
        let req = match request.try_clone() {
            Some(req) => req,
            None => return Err(LlmError::Http(format!("{}: unclonable request", provider))),
        };
        match req.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .text()
                        .await
                        .map_err(|e| LlmError::Http(e.to_string()));
                }
                let body = response.text().await.unwrap_or_default();
                last_err = LlmError::Response(format!(
                    "{} status {}: {}",
                    provider,
                    status.as_u16(),
                    body
                ));
                if is_retryable_status(status) {
                    tokio::time::sleep(backoff(attempt)).await;
                    continue;
                }
                return Err(last_err);
            }
            Err(err) => {
                let retryable = err.is_timeout();
                last_err = LlmError::Http(err.to_string());
                if retryable {
                    tokio::time::sleep(backoff(attempt)).await;
                    continue;
                }
                return Err(last_err);
            }
        }
    }
    Err(last_err)
}
