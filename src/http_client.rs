use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 4;
const MAX_RETRIES: u32 = 2;
const BACKOFF_BASE_MS: u64 = 300;
const AGENT: &str = "mlb-terminal/1.0";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// GET `url` and return the body. Rate limits and server errors are retried with a short
/// backoff; anything else non-2xx is returned as an error carrying a snippet of the body.
pub fn get_text(client: &Client, url: &str, query: &[(&str, String)]) -> Result<String> {
    let mut attempt = 0;
    loop {
        let resp = client
            .get(url)
            .query(query)
            .header(USER_AGENT, AGENT)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        let status = resp.status();
        if retryable(status) && attempt < MAX_RETRIES {
            attempt += 1;
            let wait = Duration::from_millis(BACKOFF_BASE_MS * u64::from(attempt));
            debug!(%status, attempt, url, "retrying after backoff");
            thread::sleep(wait);
            continue;
        }
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            let snippet = body
                .trim()
                .replace(['\n', '\r'], " ")
                .chars()
                .take(220)
                .collect::<String>();
            return Err(anyhow::anyhow!("http {status}: {snippet}"));
        }
        return Ok(body);
    }
}

fn retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limits_and_server_errors_retry() {
        assert!(retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable(StatusCode::BAD_GATEWAY));
        assert!(!retryable(StatusCode::NOT_FOUND));
        assert!(!retryable(StatusCode::OK));
    }
}
