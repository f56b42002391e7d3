//! HTTP probe with bounded retries.
//!
//! Only connection-level failures (DNS, refused, TLS, timeout) are retried.
//! Any valid status code, including 4xx and 5xx, ends the attempt loop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use sitewatch_core::config::{ProbeConfig, ProbeMethod};
use sitewatch_core::HttpCode;

/// Boxed future returned by [`Transport::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<u16, String>> + Send + 'a>>;

/// Performs one HTTP request and yields the response status code.
///
/// Errors mean no response was obtained at all.
pub trait Transport: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

// ── reqwest transport ──────────────────────────────────────────────

/// Transport backed by a reqwest client. Redirects are not followed.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    method: reqwest::Method,
}

impl ReqwestTransport {
    pub fn new(config: &ProbeConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.max_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("sitewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let method = match config.method {
            ProbeMethod::Head => reqwest::Method::HEAD,
            ProbeMethod::Get => reqwest::Method::GET,
        };
        Ok(Self { client, method })
    }
}

impl Transport for ReqwestTransport {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            self.client
                .request(self.method.clone(), url)
                .send()
                .await
                .map(|resp| resp.status().as_u16())
                .map_err(|e| e.to_string())
        })
    }
}

// ── Prober ─────────────────────────────────────────────────────────

/// Probes one target with up to `max_retries` attempts.
#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn Transport>,
    max_retries: u32,
    retry_delay: Duration,
    /// Hard bound on a single attempt.
    attempt_timeout: Duration,
}

impl Prober {
    pub fn new(
        transport: Arc<dyn Transport>,
        max_retries: u32,
        retry_delay: Duration,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            max_retries: max_retries.max(1),
            retry_delay,
            attempt_timeout,
        }
    }

    pub fn from_config(transport: Arc<dyn Transport>, config: &ProbeConfig) -> Self {
        Self::new(
            transport,
            config.max_retries,
            config.retry_delay(),
            config.max_timeout(),
        )
    }

    /// Probe `target`, returning the first valid status code or
    /// [`HttpCode::NO_RESPONSE`] once every attempt has failed.
    pub async fn probe(&self, target: &str) -> HttpCode {
        for attempt in 1..=self.max_retries {
            let outcome =
                tokio::time::timeout(self.attempt_timeout, self.transport.fetch(target)).await;
            match outcome {
                Ok(Ok(code)) if HttpCode(code).is_valid() => {
                    debug!(%target, attempt, code, "probe answered");
                    return HttpCode(code);
                }
                Ok(Ok(code)) => {
                    debug!(%target, attempt, code, "probe returned an invalid status code");
                }
                Ok(Err(e)) => {
                    debug!(%target, attempt, error = %e, "probe attempt failed");
                }
                Err(_) => {
                    debug!(%target, attempt, "probe attempt timed out");
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        debug!(%target, attempts = self.max_retries, "no response from target");
        HttpCode::NO_RESPONSE
    }
}
