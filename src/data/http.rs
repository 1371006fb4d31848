//! HTTP seam and retry policy.
//!
//! Both remote sources go through [`HttpTransport`], so the extractor and the
//! fetcher can be driven by scripted responses in tests. The time-series API
//! additionally goes through [`RetrySession`], which retries rate-limit and
//! server-side failures with exponential backoff.

use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use crate::domain::RetrySettings;
use crate::error::AppError;

/// Status codes that are retried (rate limiting + transient server errors).
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Statuses whose `Retry-After` header is honoured.
pub const RETRY_AFTER_STATUSES: [u16; 2] = [429, 503];

/// Upper bound on a server-requested wait.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Status + body of a completed request (any status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Parsed `Retry-After` header, if the server sent one in delta-seconds.
    pub retry_after: Option<Duration>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, wait: Duration) -> Self {
        self.retry_after = Some(wait);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("request error: {0}")]
    Other(String),
}

pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
        (**self).get(url, query)
    }
}

/// Why a single unit of remote work produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("HTTP error: status {status}")]
    Http { status: u16 },
    #[error("retries exhausted after {attempts} attempts (last status {status})")]
    RetriesExhausted { attempts: u32, status: u16 },
    #[error("connection error: {0}")]
    Connection(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("request error: {0}")]
    Request(String),
}

impl FetchFailure {
    /// Short category label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::Http { .. } => "http",
            FetchFailure::RetriesExhausted { .. } => "retries_exhausted",
            FetchFailure::Connection(_) => "connection",
            FetchFailure::Timeout(_) => "timeout",
            FetchFailure::Malformed(_) => "malformed",
            FetchFailure::Request(_) => "request",
        }
    }
}

impl From<TransportError> for FetchFailure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connection(m) => FetchFailure::Connection(m),
            TransportError::Timeout(m) => FetchFailure::Timeout(m),
            TransportError::Other(m) => FetchFailure::Request(m),
        }
    }
}

/// Blocking `reqwest` transport with a fixed per-request timeout.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::io("Failed to build HTTP client", e))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(classify_reqwest_error)?;
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = resp.text().map_err(classify_reqwest_error)?;
        Ok(HttpResponse {
            status,
            body,
            retry_after,
        })
    }
}

/// `Retry-After` in delta-seconds. HTTP-date values are ignored and the
/// regular backoff applies.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn classify_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connection(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

/// Retry/backoff rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: Duration,
}

impl RetryPolicy {
    pub fn should_retry_status(&self, status: u16) -> bool {
        RETRY_STATUSES.contains(&status)
    }

    /// Sleep before retry number `retry` (1-based): `factor * 2^(retry - 1)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.backoff_factor.saturating_mul(1u32 << exp)
    }

    /// Wait before retry number `retry` after a retryable status: the backoff,
    /// raised to the server's `Retry-After` (capped) on 429/503.
    pub fn delay(&self, retry: u32, status: u16, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff(retry);
        match retry_after {
            Some(wait) if RETRY_AFTER_STATUSES.contains(&status) => backoff.max(wait.min(MAX_RETRY_AFTER)),
            _ => backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySettings::default().into()
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(s: RetrySettings) -> Self {
        Self {
            max_retries: s.max_retries,
            backoff_factor: s.backoff_factor,
        }
    }
}

/// A successful (2xx) response and how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub body: String,
    pub attempts: u32,
}

/// Transport wrapped with a [`RetryPolicy`].
pub struct RetrySession<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: HttpTransport> RetrySession<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Issue one logical GET.
    ///
    /// Retryable statuses and connection/timeout errors are retried up to
    /// `max_retries` times. Any other non-2xx status fails immediately.
    pub fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Delivered, FetchFailure> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let retries_left = attempts <= self.policy.max_retries;
            let mut wait = self.policy.backoff(attempts);

            match self.transport.get(url, query) {
                Ok(resp) if resp.is_success() => {
                    return Ok(Delivered {
                        body: resp.body,
                        attempts,
                    });
                }
                Ok(resp) if self.policy.should_retry_status(resp.status) => {
                    if !retries_left {
                        return Err(FetchFailure::RetriesExhausted {
                            attempts,
                            status: resp.status,
                        });
                    }
                    wait = self.policy.delay(attempts, resp.status, resp.retry_after);
                }
                Ok(resp) => return Err(FetchFailure::Http { status: resp.status }),
                Err(err @ (TransportError::Connection(_) | TransportError::Timeout(_))) => {
                    if !retries_left {
                        return Err(err.into());
                    }
                }
                Err(err) => return Err(err.into()),
            }

            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays a fixed sequence of results and records every requested URL.
    pub struct ScriptedTransport {
        script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn statuses(statuses: &[(u16, &str)]) -> Self {
            Self::new(
                statuses
                    .iter()
                    .map(|(s, b)| Ok(HttpResponse::new(*s, *b)))
                    .collect(),
            )
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn get(&self, url: &str, _query: &[(&str, String)]) -> Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    fn instant_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            backoff_factor: Duration::ZERO,
        }
    }

    #[test]
    fn recovers_after_server_errors() {
        let t = ScriptedTransport::statuses(&[(500, ""), (503, ""), (200, "ok")]);
        let session = RetrySession::new(&t, instant_policy());

        let delivered = session.get("http://x", &[]).unwrap();

        assert_eq!(delivered.body, "ok");
        assert_eq!(delivered.attempts, 3);
        assert_eq!(t.call_count(), 3);
    }

    #[test]
    fn client_errors_are_not_retried() {
        let t = ScriptedTransport::statuses(&[(404, ""), (200, "ok")]);
        let session = RetrySession::new(&t, instant_policy());

        assert_eq!(session.get("http://x", &[]), Err(FetchFailure::Http { status: 404 }));
        assert_eq!(t.call_count(), 1);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let t = ScriptedTransport::statuses(&[(429, ""), (502, ""), (504, ""), (500, ""), (200, "late")]);
        let session = RetrySession::new(&t, instant_policy());

        let err = session.get("http://x", &[]).unwrap_err();

        assert_eq!(err, FetchFailure::RetriesExhausted { attempts: 4, status: 500 });
        assert_eq!(err.kind(), "retries_exhausted");
        assert_eq!(t.call_count(), 4);
    }

    #[test]
    fn connection_errors_are_retried_then_surface() {
        let t = ScriptedTransport::new(vec![
            Err(TransportError::Connection("refused".into())),
            Ok(HttpResponse::new(200, "ok")),
        ]);
        let session = RetrySession::new(&t, instant_policy());
        assert_eq!(session.get("http://x", &[]).unwrap().attempts, 2);

        let t = ScriptedTransport::new(vec![Err(TransportError::Other("bad url".into()))]);
        let session = RetrySession::new(&t, instant_policy());
        assert_eq!(
            session.get("http://x", &[]).unwrap_err(),
            FetchFailure::Request("bad url".into())
        );
    }

    #[test]
    fn backoff_is_exponential_from_factor() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff(1), Duration::from_secs(1));
        assert_eq!(p.backoff(2), Duration::from_secs(2));
        assert_eq!(p.backoff(3), Duration::from_secs(4));
    }

    #[test]
    fn retry_after_is_a_floor_on_rate_limits() {
        let p = RetryPolicy::default();
        let five = Some(Duration::from_secs(5));

        assert_eq!(p.delay(1, 429, five), Duration::from_secs(5));
        assert_eq!(p.delay(3, 503, Some(Duration::from_secs(1))), Duration::from_secs(4));
        // Only 429/503 carry a meaningful header.
        assert_eq!(p.delay(1, 500, five), Duration::from_secs(1));
        assert_eq!(p.delay(1, 429, Some(Duration::from_secs(3600))), MAX_RETRY_AFTER);
    }

    #[test]
    fn session_waits_for_retry_after() {
        let t = ScriptedTransport::new(vec![
            Ok(HttpResponse::new(429, "").with_retry_after(Duration::from_millis(30))),
            Ok(HttpResponse::new(200, "ok")),
        ]);
        let session = RetrySession::new(&t, instant_policy());

        let started = std::time::Instant::now();
        assert_eq!(session.get("http://x", &[]).unwrap().attempts, 2);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn retry_after_parses_delta_seconds_only() {
        assert_eq!(parse_retry_after(" 7 "), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }
}
