//! Resilient GET requests.
//!
//! [`Fetcher::get`] retries a read until it succeeds, the server rejects the
//! token, or the retry budget runs out. Every attempt produces an
//! [`Attempt`] and the driver decides what to do from its kind:
//!
//! | outcome                         | action                                  |
//! |---------------------------------|-----------------------------------------|
//! | 2xx                             | return the response                     |
//! | 401..=403                       | [`Error::Authentication`], no retry     |
//! | 500                             | retry; [`Error::Server`] when exhausted |
//! | other status, transport failure | retry; [`Error::RetryExhausted`]        |
//!
//! The delay between attempts is fixed, there is no jitter or backoff.
//! Only reads are retried; writes go straight through the session.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::session::{HttpResponse, Transport};

/// Tracing target for fetch operations.
pub const TRACING_TARGET: &str = "konfuzio_sdk::fetch";

/// How often and how patiently a read is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts after which the read gives up.
    pub max_attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(15),
        }
    }
}

/// Blocks the current thread between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Classified result of one GET.
#[derive(Debug)]
pub enum Attempt {
    Success(HttpResponse),
    /// 401..=403, not worth retrying.
    Unauthorized(String),
    /// 500.
    ServerError(String),
    /// Any other status, or the request never got an answer.
    Transient(String),
}

impl Attempt {
    pub fn classify(result: Result<HttpResponse>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(err) => return Attempt::Transient(err.to_string()),
        };
        let status = response.status;
        if status.is_success() {
            Attempt::Success(response)
        } else if (401..=403).contains(&status.as_u16()) {
            Attempt::Unauthorized(response.detail())
        } else if status == StatusCode::INTERNAL_SERVER_ERROR {
            Attempt::ServerError(response.detail())
        } else {
            Attempt::Transient(format!("{status}: {}", response.detail()))
        }
    }
}

/// Runs reads with a [`RetryPolicy`].
pub struct Fetcher {
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl Fetcher {
    /// Fetcher that really sleeps between attempts.
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }

    /// Fetcher that waits through `sleeper`, e.g. one that only records.
    pub fn with_sleeper(policy: RetryPolicy, sleeper: impl Sleeper + 'static) -> Self {
        Self {
            policy,
            sleeper: Box::new(sleeper),
        }
    }

    /// Attempt budget and delay in use.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// GET `url`, retrying per the policy.
    pub fn get(&self, transport: &dyn Transport, url: &str) -> Result<HttpResponse> {
        let mut failures = 0;
        loop {
            let (detail, server_error) = match Attempt::classify(transport.get(url)) {
                Attempt::Success(response) => return Ok(response),
                Attempt::Unauthorized(detail) => return Err(Error::Authentication(detail)),
                Attempt::ServerError(detail) => (detail, true),
                Attempt::Transient(detail) => (detail, false),
            };

            failures += 1;
            if failures >= self.policy.max_attempts {
                let attempts = failures;
                tracing::error!(target: TRACING_TARGET, %url, attempts, %detail, "Giving up on url");
                return Err(if server_error {
                    Error::Server { attempts, detail }
                } else {
                    Error::RetryExhausted { attempts, detail }
                });
            }

            tracing::warn!(
                target: TRACING_TARGET,
                %url,
                attempt = failures,
                %detail,
                "Retry to get url"
            );
            self.sleeper.sleep(self.policy.delay);
        }
    }

    /// GET `url` and parse the body as JSON.
    pub fn get_json<T: DeserializeOwned>(&self, transport: &dyn Transport, url: &str) -> Result<T> {
        self.get(transport, url)?.json()
    }

    /// Collect every item of a (possibly) paginated list endpoint.
    ///
    /// Pages look like `{"results": [...], "next": <url or null>}`; `next` may
    /// be relative to the page it came from. A bare JSON array is taken as
    /// the complete list.
    pub fn fetch_all<T: DeserializeOwned>(
        &self,
        transport: &dyn Transport,
        url: &str,
    ) -> Result<Vec<T>> {
        let mut items: Vec<Value> = Vec::new();
        let mut current = url.to_string();
        let mut pages = 0usize;

        loop {
            let body: Value = self.get_json(transport, &current)?;
            pages += 1;
            match body {
                Value::Object(mut page) if page.contains_key("results") => {
                    match page.remove("results") {
                        Some(Value::Array(results)) => items.extend(results),
                        Some(Value::Null) | None => {}
                        Some(other) => {
                            return Err(Error::UnexpectedResponse(format!(
                                "expected a list of results from {current}, got {other}"
                            )))
                        }
                    }
                    match page.remove("next") {
                        Some(Value::String(next)) if !next.is_empty() => {
                            current = url::Url::parse(&current)?.join(&next)?.to_string();
                        }
                        _ => break,
                    }
                }
                Value::Array(all) => {
                    items = all;
                    break;
                }
                other => {
                    return Err(Error::UnexpectedResponse(format!(
                        "expected a list from {current}, got {other}"
                    )))
                }
            }
        }

        tracing::debug!(
            target: TRACING_TARGET,
            %url,
            pages,
            items = items.len(),
            "Fetched list"
        );
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(Error::from))
            .collect()
    }
}
