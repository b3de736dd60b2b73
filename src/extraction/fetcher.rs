//! Batch fetcher: one bounded, paginated request with repair, backoff and rate-limit handling

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::config::EndpointConfig;
use crate::error::Result;
use crate::extraction::query::QueryTemplate;
use crate::extraction::record::RawRecord;
use crate::extraction::repair::{decode_strict, DecodeError, ResponseRepair};
use crate::extraction::retry::{RetryDecision, RetryPolicy};

/// Failure of a single request at the transport level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),
}

/// Failure of one fetch attempt, or of the whole fetch once the budget is spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::RateLimited => FetchError::RateLimited,
            TransportError::Status { status, body } => FetchError::Status { status, body },
            TransportError::Network(msg) => FetchError::Network(msg),
        }
    }
}

/// Executes a query string against a SPARQL endpoint and returns the raw body.
#[async_trait]
pub trait SparqlTransport: Send + Sync {
    async fn execute(&self, query: &str) -> std::result::Result<String, TransportError>;
}

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Error bodies are often full HTML pages; keep log lines readable.
const MAX_ERROR_BODY: usize = 512;

/// HTTP transport for a remote SPARQL endpoint.
pub struct HttpSparqlTransport {
    endpoint: EndpointConfig,
    client: Client,
}

impl HttpSparqlTransport {
    pub fn new(endpoint: EndpointConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(endpoint.timeout)
            .user_agent(endpoint.user_agent.clone())
            .build()?;

        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl SparqlTransport for HttpSparqlTransport {
    async fn execute(&self, query: &str) -> std::result::Result<String, TransportError> {
        let response = self
            .client
            .post(&self.endpoint.url)
            .form(&[("query", query)])
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited);
        }

        let bytes = response.bytes().await.map_err(|e| TransportError::Network(e.to_string()))?;
        // Invalid UTF-8 sequences are replaced rather than failing the batch
        let body = String::from_utf8_lossy(&bytes).into_owned();

        if !status.is_success() {
            let body = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(TransportError::Status { status: status.as_u16(), body });
        }

        Ok(body)
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Batch(Vec<RawRecord>),
    /// The offset is past the end of the result set
    TerminalEmpty,
}

/// Fetches one page at a time, applying the configured [`RetryPolicy`].
pub struct BatchFetcher<T> {
    transport: T,
    policy: RetryPolicy,
    repair: ResponseRepair,
}

impl<T: SparqlTransport> BatchFetcher<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy, repair: ResponseRepair::new() }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the page at `offset`.
    ///
    /// Rate-limit responses wait the cool-down and retry the same offset without using up
    /// the retry budget. Other failures back off exponentially; once `max_retries` attempts
    /// have failed the fetch returns [`FetchError::Exhausted`]. A successfully decoded empty
    /// page is [`FetchOutcome::TerminalEmpty`].
    pub async fn fetch(
        &self,
        template: &QueryTemplate,
        limit: u64,
        offset: u64,
    ) -> std::result::Result<FetchOutcome, FetchError> {
        let query = template.render(limit, offset);
        let max_retries = self.policy.max_retries;
        let mut failures: u32 = 0;
        let mut cooldowns: u32 = 0;

        loop {
            tracing::debug!(offset, attempt = failures + 1, max_retries, "fetching batch");

            let error = match self.attempt(&query, offset).await {
                Ok(records) if records.is_empty() => {
                    tracing::info!(offset, "empty batch, end of result set");
                    return Ok(FetchOutcome::TerminalEmpty);
                }
                Ok(records) => {
                    tracing::info!(offset, fetched = records.len(), "batch fetched");
                    sleep(self.policy.courtesy_delay).await;
                    return Ok(FetchOutcome::Batch(records));
                }
                Err(error) => error,
            };

            match self.policy.classify(&error) {
                RetryDecision::Cooldown => {
                    cooldowns += 1;
                    if let Some(ceiling) = self.policy.max_rate_limit_waits {
                        if cooldowns > ceiling {
                            tracing::error!(offset, cooldowns, "rate-limit ceiling reached");
                            return Err(FetchError::Exhausted {
                                attempts: failures + cooldowns,
                                last: Box::new(error),
                            });
                        }
                    }
                    let wait = self.policy.rate_limit_cooldown;
                    tracing::warn!(offset, wait_secs = wait.as_secs(), "rate limited, cooling down");
                    sleep(wait).await;
                }
                RetryDecision::Retry => {
                    failures += 1;
                    // The rate-limit ceiling counts consecutive cool-downs only
                    cooldowns = 0;
                    if failures >= max_retries {
                        tracing::error!(offset, attempts = failures, error = %error, "retry budget exhausted");
                        return Err(FetchError::Exhausted { attempts: failures, last: Box::new(error) });
                    }
                    let wait = self.policy.backoff_delay(failures - 1);
                    tracing::warn!(
                        offset,
                        attempt = failures,
                        max_retries,
                        wait_secs = wait.as_secs(),
                        error = %error,
                        "fetch attempt failed, backing off"
                    );
                    sleep(wait).await;
                }
                RetryDecision::Fatal => {
                    tracing::error!(offset, error = %error, "unretryable fetch error");
                    return Err(FetchError::Exhausted { attempts: failures + 1, last: Box::new(error) });
                }
            }
        }
    }

    /// One request: strict decode first, repair passes when that fails.
    async fn attempt(
        &self,
        query: &str,
        offset: u64,
    ) -> std::result::Result<Vec<RawRecord>, FetchError> {
        let body = self.transport.execute(query).await?;

        match decode_strict(&body) {
            Ok(records) => Ok(records),
            Err(err) => {
                tracing::warn!(offset, error = %err, "strict decode failed, attempting repair");
                let outcome = self.repair.repair(&body)?;
                tracing::info!(
                    offset,
                    pass = %outcome.pass,
                    recovered = outcome.records.len(),
                    dropped = outcome.dropped_bindings,
                    "response repaired"
                );
                Ok(outcome.records)
            }
        }
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        responses: Mutex<VecDeque<std::result::Result<String, TransportError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(responses: Vec<std::result::Result<String, TransportError>>) -> Self {
            Self { responses: Mutex::new(responses.into()), calls: Mutex::new(Vec::new()) }
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SparqlTransport for Scripted {
        async fn execute(&self, query: &str) -> std::result::Result<String, TransportError> {
            self.calls.lock().unwrap().push(query.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(r#"{"results": {"bindings": []}}"#.to_string()))
        }
    }

    const ONE_ROW: &str = r#"{"results": {"bindings": [
        {"entity": {"type": "uri", "value": "http://www.wikidata.org/entity/Q1"}}]}}"#;

    fn template() -> QueryTemplate {
        QueryTemplate::new("SELECT ?entity WHERE { ?entity ?p ?o }")
    }

    #[tokio::test]
    async fn test_fetch_batch() {
        let fetcher = BatchFetcher::new(Scripted::new(vec![Ok(ONE_ROW.to_string())]), RetryPolicy::immediate());
        let outcome = fetcher.fetch(&template(), 10, 20).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Batch(ref r) if r.len() == 1));

        let calls = fetcher.transport().calls.lock().unwrap().clone();
        assert!(calls[0].ends_with("LIMIT 10\nOFFSET 20"));
    }

    #[tokio::test]
    async fn test_fetch_empty_is_terminal() {
        let fetcher = BatchFetcher::new(Scripted::new(vec![]), RetryPolicy::immediate());
        assert_eq!(fetcher.fetch(&template(), 10, 0).await.unwrap(), FetchOutcome::TerminalEmpty);
    }

    #[tokio::test]
    async fn test_rate_limit_does_not_consume_budget() {
        let transport = Scripted::new(vec![
            Err(TransportError::RateLimited),
            Err(TransportError::Network("reset".to_string())),
            Err(TransportError::RateLimited),
            Err(TransportError::RateLimited),
            Err(TransportError::Network("reset".to_string())),
            Ok(ONE_ROW.to_string()),
        ]);
        let fetcher = BatchFetcher::new(transport, RetryPolicy::immediate());
        let outcome = fetcher.fetch(&template(), 10, 0).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Batch(_)));
        assert_eq!(fetcher.transport().calls(), 6);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_retries() {
        let transport = Scripted::new(vec![
            Err(TransportError::Status { status: 500, body: "oops".to_string() }),
            Err(TransportError::Status { status: 502, body: "oops".to_string() }),
            Err(TransportError::Status { status: 503, body: "oops".to_string() }),
            Ok(ONE_ROW.to_string()),
        ]);
        let fetcher = BatchFetcher::new(transport, RetryPolicy::immediate());
        let err = fetcher.fetch(&template(), 10, 0).await.unwrap_err();
        match err {
            FetchError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(*last, FetchError::Status { status: 503, body: "oops".to_string() });
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fetcher.transport().calls(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_ceiling() {
        let transport = Scripted::new(vec![
            Err(TransportError::RateLimited),
            Err(TransportError::RateLimited),
            Err(TransportError::RateLimited),
        ]);
        let policy = RetryPolicy::immediate().with_max_rate_limit_waits(2);
        let fetcher = BatchFetcher::new(transport, policy);
        let err = fetcher.fetch(&template(), 10, 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_ceiling_resets_after_other_failure() {
        let transport = Scripted::new(vec![
            Err(TransportError::RateLimited),
            Err(TransportError::RateLimited),
            Err(TransportError::Network("reset".to_string())),
            Err(TransportError::RateLimited),
            Err(TransportError::RateLimited),
            Ok(ONE_ROW.to_string()),
        ]);
        let policy = RetryPolicy::immediate().with_max_rate_limit_waits(2);
        let fetcher = BatchFetcher::new(transport, policy);
        let outcome = fetcher.fetch(&template(), 10, 0).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Batch(_)));
        assert_eq!(fetcher.transport().calls(), 6);
    }

    #[tokio::test]
    async fn test_repaired_body_is_returned() {
        let broken = "{\"results\": {\"bindings\": [{\"entity\": {\"type\": \"uri\", \"value\": \"http://www.wikidata.org/entity/Q\u{0001}1\"}}]}}";
        let fetcher = BatchFetcher::new(Scripted::new(vec![Ok(broken.to_string())]), RetryPolicy::immediate());
        let outcome = fetcher.fetch(&template(), 10, 0).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Batch(ref r) if r.len() == 1));
        assert_eq!(fetcher.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_unrepairable_body_is_retried() {
        let transport = Scripted::new(vec![
            Ok("<html>upstream timeout</html>".to_string()),
            Ok(ONE_ROW.to_string()),
        ]);
        let fetcher = BatchFetcher::new(transport, RetryPolicy::immediate());
        assert!(matches!(fetcher.fetch(&template(), 10, 0).await.unwrap(), FetchOutcome::Batch(_)));
        assert_eq!(fetcher.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_fatal_classification_stops_immediately() {
        fn client_errors_are_fatal(error: &FetchError) -> RetryDecision {
            match error {
                FetchError::Status { status: 400..=499, .. } => RetryDecision::Fatal,
                other => crate::extraction::retry::default_classifier(other),
            }
        }
        let transport = Scripted::new(vec![Err(TransportError::Status {
            status: 400,
            body: "malformed query".to_string(),
        })]);
        let policy = RetryPolicy::immediate().with_classifier(client_errors_are_fatal);
        let fetcher = BatchFetcher::new(transport, policy);
        let err = fetcher.fetch(&template(), 10, 0).await.unwrap_err();
        assert!(matches!(err, FetchError::Exhausted { attempts: 1, .. }));
        assert_eq!(fetcher.transport().calls(), 1);
    }
}
