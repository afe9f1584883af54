use crate::errors::DispatchError;
use crate::metrics_defs::{SEND_ATTEMPTS, SEND_RETRIES};
use async_trait::async_trait;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use shared::counter;
use std::sync::Arc;
use std::time::Duration;

/// Hard limit the platform places on a single text message.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Delay between retry attempts, pluggable so tests run without sleeping.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration);
}

pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Backoff that returns immediately. For tests and local tooling.
pub struct NoBackoff;

#[async_trait]
impl Backoff for NoBackoff {
    async fn wait(&self, _delay: Duration) {}
}

/// Outcome of a successful `send` call.
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// No text was provided; nothing was sent and that is not an error.
    NoText,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize, Default)]
struct ApiResponse {
    description: Option<String>,
    parameters: Option<ApiParameters>,
}

#[derive(Deserialize)]
struct ApiParameters {
    retry_after: Option<u64>,
}

enum AttemptOutcome {
    Sent,
    Fatal(DispatchError),
    Retry {
        error: DispatchError,
        // Server-provided delay, overrides exponential backoff when present
        delay_hint: Option<Duration>,
    },
}

/// Sends a single text message to a single chat over the messaging API.
///
/// Owns the retry policy: up to 3 attempts total, exponential backoff
/// (500ms * 2^attempt) unless the platform supplies a retry-after hint.
/// Rate limits (429) and server errors (>=500) are retryable; any other 4xx
/// fails immediately with the platform's own description.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    api_base: String,
    backoff: Arc<dyn Backoff>,
}

impl Dispatcher {
    pub fn new(api_base: String) -> Self {
        Self::with_backoff(api_base, Arc::new(TokioBackoff))
    }

    pub fn with_backoff(api_base: String, backoff: Arc<dyn Backoff>) -> Self {
        Dispatcher {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            backoff,
        }
    }

    /// Deliver `text` to `chat_id`, authenticating with `token`.
    ///
    /// Absent text is a silent no-op (`Delivery::NoText`), not an error.
    /// All other preconditions fail fast before any network call.
    pub async fn send(
        &self,
        text: Option<&str>,
        chat_id: &str,
        token: &str,
    ) -> Result<Delivery, DispatchError> {
        let Some(text) = text else {
            return Ok(Delivery::NoText);
        };

        let length = text.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(DispatchError::MessageTooLong { length });
        }
        if token.is_empty() {
            return Err(DispatchError::MissingToken);
        }
        if chat_id.is_empty() {
            return Err(DispatchError::MissingChatId);
        }

        // The token rides in the URL path per the platform's auth scheme;
        // chat id and text always travel in the JSON body so they never land
        // in access logs.
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let body = SendMessageBody { chat_id, text };

        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            counter!(SEND_ATTEMPTS).increment(1);

            match self.attempt(&url, &body, token).await {
                AttemptOutcome::Sent => {
                    if attempt > 0 {
                        tracing::info!(chat_id, attempt, "Message delivered after retry");
                    }
                    return Ok(Delivery::Sent);
                }
                AttemptOutcome::Fatal(error) => return Err(error),
                AttemptOutcome::Retry { error, delay_hint } => {
                    counter!(SEND_RETRIES).increment(1);
                    tracing::warn!(chat_id, attempt, error = %error, "Send attempt failed");
                    last_error = Some(error);

                    if attempt + 1 < MAX_ATTEMPTS {
                        let delay = delay_hint
                            .unwrap_or_else(|| BACKOFF_BASE * 2u32.pow(attempt));
                        self.backoff.wait(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(DispatchError::SendFailed))
    }

    async fn attempt(
        &self,
        url: &str,
        body: &SendMessageBody<'_>,
        token: &str,
    ) -> AttemptOutcome {
        let response = match self.client.post(url).json(body).send().await {
            Ok(response) => response,
            Err(e) => {
                // reqwest errors can echo the request URL, which carries the
                // token; scrub it before the error goes anywhere near a log.
                let detail = e.to_string().replace(token, "[redacted]");
                return AttemptOutcome::Retry {
                    error: DispatchError::Network(detail),
                    delay_hint: None,
                };
            }
        };

        let status = response.status();
        if status == StatusCode::OK {
            return AttemptOutcome::Sent;
        }

        let api = response.json::<ApiResponse>().await.unwrap_or_default();
        let description = api
            .description
            .unwrap_or_else(|| format!("status {status}"));
        let error = DispatchError::Api {
            status: status.as_u16(),
            description,
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            let delay_hint = api
                .parameters
                .and_then(|p| p.retry_after)
                .map(Duration::from_secs);
            return AttemptOutcome::Retry { error, delay_hint };
        }

        if status.is_server_error() {
            return AttemptOutcome::Retry {
                error,
                delay_hint: None,
            };
        }

        AttemptOutcome::Fatal(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Records requested delays instead of sleeping.
    struct RecordingBackoff {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingBackoff {
        fn new() -> Arc<Self> {
            Arc::new(RecordingBackoff {
                delays: Mutex::new(Vec::new()),
            })
        }

        fn delays(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Backoff for RecordingBackoff {
        async fn wait(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    fn ok_body() -> &'static str {
        r#"{"ok":true,"result":{"message_id":1}}"#
    }

    #[tokio::test]
    async fn test_absent_text_is_a_noop() {
        let dispatcher = Dispatcher::new("http://127.0.0.1:1".into());
        let delivery = dispatcher.send(None, "42", "token").await.unwrap();
        assert_eq!(delivery, Delivery::NoText);
    }

    #[tokio::test]
    async fn test_too_long_text_rejected_before_network() {
        // Unroutable api_base: any network attempt would error, not reject.
        let dispatcher = Dispatcher::new("http://127.0.0.1:1".into());
        let text = "x".repeat(4097);
        let err = dispatcher.send(Some(&text), "42", "token").await.unwrap_err();
        assert!(matches!(err, DispatchError::MessageTooLong { length: 4097 }));
    }

    #[tokio::test]
    async fn test_max_length_text_accepted() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ok_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(mock_server.uri());
        let text = "x".repeat(4096);
        let delivery = dispatcher.send(Some(&text), "42", "token").await.unwrap();
        assert_eq!(delivery, Delivery::Sent);
    }

    #[tokio::test]
    async fn test_missing_token_and_chat_id() {
        let dispatcher = Dispatcher::new("http://127.0.0.1:1".into());

        let err = dispatcher.send(Some("hi"), "42", "").await.unwrap_err();
        assert!(matches!(err, DispatchError::MissingToken));

        let err = dispatcher.send(Some("hi"), "", "token").await.unwrap_err();
        assert!(matches!(err, DispatchError::MissingChatId));
    }

    #[tokio::test]
    async fn test_payload_travels_in_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .and(body_partial_json(
                serde_json::json!({"chat_id": "42", "text": "Deployment completed!"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(ok_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatcher = Dispatcher::new(mock_server.uri());
        let delivery = dispatcher
            .send(Some("Deployment completed!"), "42", "token")
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Sent);
    }

    #[tokio::test]
    async fn test_rate_limit_honors_retry_after_hint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .respond_with(ResponseTemplate::new(429).set_body_string(
                r#"{"ok":false,"description":"Too Many Requests: retry after 2","parameters":{"retry_after":2}}"#,
            ))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ok_body()))
            .mount(&mock_server)
            .await;

        let backoff = RecordingBackoff::new();
        let dispatcher = Dispatcher::with_backoff(mock_server.uri(), backoff.clone());

        let delivery = dispatcher.send(Some("hi"), "42", "token").await.unwrap();
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(backoff.delays(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_server_errors_use_exponential_backoff() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string(r#"{"ok":false,"description":"Internal Server Error"}"#),
            )
            .expect(3)
            .mount(&mock_server)
            .await;

        let backoff = RecordingBackoff::new();
        let dispatcher = Dispatcher::with_backoff(mock_server.uri(), backoff.clone());

        let err = dispatcher.send(Some("hi"), "42", "token").await.unwrap_err();
        match err {
            DispatchError::Api {
                status,
                description,
            } => {
                assert_eq!(status, 500);
                assert_eq!(description, "Internal Server Error");
            }
            other => panic!("expected Api error, got {other:?}"),
        }

        // 500ms * 2^0, then 500ms * 2^1; no delay after the final attempt.
        assert_eq!(
            backoff.delays(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn test_client_error_never_retries() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"ok":false,"description":"Bad Request: chat not found"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let backoff = RecordingBackoff::new();
        let dispatcher = Dispatcher::with_backoff(mock_server.uri(), backoff.clone());

        let err = dispatcher.send(Some("hi"), "42", "token").await.unwrap_err();
        match err {
            DispatchError::Api {
                status,
                description,
            } => {
                assert_eq!(status, 400);
                assert_eq!(description, "Bad Request: chat not found");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(backoff.delays().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_retries_then_surfaces_last_error() {
        // Nothing listening on this port: every attempt is a connection error.
        let dispatcher =
            Dispatcher::with_backoff("http://127.0.0.1:9".into(), Arc::new(NoBackoff));

        let err = dispatcher.send(Some("hi"), "42", "token").await.unwrap_err();
        assert!(matches!(err, DispatchError::Network(_)));
        // The token must not leak through the transport error text.
        assert!(!err.to_string().contains("bottoken"));
    }
}
