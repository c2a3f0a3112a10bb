//! OpenAI-compatible chat-completions client with retry.
//!
//! Retry policy: exponential backoff starting at 500 ms, capped at 4 s per
//! sleep, 30 s total elapsed. Transient failures are network errors, HTTP
//! 429, and HTTP >= 500; everything else fails immediately. A 401 surfaces
//! as `InvalidCredentials`, an exhausted 429 as `RateLimited`, a request
//! timeout as `Timeout`.

use crate::llm::config::ProviderConfig;
use crate::llm::types::{AssistantTurn, ChatMessage, ChatRequest, ChatResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use spectrail_core::WorkbenchError;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const BACKOFF_CAP: Duration = Duration::from_secs(4);
pub const TOTAL_ELAPSED_CAP: Duration = Duration::from_secs(30);

/// How much of an error body is kept in surfaced messages.
const ERROR_BODY_CAP: usize = 300;

/// One chat-completions round trip. The agent loop is generic over this so
/// tests can script turns without a network.
pub trait ChatCompletion: Send + Sync {
    fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> impl Future<Output = Result<AssistantTurn, WorkbenchError>> + Send;
}

enum AttemptError {
    Transient(WorkbenchError),
    Fatal(WorkbenchError),
}

fn clip(body: &str) -> String {
    let mut end = body.len().min(ERROR_BODY_CAP);
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

fn classify_http_failure(status: u16, body: &str) -> AttemptError {
    match status {
        401 => AttemptError::Fatal(WorkbenchError::InvalidCredentials),
        429 => AttemptError::Transient(WorkbenchError::RateLimited),
        500..=599 => AttemptError::Transient(WorkbenchError::Provider {
            status,
            message: clip(body),
        }),
        _ => AttemptError::Fatal(WorkbenchError::Provider {
            status,
            message: clip(body),
        }),
    }
}

fn decode_turn(body: &str) -> Result<AssistantTurn, WorkbenchError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|err| WorkbenchError::InvalidResponse(err.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| WorkbenchError::InvalidResponse("no choices in response".to_string()))?;
    Ok(AssistantTurn {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
    })
}

pub struct HttpProvider {
    http: reqwest::Client,
    headers: HeaderMap,
    config: ProviderConfig,
}

impl HttpProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, WorkbenchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| WorkbenchError::Network(format!("http client: {err}")))?;
        let headers = build_headers(&config)?;
        Ok(HttpProvider {
            http,
            headers,
            config,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn attempt(&self, url: &str, request: &ChatRequest) -> Result<AssistantTurn, AttemptError> {
        let response = self
            .http
            .post(url)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AttemptError::Transient(WorkbenchError::Timeout)
                } else {
                    AttemptError::Transient(WorkbenchError::Network(err.to_string()))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            if err.is_timeout() {
                AttemptError::Transient(WorkbenchError::Timeout)
            } else {
                AttemptError::Transient(WorkbenchError::Network(err.to_string()))
            }
        })?;

        if status.is_success() {
            decode_turn(&body).map_err(AttemptError::Fatal)
        } else {
            Err(classify_http_failure(status.as_u16(), &body))
        }
    }
}

impl ChatCompletion for HttpProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<AssistantTurn, WorkbenchError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            tools: (!tools.is_empty()).then(|| tools.to_vec()),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };
        let url = self.config.chat_completions_url();

        let started = Instant::now();
        let mut delay = INITIAL_BACKOFF;
        loop {
            match self.attempt(&url, &request).await {
                Ok(turn) => {
                    debug!(
                        model = %self.config.model,
                        tool_calls = turn.tool_calls.len(),
                        "provider turn complete"
                    );
                    return Ok(turn);
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Transient(err)) => {
                    if started.elapsed() + delay >= TOTAL_ELAPSED_CAP {
                        return Err(err);
                    }
                    warn!(error = %err, delay_ms = delay.as_millis() as u64, "retrying provider call");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(BACKOFF_CAP);
                }
            }
        }
    }
}

/// Assemble request headers. User-supplied extras are merged first and an
/// `authorization` key among them is ignored, so the bearer credential always
/// comes from configuration.
fn build_headers(config: &ProviderConfig) -> Result<HeaderMap, WorkbenchError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (key, value) in &config.extra_headers {
        if key.eq_ignore_ascii_case("authorization") {
            continue;
        }
        let Some(value) = value.as_str() else {
            return Err(WorkbenchError::InvalidConfig(format!(
                "extra header '{key}' must be a string"
            )));
        };
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
            WorkbenchError::InvalidConfig(format!("bad extra header name '{key}': {err}"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|err| {
            WorkbenchError::InvalidConfig(format!("bad extra header value for '{key}': {err}"))
        })?;
        headers.insert(name, value);
    }

    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
        .map_err(|_| WorkbenchError::InvalidCredentials)?;
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with_extras(extras: &str) -> ProviderConfig {
        let mut settings: HashMap<String, String> = HashMap::new();
        settings.insert("api_key".into(), "sk-test".into());
        settings.insert("extra_headers_json".into(), extras.into());
        ProviderConfig::from_settings(&settings).unwrap()
    }

    #[test]
    fn extras_cannot_override_authorization() {
        let config = config_with_extras(r#"{"Authorization": "Bearer stolen", "X-Org": "acme"}"#);
        let headers = build_headers(&config).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer sk-test");
        assert_eq!(headers["X-Org"], "acme");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn non_string_extra_header_is_invalid_config() {
        let config = config_with_extras(r#"{"X-Count": 3}"#);
        assert!(matches!(
            build_headers(&config),
            Err(WorkbenchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn status_classification_matches_retry_policy() {
        assert!(matches!(
            classify_http_failure(401, ""),
            AttemptError::Fatal(WorkbenchError::InvalidCredentials)
        ));
        assert!(matches!(
            classify_http_failure(429, ""),
            AttemptError::Transient(WorkbenchError::RateLimited)
        ));
        assert!(matches!(
            classify_http_failure(503, "overloaded"),
            AttemptError::Transient(WorkbenchError::Provider { status: 503, .. })
        ));
        for status in [400u16, 403, 404, 422] {
            assert!(
                matches!(
                    classify_http_failure(status, "nope"),
                    AttemptError::Fatal(WorkbenchError::Provider { .. })
                ),
                "{status} must not be retried"
            );
        }
    }

    #[test]
    fn decode_extracts_first_choice() {
        let turn = decode_turn(
            r#"{"choices":[{"message":{"content":"plan text","tool_calls":null}}]}"#,
        )
        .unwrap();
        assert_eq!(turn.content.as_deref(), Some("plan text"));
        assert!(!turn.has_tool_calls());
    }

    #[test]
    fn decode_rejects_empty_choices() {
        assert!(matches!(
            decode_turn(r#"{"choices":[]}"#),
            Err(WorkbenchError::InvalidResponse(_))
        ));
    }
}
