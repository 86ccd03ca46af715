//! HTTP client for the agent server.
//!
//! Protocol: create a session
//! (`POST /apps/{app}/users/{user}/sessions/{session}`), then run
//! (`POST /run`) with the input text as a single user message part.
//! The run response is a JSON array of events.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::events::AgentRun;
use super::{is_retryable, AgentError};
use crate::config::AGENT_USER_ID;

/// Session creation timeout (seconds).
const SESSION_TIMEOUT_SECS: u64 = 60;

/// Run timeout (seconds). Multi-stage server-side pipelines are slow.
const RUN_TIMEOUT_SECS: u64 = 600;

/// Maximum extra run attempts after a retryable failure.
const MAX_RUN_RETRIES: usize = 2;

/// Agent server abstraction (allows mocking).
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, app: &str, input: &str) -> Result<AgentRun, AgentError>;
}

/// HTTP client for an ADK-style agent server.
pub struct AdkClient {
    base_url: String,
    client: reqwest::Client,
}

impl AdkClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn map_transport_error(&self, e: reqwest::Error, timeout_secs: u64) -> AgentError {
        if e.is_connect() {
            AgentError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            AgentError::Timeout(timeout_secs)
        } else {
            AgentError::Http(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct RunRequest<'a> {
    app_name: &'a str,
    user_id: &'a str,
    session_id: &'a str,
    new_message: NewMessage<'a>,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[async_trait]
impl AgentRunner for AdkClient {
    async fn run(&self, app: &str, input: &str) -> Result<AgentRun, AgentError> {
        let session_id = format!("s_{}", &Uuid::new_v4().simple().to_string()[..8]);

        // Step 1: Create session
        let session_url = format!(
            "{}/apps/{}/users/{}/sessions/{}",
            self.base_url, app, AGENT_USER_ID, session_id
        );
        let response = self
            .client
            .post(&session_url)
            .timeout(std::time::Duration::from_secs(SESSION_TIMEOUT_SECS))
            .json(&serde_json::json!({"state": {}}))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, SESSION_TIMEOUT_SECS))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::SessionCreate {
                app: app.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(app, session_id, "Agent session created");

        // Step 2: Run with the input text
        let payload = RunRequest {
            app_name: app,
            user_id: AGENT_USER_ID,
            session_id: &session_id,
            new_message: NewMessage {
                role: "user",
                parts: vec![TextPart { text: input }],
            },
        };

        let response = self
            .client
            .post(format!("{}/run", self.base_url))
            .timeout(std::time::Duration::from_secs(RUN_TIMEOUT_SECS))
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, RUN_TIMEOUT_SECS))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::RunFailed {
                app: app.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let events: Vec<Value> = response
            .json()
            .await
            .map_err(|e| AgentError::Http(format!("invalid run response JSON: {e}")))?;

        tracing::info!(app, events = events.len(), "Agent run completed");
        Ok(AgentRun::new(events))
    }
}

/// Run an agent and decode one keyed output, with retry on retryable
/// failures and on runs that produce no usable structured output.
///
/// Lookup order per attempt: the merged state delta under `key`, then the
/// first JSON object recovered from free text.
pub async fn run_expect_key<T: DeserializeOwned>(
    runner: &dyn AgentRunner,
    app: &str,
    key: &str,
    input: &str,
) -> Result<T, AgentError> {
    let mut last_error = AgentError::MissingOutput { app: app.to_string() };

    for attempt in 0..=MAX_RUN_RETRIES {
        let run = match runner.run(app, input).await {
            Ok(run) => run,
            Err(e) if is_retryable(&e) && attempt < MAX_RUN_RETRIES => {
                tracing::warn!(app, attempt = attempt + 1, error = %e, "Agent run failed, retrying");
                last_error = e;
                continue;
            }
            Err(e) => return Err(e),
        };

        match decode_keyed_output(&run, app, key) {
            Ok(decoded) => return Ok(decoded),
            Err(e) if attempt < MAX_RUN_RETRIES => {
                tracing::warn!(app, key, attempt = attempt + 1, error = %e, "Agent output unusable, retrying");
                last_error = e;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error)
}

fn decode_keyed_output<T: DeserializeOwned>(
    run: &AgentRun,
    app: &str,
    key: &str,
) -> Result<T, AgentError> {
    let state = run.state();
    if state.get(key).is_some() {
        return state.decode(key);
    }

    // Fallback: first recovered JSON object from free text
    let recovered = run.recovered_json();
    let Some(first) = recovered.into_iter().find(|v| v.is_object()) else {
        return Err(AgentError::MissingOutput { app: app.to_string() });
    };
    serde_json::from_value(first).map_err(|e| AgentError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Mock agent runner for tests — replays queued event arrays per app and
/// records every call for sequencing assertions.
pub struct MockAgentRunner {
    responses: Mutex<HashMap<String, VecDeque<Vec<Value>>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockAgentRunner {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue one run response (an event array) for `app`.
    pub fn enqueue(&self, app: &str, events: Vec<Value>) {
        self.responses
            .lock()
            .expect("mock responses lock")
            .entry(app.to_string())
            .or_default()
            .push_back(events);
    }

    /// Convenience: a single event carrying one state-delta key.
    pub fn state_event(key: &str, value: Value) -> Value {
        serde_json::json!({"actions": {"stateDelta": {key: value}}})
    }

    /// `(app, input)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("mock calls lock").clone()
    }
}

impl Default for MockAgentRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRunner for MockAgentRunner {
    async fn run(&self, app: &str, input: &str) -> Result<AgentRun, AgentError> {
        self.calls
            .lock()
            .expect("mock calls lock")
            .push((app.to_string(), input.to_string()));

        let events = self
            .responses
            .lock()
            .expect("mock responses lock")
            .get_mut(app)
            .and_then(|queue| queue.pop_front());

        match events {
            Some(events) => Ok(AgentRun::new(events)),
            None => Err(AgentError::RunFailed {
                app: app.to_string(),
                status: 500,
                body: "no mock response queued".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(serde::Deserialize, Debug)]
    struct MoodView {
        mood: String,
    }

    #[tokio::test]
    async fn expect_key_reads_state_delta() {
        let mock = MockAgentRunner::new();
        mock.enqueue(
            "checkin_summarizer",
            vec![MockAgentRunner::state_event("checkin_summary", json!({"mood": "tired"}))],
        );

        let view: MoodView = run_expect_key(&mock, "checkin_summarizer", "checkin_summary", "{}")
            .await
            .unwrap();
        assert_eq!(view.mood, "tired");
    }

    #[tokio::test]
    async fn expect_key_falls_back_to_recovered_json() {
        let mock = MockAgentRunner::new();
        mock.enqueue(
            "checkin_summarizer",
            vec![json!({"content": {"parts": [{"text": "```json\n{\"mood\": \"calm\"}\n```"}]}})],
        );

        let view: MoodView = run_expect_key(&mock, "checkin_summarizer", "checkin_summary", "{}")
            .await
            .unwrap();
        assert_eq!(view.mood, "calm");
    }

    #[tokio::test]
    async fn expect_key_retries_after_unusable_output() {
        let mock = MockAgentRunner::new();
        mock.enqueue(
            "prescription_agent",
            vec![json!({"content": {"parts": [{"text": "no json here"}]}})],
        );
        mock.enqueue(
            "prescription_agent",
            vec![MockAgentRunner::state_event("prescription_data", json!({"mood": "n/a"}))],
        );

        let view: MoodView = run_expect_key(&mock, "prescription_agent", "prescription_data", "{}")
            .await
            .unwrap();
        assert_eq!(view.mood, "n/a");
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn expect_key_gives_up_after_retries() {
        let mock = MockAgentRunner::new();
        for _ in 0..3 {
            mock.enqueue("prescription_agent", vec![json!({"content": {"parts": []}})]);
        }

        let result: Result<MoodView, _> =
            run_expect_key(&mock, "prescription_agent", "prescription_data", "{}").await;
        assert!(matches!(result, Err(AgentError::MissingOutput { .. })));
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn exhausted_mock_queue_is_run_failure_then_retried() {
        let mock = MockAgentRunner::new();
        // Only one response for three potential attempts — second attempt
        // errors with RunFailed and retries until attempts are exhausted.
        let result: Result<MoodView, _> =
            run_expect_key(&mock, "ghost_agent", "anything", "{}").await;
        assert!(result.is_err());
        assert_eq!(mock.calls().len(), 3);
    }

    #[test]
    fn adk_client_trims_trailing_slash() {
        let client = AdkClient::new("http://localhost:5010/");
        assert_eq!(client.base_url, "http://localhost:5010");
    }
}
