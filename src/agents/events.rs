//! Decoding of agent-server run responses.
//!
//! A run returns a JSON array of events. Sequential pipelines emit one event
//! per sub-agent; each event may carry `actions.stateDelta` with that
//! stage's keyed output. When no delta is present the structured output has
//! to be recovered from free text (direct JSON or fenced ```json blocks).

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::AgentError;

/// Raw result of one agent run: the event array as returned by the server.
#[derive(Debug, Clone, Default)]
pub struct AgentRun {
    pub events: Vec<Value>,
}

impl AgentRun {
    pub fn new(events: Vec<Value>) -> Self {
        Self { events }
    }

    /// Fold every `actions.stateDelta` into a single state, in event order.
    /// Later stages win on key collision.
    pub fn state(&self) -> PipelineState {
        let mut state = PipelineState::default();
        for event in &self.events {
            if let Some(delta) = event
                .get("actions")
                .and_then(|a| a.get("stateDelta"))
                .and_then(|d| d.as_object())
            {
                state.merge_delta(delta);
            }
        }
        state
    }

    /// Recover JSON objects embedded in text parts, for runs that carry no
    /// state delta. Scans the raw events recursively for `text` fields and
    /// parses each as direct JSON or as fenced ```json blocks.
    pub fn recovered_json(&self) -> Vec<Value> {
        let mut found = Vec::new();
        for event in &self.events {
            collect_text_json(event, &mut found);
        }
        found
    }
}

fn collect_text_json(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                extract_json_from_text(text, out);
            }
            for v in map.values() {
                collect_text_json(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_text_json(v, out);
            }
        }
        _ => {}
    }
}

fn fenced_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("fenced json regex"))
}

/// Parse a text blob as direct JSON, falling back to fenced ```json blocks.
fn extract_json_from_text(text: &str, out: &mut Vec<Value>) {
    if let Ok(direct) = serde_json::from_str::<Value>(text.trim()) {
        if direct.is_object() || direct.is_array() {
            out.push(direct);
            return;
        }
    }
    for captures in fenced_json_re().captures_iter(text) {
        if let Some(block) = captures.get(1) {
            match serde_json::from_str::<Value>(block.as_str().trim()) {
                Ok(parsed) => out.push(parsed),
                Err(_) => tracing::warn!("Failed to parse a fenced JSON block"),
            }
        }
    }
}

/// Accumulated keyed outputs of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    values: Map<String, Value>,
}

impl PipelineState {
    pub fn merge_delta(&mut self, delta: &Map<String, Value>) {
        for (key, value) in delta {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The whole state as one JSON object.
    pub fn as_value(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Deserialize one keyed output into its schema struct.
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Result<T, AgentError> {
        let value = self.values.get(key).ok_or_else(|| AgentError::Decode {
            key: key.to_string(),
            reason: "key not present in pipeline state".into(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| AgentError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Like `decode`, but a missing or undecodable key yields the schema's
    /// default shape instead of an error.
    pub fn decode_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.decode(key) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(key, error = %e, "Pipeline state key fell back to default");
                T::default()
            }
        }
    }
}

/// Decode an array leniently — skip items that fail to deserialize.
pub fn decode_array_lenient<T: DeserializeOwned>(items: &[Value]) -> Vec<T> {
    items
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

/// `deserialize_with` adapter for entity lists in agent schemas: `null`
/// becomes empty and undecodable elements are skipped instead of failing
/// the whole struct.
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: DeserializeOwned,
{
    use serde::Deserialize;
    let items = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(items.map(|arr| decode_array_lenient(&arr)).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn run_with_deltas() -> AgentRun {
        AgentRun::new(vec![
            json!({
                "author": "lab_parser_agent",
                "actions": {"stateDelta": {"raw_lab_data": {"metrics": [{"test_name": "Glucose"}]}}}
            }),
            json!({
                "author": "lab_risk_scorer_agent",
                "actions": {"stateDelta": {"lab_risk_scores": {"severity": "Moderate"}}}
            }),
        ])
    }

    #[test]
    fn state_merges_deltas_in_order() {
        let state = run_with_deltas().state();
        assert_eq!(state.get("raw_lab_data").unwrap()["metrics"][0]["test_name"], "Glucose");
        assert_eq!(state.get("lab_risk_scores").unwrap()["severity"], "Moderate");
    }

    #[test]
    fn later_delta_wins_on_collision() {
        let run = AgentRun::new(vec![
            json!({"actions": {"stateDelta": {"summary": "draft"}}}),
            json!({"actions": {"stateDelta": {"summary": "final"}}}),
        ]);
        assert_eq!(run.state().get("summary").unwrap(), "final");
    }

    #[test]
    fn events_without_actions_are_skipped() {
        let run = AgentRun::new(vec![
            json!({"content": {"parts": [{"text": "thinking..."}]}}),
            json!({"actions": {"stateDelta": {"timeline": {"events": []}}}}),
        ]);
        let state = run.state();
        assert!(state.get("timeline").is_some());
    }

    #[test]
    fn recovers_direct_json_from_text_parts() {
        let run = AgentRun::new(vec![json!({
            "content": {"parts": [{"text": "{\"mood\": \"tired\"}"}]}
        })]);
        let recovered = run.recovered_json();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0]["mood"], "tired");
    }

    #[test]
    fn recovers_fenced_json_blocks() {
        let text = "Here you go:\n```json\n{\"overall_risk\": \"Low\"}\n```\nDone.";
        let run = AgentRun::new(vec![json!({"content": {"parts": [{"text": text}]}})]);
        let recovered = run.recovered_json();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0]["overall_risk"], "Low");
    }

    #[test]
    fn broken_fenced_block_is_skipped() {
        let text = "```json\n{broken\n```\n```json\n{\"ok\": true}\n```";
        let run = AgentRun::new(vec![json!({"content": {"parts": [{"text": text}]}})]);
        let recovered = run.recovered_json();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0]["ok"], true);
    }

    #[test]
    fn plain_prose_recovers_nothing() {
        let run = AgentRun::new(vec![json!({
            "content": {"parts": [{"text": "No structured data here."}]}
        })]);
        assert!(run.recovered_json().is_empty());
    }

    #[derive(Deserialize, Default, PartialEq, Debug)]
    struct RiskView {
        #[serde(default)]
        severity: Option<String>,
    }

    #[test]
    fn decode_typed_key() {
        let state = run_with_deltas().state();
        let risk: RiskView = state.decode("lab_risk_scores").unwrap();
        assert_eq!(risk.severity.as_deref(), Some("Moderate"));
    }

    #[test]
    fn decode_missing_key_errors_but_default_fallback_succeeds() {
        let state = run_with_deltas().state();
        assert!(state.decode::<RiskView>("nope").is_err());
        assert_eq!(state.decode_or_default::<RiskView>("nope"), RiskView::default());
    }

    #[test]
    fn lenient_array_skips_bad_items() {
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }
        let items = vec![
            json!({"name": "Metformin"}),
            json!({"no_name": true}),
            json!({"name": "Amlodipine"}),
        ];
        let parsed: Vec<Named> = decode_array_lenient(&items);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "Metformin");
    }
}
