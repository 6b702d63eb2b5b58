// Blocking HTTP client for the conversational agent's `/v1/agent/turn`
// endpoint. Follows the teacher's `LlmClient::chat` blocking-HTTP-with-
// timeout-and-context idiom; request/response shape matches the Python
// `AgentClient.turn` reference.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransientAgentError;

#[derive(Debug, Serialize)]
struct TurnRequest<'a> {
    input: &'a str,
    #[serde(rename = "sessionId")]
    session_id: &'a str,
    confirm: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentTurnResponse {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub actions: Option<Vec<AgentAction>>,
    #[serde(default)]
    pub result: Option<AgentResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentAction {
    #[serde(rename = "deviceId", default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

impl AgentAction {
    pub fn resolved_device_id(&self) -> String {
        self.device_id
            .clone()
            .or_else(|| self.id.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentResult {
    #[serde(default)]
    pub results: Option<Vec<AgentActionResult>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentActionResult {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(rename = "deviceId", default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

pub struct AgentClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl AgentClient {
    pub fn new(base_url: String, timeout_s: u64) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_s))
            .build()
            .context("failed to build agent http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn turn(
        &self,
        session_id: &str,
        text: &str,
        confirm: bool,
    ) -> Result<AgentTurnResponse, TransientAgentError> {
        let url = format!("{}/v1/agent/turn", self.base_url);
        let request = TurnRequest {
            input: text,
            session_id,
            confirm,
        };

        tracing::debug!(%url, session_id, confirm, "agent.request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| TransientAgentError(format!("agent request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransientAgentError(format!(
                "agent_http_{}: {}",
                status.as_u16(),
                body.chars().take(300).collect::<String>()
            )));
        }

        response
            .json()
            .map_err(|e| TransientAgentError(format!("failed to parse agent response: {e}")))
    }
}
