use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One request to execute a tool. The correlation id is caller-assigned when
/// present; the gateway assigns a v4 uuid at ingress otherwise, so every
/// result is correlatable.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInvocation {
    #[serde(default)]
    pub id: Option<Value>,
    pub tool: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    /// Correlation id for this invocation, assigning one if the caller did not.
    pub fn correlation_id(&mut self) -> Value {
        if self.id.is_none() {
            self.id = Some(Value::String(uuid::Uuid::new_v4().to_string()));
        }
        self.id.clone().unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    ValidationError,
    UpstreamError,
    InternalError,
}

/// The single response produced for every invocation, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub id: Value,
    pub outcome: Outcome,
    pub payload: Value,
}

impl ToolResult {
    pub fn success(id: Value, payload: Value) -> Self {
        Self {
            id,
            outcome: Outcome::Success,
            payload,
        }
    }

    pub fn validation_error(id: Value, field: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Outcome::ValidationError,
            payload: serde_json::json!({
                "field": field,
                "message": message.into(),
            }),
        }
    }

    pub fn upstream_error(id: Value, payload: Value) -> Self {
        Self {
            id,
            outcome: Outcome::UpstreamError,
            payload,
        }
    }

    pub fn internal_error(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Outcome::InternalError,
            payload: serde_json::json!({ "message": message.into() }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// First event on every streaming connection: who we are and which tools the
/// caller may invoke, schemas included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityAnnouncement {
    pub server_info: ServerInfo,
    pub tools: Vec<ToolDescriptor>,
}
