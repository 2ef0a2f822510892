use std::sync::Arc;

use droichead_n8n::{N8nClient, UpstreamError};
use serde_json::{json, Map, Value};

use crate::protocol::{ToolInvocation, ToolResult};
use crate::tools::{ToolKind, ToolRegistry};

/// Execute one invocation and produce exactly one result.
///
/// The work runs in its own task so invocations never block one another and a
/// panicking handler is reported as an internal_error instead of tearing down
/// the caller's connection.
pub async fn dispatch(
    registry: Arc<ToolRegistry>,
    client: Option<Arc<N8nClient>>,
    mut invocation: ToolInvocation,
) -> ToolResult {
    let id = invocation.correlation_id();
    let fallback_id = id.clone();

    match tokio::spawn(execute(registry, client, invocation, id)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "tool invocation task failed");
            ToolResult::internal_error(fallback_id, "internal error during dispatch")
        }
    }
}

async fn execute(
    registry: Arc<ToolRegistry>,
    client: Option<Arc<N8nClient>>,
    invocation: ToolInvocation,
    id: Value,
) -> ToolResult {
    let Some(spec) = registry.find(&invocation.tool) else {
        tracing::warn!(tool = %invocation.tool, "unknown tool requested");
        return ToolResult::internal_error(id, format!("unknown tool: {}", invocation.tool));
    };

    if let Err(fault) = spec.validate(&invocation.arguments) {
        tracing::debug!(tool = spec.name, field = %fault.field, "argument validation failed");
        return ToolResult::validation_error(id, &fault.field, fault.message);
    }

    // Semantic check, still before any upstream traffic: a webhook path must
    // be absolute, e.g. "/webhook/abc123".
    if spec.kind == ToolKind::RunWebhook {
        let path = invocation
            .arguments
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or("");
        if !path.starts_with('/') {
            return ToolResult::validation_error(
                id,
                "path",
                "field 'path' must start with '/' (e.g. /webhook/abc123)",
            );
        }
    }

    let Some(client) = client else {
        return ToolResult::upstream_error(
            id,
            json!({ "message": UpstreamError::NotConfigured.to_string() }),
        );
    };

    tracing::debug!(tool = spec.name, "invoking tool");
    match run_tool(spec.kind, &client, &invocation.arguments).await {
        Ok(payload) => ToolResult::success(id, payload),
        Err(UpstreamError::Status { status, body }) => {
            tracing::warn!(tool = spec.name, status, "upstream returned an error status");
            ToolResult::upstream_error(id, json!({ "status": status, "body": body }))
        }
        Err(e) => {
            tracing::warn!(tool = spec.name, error = %e, "upstream call failed");
            ToolResult::upstream_error(id, json!({ "message": e.to_string() }))
        }
    }
}

async fn run_tool(
    kind: ToolKind,
    client: &N8nClient,
    args: &Map<String, Value>,
) -> Result<Value, UpstreamError> {
    match kind {
        ToolKind::ListWorkflows => client.get("/rest/workflows").await,
        ToolKind::CreateWorkflow => {
            // Presence and shape were validated above.
            let workflow = args.get("workflow").cloned().unwrap_or(Value::Null);
            client.post("/rest/workflows", &workflow).await
        }
        ToolKind::SetActive => {
            let id = workflow_id(args);
            let active = args.get("active").and_then(Value::as_bool).unwrap_or(true);
            client
                .patch(&format!("/rest/workflows/{}", id), &json!({ "active": active }))
                .await
        }
        ToolKind::DeleteWorkflow => {
            let id = workflow_id(args);
            let resp = client.delete(&format!("/rest/workflows/{}", id)).await?;
            Ok(json!({ "ok": true, "status": resp.status }))
        }
        ToolKind::RunWebhook => {
            let path = args.get("path").and_then(Value::as_str).unwrap_or("/");
            let payload = args.get("payload").cloned().unwrap_or_else(|| json!({}));
            let resp = client.webhook(path, &payload).await?;
            Ok(json!({ "status": resp.status, "response": resp.body }))
        }
    }
}

/// A workflow id may arrive as a string or a number; either way it becomes a
/// path segment.
fn workflow_id(args: &Map<String, Value>) -> String {
    match args.get("workflow_id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Outcome;

    fn invocation(value: Value) -> ToolInvocation {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn unknown_tool_is_an_internal_error() {
        let registry = Arc::new(ToolRegistry::new());
        let result = dispatch(
            registry,
            None,
            invocation(json!({"id": 1, "tool": "explode"})),
        )
        .await;
        assert_eq!(result.outcome, Outcome::InternalError);
        assert_eq!(result.id, json!(1));
        assert!(result.payload["message"]
            .as_str()
            .unwrap()
            .contains("unknown tool: explode"));
    }

    #[tokio::test]
    async fn validation_short_circuits_before_upstream() {
        let registry = Arc::new(ToolRegistry::new());
        // No client configured at all: a validation failure must still win.
        let result = dispatch(
            registry,
            None,
            invocation(json!({"tool": "create_workflow", "arguments": {}})),
        )
        .await;
        assert_eq!(result.outcome, Outcome::ValidationError);
        assert_eq!(result.payload["field"], "workflow");
    }

    #[tokio::test]
    async fn relative_webhook_path_is_rejected() {
        let registry = Arc::new(ToolRegistry::new());
        let result = dispatch(
            registry,
            None,
            invocation(json!({"tool": "run_webhook", "arguments": {"path": "webhook/abc"}})),
        )
        .await;
        assert_eq!(result.outcome, Outcome::ValidationError);
        assert_eq!(result.payload["field"], "path");
    }

    #[tokio::test]
    async fn missing_upstream_config_is_an_upstream_error() {
        let registry = Arc::new(ToolRegistry::new());
        let result = dispatch(
            registry,
            None,
            invocation(json!({"tool": "list_workflows"})),
        )
        .await;
        assert_eq!(result.outcome, Outcome::UpstreamError);
        assert!(result.payload["message"]
            .as_str()
            .unwrap()
            .contains("not configured"));
    }

    #[test]
    fn workflow_id_formats_numbers_and_strings() {
        let args = serde_json::from_value::<Map<String, Value>>(json!({"workflow_id": 42})).unwrap();
        assert_eq!(workflow_id(&args), "42");
        let args =
            serde_json::from_value::<Map<String, Value>>(json!({"workflow_id": "abc"})).unwrap();
        assert_eq!(workflow_id(&args), "abc");
    }
}
