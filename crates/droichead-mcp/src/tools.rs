use serde_json::{json, Map, Value};

use crate::protocol::ToolDescriptor;

/// The fixed tool set. Variants double as dispatch tags — there is no dynamic
/// registration, the five tools below are the permanent surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ListWorkflows,
    CreateWorkflow,
    SetActive,
    DeleteWorkflow,
    RunWebhook,
}

/// Primitive shapes the argument validator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Object,
    Bool,
    String,
    StringOrNumber,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::Object => value.is_object(),
            FieldKind::Bool => value.is_boolean(),
            FieldKind::String => value.is_string(),
            FieldKind::StringOrNumber => value.is_string() || value.is_number(),
        }
    }

    fn schema_type(&self) -> Value {
        match self {
            FieldKind::Object => json!("object"),
            FieldKind::Bool => json!("boolean"),
            FieldKind::String => json!("string"),
            FieldKind::StringOrNumber => json!(["string", "number"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<FieldSpec>,
}

/// The first offending field of an invalid argument mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFault {
    pub field: String,
    pub message: String,
}

impl ToolSpec {
    /// Check required-field presence, then primitive type compatibility.
    /// Unknown extra fields are allowed. Stops at the first offending field.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), ValidationFault> {
        for field in &self.fields {
            match args.get(field.name) {
                None if field.required => {
                    return Err(ValidationFault {
                        field: field.name.to_string(),
                        message: format!("missing required field '{}'", field.name),
                    });
                }
                None => {}
                Some(value) => {
                    if !field.kind.matches(value) {
                        return Err(ValidationFault {
                            field: field.name.to_string(),
                            message: format!(
                                "field '{}' has an incompatible type, expected {}",
                                field.name,
                                field.kind.schema_type()
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn descriptor(&self) -> ToolDescriptor {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".to_string(), field.kind.schema_type());
            if let Some(default) = &field.default {
                prop.insert("default".to_string(), default.clone());
            }
            properties.insert(field.name.to_string(), Value::Object(prop));
            if field.required {
                required.push(Value::String(field.name.to_string()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }

        ToolDescriptor {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: Value::Object(schema),
        }
    }
}

/// Read-only after construction; built once at startup and shared.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    specs: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let specs = vec![
            ToolSpec {
                kind: ToolKind::ListWorkflows,
                name: "list_workflows",
                description: "List all n8n workflows (GET /rest/workflows).",
                fields: vec![],
            },
            ToolSpec {
                kind: ToolKind::CreateWorkflow,
                name: "create_workflow",
                description: "Create an n8n workflow. Input: { workflow: <n8n export/import JSON> }",
                fields: vec![FieldSpec {
                    name: "workflow",
                    kind: FieldKind::Object,
                    required: true,
                    default: None,
                }],
            },
            ToolSpec {
                kind: ToolKind::SetActive,
                name: "set_active",
                description: "Activate or deactivate a workflow. Input: { workflow_id: string|number, active: boolean }",
                fields: vec![
                    FieldSpec {
                        name: "workflow_id",
                        kind: FieldKind::StringOrNumber,
                        required: true,
                        default: None,
                    },
                    FieldSpec {
                        name: "active",
                        kind: FieldKind::Bool,
                        required: false,
                        default: Some(json!(true)),
                    },
                ],
            },
            ToolSpec {
                kind: ToolKind::DeleteWorkflow,
                name: "delete_workflow",
                description: "Delete a workflow. Input: { workflow_id }",
                fields: vec![FieldSpec {
                    name: "workflow_id",
                    kind: FieldKind::StringOrNumber,
                    required: true,
                    default: None,
                }],
            },
            ToolSpec {
                kind: ToolKind::RunWebhook,
                name: "run_webhook",
                description: "Trigger a workflow by its webhook. Input: { path: '/webhook/...', payload?: object }",
                fields: vec![
                    FieldSpec {
                        name: "path",
                        kind: FieldKind::String,
                        required: true,
                        default: None,
                    },
                    FieldSpec {
                        name: "payload",
                        kind: FieldKind::Object,
                        required: false,
                        default: Some(json!({})),
                    },
                ],
            },
        ];

        Self { specs }
    }

    pub fn find(&self, name: &str) -> Option<&ToolSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.specs.iter().map(ToolSpec::descriptor).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn registry_holds_the_five_tools() {
        let registry = ToolRegistry::new();
        let names: Vec<_> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "list_workflows",
                "create_workflow",
                "set_active",
                "delete_workflow",
                "run_webhook"
            ]
        );
    }

    #[test]
    fn missing_workflow_names_the_field() {
        let registry = ToolRegistry::new();
        let spec = registry.find("create_workflow").unwrap();
        let fault = spec.validate(&args(json!({}))).unwrap_err();
        assert_eq!(fault.field, "workflow");
    }

    #[test]
    fn workflow_must_be_an_object() {
        let registry = ToolRegistry::new();
        let spec = registry.find("create_workflow").unwrap();
        let fault = spec.validate(&args(json!({"workflow": "not-an-object"}))).unwrap_err();
        assert_eq!(fault.field, "workflow");
    }

    #[test]
    fn workflow_id_accepts_string_or_number() {
        let registry = ToolRegistry::new();
        let spec = registry.find("set_active").unwrap();
        assert!(spec.validate(&args(json!({"workflow_id": "abc"}))).is_ok());
        assert!(spec.validate(&args(json!({"workflow_id": 12}))).is_ok());
        let fault = spec.validate(&args(json!({"workflow_id": true}))).unwrap_err();
        assert_eq!(fault.field, "workflow_id");
    }

    #[test]
    fn active_must_be_boolean_when_present() {
        let registry = ToolRegistry::new();
        let spec = registry.find("set_active").unwrap();
        let fault = spec
            .validate(&args(json!({"workflow_id": "abc", "active": "yes"})))
            .unwrap_err();
        assert_eq!(fault.field, "active");
    }

    #[test]
    fn unknown_extra_fields_are_allowed() {
        let registry = ToolRegistry::new();
        let spec = registry.find("delete_workflow").unwrap();
        assert!(spec
            .validate(&args(json!({"workflow_id": "abc", "dry_run": true})))
            .is_ok());
    }

    #[test]
    fn schemas_carry_required_and_defaults() {
        let registry = ToolRegistry::new();
        let descriptor = registry.find("set_active").unwrap().descriptor();
        assert_eq!(descriptor.input_schema["required"], json!(["workflow_id"]));
        assert_eq!(
            descriptor.input_schema["properties"]["active"]["default"],
            json!(true)
        );

        let no_args = registry.find("list_workflows").unwrap().descriptor();
        assert_eq!(no_args.input_schema["type"], "object");
        assert!(no_args.input_schema.get("required").is_none());
    }
}
