use chrono::{DateTime, Utc};
use flowforge_core::Step;
use serde::{Deserialize, Serialize};

/// A persisted workflow as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub agent_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub schema: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for both create and update calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveWorkflowRequest {
    pub name: String,
    pub schema: Vec<Step>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_parses_a_backend_response() {
        let doc: WorkflowDocument = serde_json::from_str(
            r#"{
                "id": "wf-9",
                "name": "Order triage",
                "agent_type": "support",
                "status": "active",
                "created_at": "2026-03-01T09:30:00Z",
                "schema": [
                    {"id": "1", "label": "Start", "type": "start", "next": "2"},
                    {"id": "2", "label": "Done", "type": "end"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.id, "wf-9");
        assert_eq!(doc.agent_type.as_deref(), Some("support"));
        assert_eq!(doc.schema.len(), 2);
        assert!(doc.created_at.is_some());
        assert!(doc.updated_at.is_none());
    }

    #[test]
    fn document_tolerates_minimal_responses() {
        let doc: WorkflowDocument =
            serde_json::from_str(r#"{"id": "wf-1", "name": "Empty"}"#).unwrap();
        assert!(doc.schema.is_empty());
        assert!(doc.status.is_none());
    }
}
