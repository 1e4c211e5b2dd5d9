use serde::{Deserialize, Deserializer, Serialize};

use crate::Position;

/// One step of the backend schema list.
///
/// Linear steps carry `next`; decision steps carry `conditions` instead.
/// `next` distinguishes "field absent" (outer `None`, used by `end` and
/// `decision` steps) from an explicit `null` (unwired linear step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(
        default,
        deserialize_with = "nullable_field",
        skip_serializing_if = "Option::is_none"
    )]
    pub next: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<ConditionBinding>>,
}

/// One branch of a decision step: the condition label and its destination.
/// `next` is `null` while the branch is not wired to a step yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionBinding {
    pub label: String,
    pub next: Option<String>,
}

/// The standalone import/export document shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaEnvelope {
    pub schema: Vec<Step>,
}

/// Keeps `null` distinguishable from a missing field: a present `null`
/// becomes `Some(None)`, while `#[serde(default)]` covers absence.
fn nullable_field<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
