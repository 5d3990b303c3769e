//! Long-running operations
//!
//! Status values reported by the Lume service, the per-endpoint-family table
//! deciding which of them mean "keep polling", and the operation handle that
//! carries a status payload through the poller.

use crate::error::{LumeError, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Status of a remote operation
///
/// Parsing is case-insensitive; anything unrecognized is kept verbatim in
/// [`Status::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Queued,
    Running,
    Pending,
    Finished,
    Succeeded,
    Failed,
    NeedsReview,
    Other(String),
}

impl Status {
    /// Parse a status string; never fails, unknown values become [`Status::Other`]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "queued" => Self::Queued,
            "running" => Self::Running,
            "pending" => Self::Pending,
            "finished" => Self::Finished,
            "succeeded" | "success" => Self::Succeeded,
            "failed" => Self::Failed,
            "needs_review" => Self::NeedsReview,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Finished => "finished",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::NeedsReview => "needs_review",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the service documents this status
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl FromStr for Status {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const RUN_PENDING: &[Status] = &[Status::Queued, Status::Running];
const CONFIDENCE_PENDING: &[Status] = &[Status::Pending, Status::Running, Status::Queued];
const DOCUMENT_PENDING: &[Status] = &[Status::Queued, Status::Pending];

/// Endpoint family an operation was submitted to
///
/// Each family reports progress with its own vocabulary, so the set of
/// statuses that mean "still working" is defined per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationFamily {
    /// Job runs and workshop runs, polled at `results/{id}`
    Result,
    /// Pipeline runs, polled at `mappings/{id}`
    Mapping,
    /// Confidence score generation, polled at `results/{id}/confidence`
    Confidence,
    /// PDF form and order extraction on the files service
    Document,
}

impl OperationFamily {
    pub fn pending_statuses(&self) -> &'static [Status] {
        match self {
            Self::Result | Self::Mapping => RUN_PENDING,
            Self::Confidence => CONFIDENCE_PENDING,
            Self::Document => DOCUMENT_PENDING,
        }
    }

    /// Everything outside the pending set is terminal, unknown values included
    pub fn is_pending(&self, status: &Status) -> bool {
        self.pending_statuses().contains(status)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Result => "result",
            Self::Mapping => "mapping",
            Self::Confidence => "confidence",
            Self::Document => "document",
        }
    }
}

/// Handle of a submitted operation
///
/// `body` is the complete payload the status came from, so fields beyond
/// `id`/`status` reach the final record untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: String,
    pub status: Status,
    pub body: Value,
}

impl Operation {
    /// Build a handle from a status payload (`{"id": .., "status": .., ...}`)
    pub fn from_value(body: Value) -> Result<Self> {
        let id = id_of(&body).ok_or_else(|| {
            LumeError::UnexpectedResponse("operation payload has no `id`".to_string())
        })?;
        Self::build(id, body)
    }

    /// Build a handle for an operation whose id is already known
    ///
    /// Payloads of some endpoints only carry `status`; an `id` in the body
    /// still wins over the given one.
    pub fn with_id(id: &str, body: Value) -> Result<Self> {
        let id = id_of(&body).unwrap_or_else(|| id.to_string());
        Self::build(id, body)
    }

    fn build(id: String, body: Value) -> Result<Self> {
        let status = body
            .get("status")
            .and_then(|v| v.as_str())
            .map(Status::parse)
            .ok_or_else(|| {
                LumeError::UnexpectedResponse(format!("operation {} has no `status`", id))
            })?;

        Ok(Self { id, status, body })
    }

    /// Decode the carried payload into a typed record
    pub fn into_record<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.body).map_err(|source| LumeError::Decode {
            url: format!("operation {}", self.id),
            source,
        })
    }
}

/// Identifier of a payload; the service sends ids as strings or integers
fn id_of(body: &Value) -> Option<String> {
    match body.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Deserialize an optional record id given as a string or an integer
pub(crate) fn lenient_id<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or integer id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!(Status::parse("QUEUED"), Status::Queued);
        assert_eq!(Status::parse("queued"), Status::Queued);
        assert_eq!(Status::parse("PENDING"), Status::Pending);
        assert_eq!(Status::parse("needs_review"), Status::NeedsReview);
        assert_eq!(
            Status::parse("archived"),
            Status::Other("archived".to_string())
        );
        assert!(!Status::parse("archived").is_known());
        assert_eq!(Status::parse("archived").as_str(), "archived");
    }

    #[test]
    fn test_family_pending_tables() {
        assert!(OperationFamily::Result.is_pending(&Status::Queued));
        assert!(OperationFamily::Result.is_pending(&Status::Running));
        assert!(!OperationFamily::Result.is_pending(&Status::Pending));
        assert!(!OperationFamily::Result.is_pending(&Status::Finished));

        assert!(OperationFamily::Confidence.is_pending(&Status::Pending));
        assert!(OperationFamily::Confidence.is_pending(&Status::Running));

        assert!(OperationFamily::Document.is_pending(&Status::parse("QUEUED")));
        assert!(OperationFamily::Document.is_pending(&Status::parse("PENDING")));
        assert!(!OperationFamily::Document.is_pending(&Status::Running));
    }

    #[test]
    fn test_unknown_status_is_terminal_everywhere() {
        let unknown = Status::parse("exploded");
        for family in [
            OperationFamily::Result,
            OperationFamily::Mapping,
            OperationFamily::Confidence,
            OperationFamily::Document,
        ] {
            assert!(!family.is_pending(&unknown), "{}", family.as_str());
        }
    }

    #[test]
    fn test_operation_from_value_keeps_extra_fields() {
        let op = Operation::from_value(json!({
            "id": "r-1",
            "status": "finished",
            "created_at": "2024-01-01"
        }))
        .unwrap();

        assert_eq!(op.id, "r-1");
        assert_eq!(op.status, Status::Finished);
        assert_eq!(op.body["created_at"], "2024-01-01");
    }

    #[test]
    fn test_operation_numeric_id() {
        let op = Operation::from_value(json!({"id": 17, "status": "QUEUED"})).unwrap();
        assert_eq!(op.id, "17");
        assert_eq!(op.status, Status::Queued);
    }

    #[test]
    fn test_status_implements_from_str() {
        let status: Status = "Running".parse().unwrap();
        assert_eq!(status, Status::Running);
    }

    #[test]
    fn test_with_id_falls_back_to_known_id() {
        let op = Operation::with_id("r-1", json!({"status": "pending"})).unwrap();
        assert_eq!(op.id, "r-1");
        assert_eq!(op.status, Status::Pending);

        let op = Operation::with_id("r-1", json!({"id": 9, "status": "finished"})).unwrap();
        assert_eq!(op.id, "9");

        assert!(matches!(
            Operation::with_id("r-1", json!({"scores": {}})),
            Err(LumeError::UnexpectedResponse(_))
        ));
    }

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(default, deserialize_with = "lenient_id")]
        id: Option<String>,
    }

    #[test]
    fn test_lenient_id_accepts_strings_and_integers() {
        let from_number: Record = serde_json::from_value(json!({"id": 5})).unwrap();
        assert_eq!(from_number.id.as_deref(), Some("5"));

        let from_string: Record = serde_json::from_value(json!({"id": "r-5"})).unwrap();
        assert_eq!(from_string.id.as_deref(), Some("r-5"));

        let missing: Record = serde_json::from_value(json!({})).unwrap();
        assert!(missing.id.is_none());

        assert!(serde_json::from_value::<Record>(json!({"id": [1]})).is_err());
    }

    #[test]
    fn test_operation_missing_fields() {
        assert!(matches!(
            Operation::from_value(json!({"status": "queued"})),
            Err(LumeError::UnexpectedResponse(_))
        ));
        assert!(matches!(
            Operation::from_value(json!({"id": "x"})),
            Err(LumeError::UnexpectedResponse(_))
        ));
    }
}
