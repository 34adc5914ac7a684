//! The boundary to the external reasoning oracle.
//!
//! The oracle is untrusted: whatever it returns is parsed into the closed
//! [`OracleReply`] variant set, and anything that does not fit becomes
//! [`OracleReply::CannotProceed`].

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::DocumentSummary;
use crate::mutation::EditOperation;
use crate::session::OperationLog;

/// Everything the oracle is told about the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub instruction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_sheet: Option<String>,
    pub summary: DocumentSummary,
    /// Every attempt so far, failures included
    pub log: OperationLog,
    pub iteration: usize,
}

impl OracleRequest {
    /// JSON rendering for oracles that take a text prompt.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::Error::Serialization(format!("Failed to render oracle request: {}", e)))
    }
}

/// What the oracle may answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum OracleReply {
    /// Apply this operation next
    Propose {
        operation: EditOperation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rationale: Option<String>,
    },
    /// The instruction is fully carried out
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    /// The oracle gives up
    CannotProceed { reason: String },
}

impl OracleReply {
    /// Parse a raw oracle answer.
    ///
    /// A single surrounding Markdown code fence is tolerated. Anything that is
    /// not exactly one of the reply variants becomes `CannotProceed`.
    pub fn from_json(raw: &str) -> Self {
        let text = strip_code_fence(raw.trim());
        match serde_json::from_str::<OracleReply>(text) {
            Ok(reply) => reply,
            Err(e) => OracleReply::CannotProceed {
                reason: format!("unrecognized oracle reply: {}", e),
            },
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop an info string such as `json`
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

/// Failure to get an answer at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("malformed oracle reply: {0}")]
    Malformed(String),
}

/// Proposes the next edit step for a run.
pub trait ReasoningOracle: Send + Sync {
    fn propose_next(
        &self,
        request: &OracleRequest,
    ) -> impl Future<Output = Result<OracleReply, OracleError>> + Send;
}

impl<T: ReasoningOracle> ReasoningOracle for Arc<T> {
    fn propose_next(
        &self,
        request: &OracleRequest,
    ) -> impl Future<Output = Result<OracleReply, OracleError>> + Send {
        (**self).propose_next(request)
    }
}

/// Stand-in for runs without an oracle; always unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOracle;

impl ReasoningOracle for NoOracle {
    async fn propose_next(&self, _request: &OracleRequest) -> Result<OracleReply, OracleError> {
        Err(OracleError::Unavailable("no oracle configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::{ChoiceEntry, OperationKind};

    #[test]
    fn test_parse_propose() {
        let raw = r#"{"signal":"propose","operation":{"op":"add_choice_entries","list_name":"colors","entries":[{"name":"red"}]},"rationale":"needed"}"#;
        match OracleReply::from_json(raw) {
            OracleReply::Propose {
                operation,
                rationale,
            } => {
                assert_eq!(operation.kind(), OperationKind::AddChoiceEntries);
                assert_eq!(rationale.as_deref(), Some("needed"));
                assert_eq!(
                    operation,
                    EditOperation::AddChoiceEntries {
                        list_name: "colors".into(),
                        entries: vec![ChoiceEntry::new("red")],
                        sheet: None,
                    }
                );
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_fenced_complete() {
        let raw = "```json\n{\"signal\": \"complete\"}\n```";
        assert_eq!(
            OracleReply::from_json(raw),
            OracleReply::Complete { note: None }
        );
    }

    #[test]
    fn test_anything_else_cannot_proceed() {
        for raw in [
            "Sure! I'll add the choices now.",
            r#"{"signal":"maybe"}"#,
            r#"{"signal":"propose","operation":{"op":"drop_table","sheet":"survey"}}"#,
            "",
        ] {
            assert!(
                matches!(OracleReply::from_json(raw), OracleReply::CannotProceed { .. }),
                "{:?} should not parse",
                raw
            );
        }
    }

    #[tokio::test]
    async fn test_no_oracle_is_unavailable() {
        let request = OracleRequest {
            instruction: "x".into(),
            target_sheet: None,
            summary: crate::test_support::sample_document().describe(5),
            log: OperationLog::new(),
            iteration: 1,
        };
        assert!(matches!(
            NoOracle.propose_next(&request).await,
            Err(OracleError::Unavailable(_))
        ));
        assert!(request.to_json().unwrap().contains("\"instruction\":\"x\""));
    }
}
