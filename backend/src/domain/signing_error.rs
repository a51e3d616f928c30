//! Failure taxonomy of the signing workflow.
//!
//! Services raise these and convert them into the transport-agnostic
//! [`Error`], attaching a `details.code` discriminator clients can branch on.

use serde_json::json;

use crate::domain::{Error, StepId, StepStatus, DocumentStatus};

/// Workflow-level failures, each a clean abort with no mutated state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SigningError {
    /// Input refused before any write.
    #[error("{message}")]
    Validation {
        /// Description of the problem.
        message: String,
        /// Offending field, when known.
        field: Option<&'static str>,
    },
    /// Lower-order steps are still incomplete.
    #[error("not your turn yet")]
    OutOfSequence {
        /// Display names of the signers still to act, in step order.
        blocking_signers: Vec<String>,
    },
    /// The signer has no active signature image.
    #[error("upload a signature image before signing")]
    NoActiveSignature,
    /// The stored or uploaded PDF could not be parsed.
    #[error("the document could not be read as a PDF: {message}")]
    CorruptDocument {
        /// Parser diagnostic.
        message: String,
    },
    /// Stamp rendering failed.
    #[error("stamping failed: {message}")]
    Render {
        /// Renderer diagnostic.
        message: String,
    },
    /// Neither storage bucket could serve the file.
    #[error("cannot open file")]
    FileUnavailable,
    /// An addressed record does not exist.
    #[error("{message}")]
    NotFound {
        /// Description of what is missing.
        message: String,
    },
    /// No current actor.
    #[error("login required")]
    Unauthenticated,
    /// The actor may not perform this action.
    #[error("{message}")]
    Forbidden {
        /// Description of the refusal.
        message: String,
    },
    /// The document is not open for this action.
    #[error("document is {status}")]
    DocumentClosed {
        /// Current status.
        status: DocumentStatus,
    },
    /// The step already left `Pending`.
    #[error("step {step_id} is already {status}")]
    StepClosed {
        /// The step.
        step_id: StepId,
        /// Its status.
        status: StepStatus,
    },
    /// Another action committed between read and commit.
    #[error("the document changed while you were working; reload and try again")]
    Conflict,
}

impl SigningError {
    /// Shorthand for a validation failure tied to a request field.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field),
        }
    }

    /// Shorthand for a missing record.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for a permission refusal.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }
}

impl From<SigningError> for Error {
    fn from(value: SigningError) -> Self {
        let message = value.to_string();
        match value {
            SigningError::Validation { field, .. } => Self::invalid_request(message)
                .with_details(json!({ "code": "validation_error", "field": field })),
            SigningError::OutOfSequence { blocking_signers } => Self::conflict(message)
                .with_details(json!({
                    "code": "out_of_sequence",
                    "blockingSigners": blocking_signers,
                })),
            SigningError::NoActiveSignature => Self::precondition_failed(message)
                .with_details(json!({ "code": "no_active_signature" })),
            SigningError::CorruptDocument { .. } => Self::unprocessable(message)
                .with_details(json!({ "code": "corrupt_document" })),
            SigningError::Render { .. } => {
                Self::internal(message).with_details(json!({ "code": "render_failed" }))
            }
            SigningError::FileUnavailable => {
                Self::not_found(message).with_details(json!({ "code": "file_unavailable" }))
            }
            SigningError::NotFound { .. } => {
                Self::not_found(message).with_details(json!({ "code": "not_found" }))
            }
            SigningError::Unauthenticated => {
                Self::unauthorized(message).with_details(json!({ "code": "unauthenticated" }))
            }
            SigningError::Forbidden { .. } => {
                Self::forbidden(message).with_details(json!({ "code": "forbidden" }))
            }
            SigningError::DocumentClosed { status } => Self::conflict(message).with_details(
                json!({ "code": "document_closed", "status": status.as_str() }),
            ),
            SigningError::StepClosed { status, .. } => Self::conflict(message)
                .with_details(json!({ "code": "step_closed", "status": status.as_str() })),
            SigningError::Conflict => {
                Self::conflict(message).with_details(json!({ "code": "revision_mismatch" }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    #[rstest]
    #[case(SigningError::validation("title", "title must not be empty"), ErrorCode::InvalidRequest, "validation_error")]
    #[case(SigningError::OutOfSequence { blocking_signers: vec![] }, ErrorCode::Conflict, "out_of_sequence")]
    #[case(SigningError::NoActiveSignature, ErrorCode::PreconditionFailed, "no_active_signature")]
    #[case(SigningError::CorruptDocument { message: "eof".to_owned() }, ErrorCode::UnprocessableEntity, "corrupt_document")]
    #[case(SigningError::Render { message: "font".to_owned() }, ErrorCode::InternalError, "render_failed")]
    #[case(SigningError::FileUnavailable, ErrorCode::NotFound, "file_unavailable")]
    #[case(SigningError::not_found("no such verification record"), ErrorCode::NotFound, "not_found")]
    #[case(SigningError::Unauthenticated, ErrorCode::Unauthorized, "unauthenticated")]
    #[case(SigningError::Conflict, ErrorCode::Conflict, "revision_mismatch")]
    fn maps_to_error_codes(
        #[case] error: SigningError,
        #[case] code: ErrorCode,
        #[case] detail: &str,
    ) {
        let mapped = Error::from(error);
        assert_eq!(mapped.code(), code);
        assert_eq!(mapped.detail_code(), Some(detail));
    }

    #[rstest]
    fn out_of_sequence_lists_blocking_signers() {
        let mapped = Error::from(SigningError::OutOfSequence {
            blocking_signers: vec!["Somchai Dee".to_owned()],
        });
        let details = mapped.details().expect("details present");
        assert_eq!(details["blockingSigners"], json!(["Somchai Dee"]));

        let value = serde_json::to_value(&mapped).expect("serialises error");
        insta::assert_json_snapshot!(value, { ".traceId" => "[trace_id]" }, @r#"
        {
          "code": "conflict",
          "details": {
            "blockingSigners": [
              "Somchai Dee"
            ],
            "code": "out_of_sequence"
          },
          "message": "not your turn yet"
        }
        "#);
    }
}
