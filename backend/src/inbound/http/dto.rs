//! JSON bodies shared by the document, signing and verification handlers.
//!
//! Identifiers and timestamps are rendered as strings (UUID and RFC 3339) so
//! the domain types stay free of serialisation concerns.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    DocumentTimeline, RejectOutcome, SignOutcome, SignedUrl, SigningTask, StepEligibility,
    TimelineEntry, TimelineStep,
};
use crate::domain::{
    Document, LedgerEntry, SignatureAsset, VerificationView, VerifiedRound, VerifiedStep,
    WorkflowStep,
};

/// A document's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    #[schema(format = "uuid")]
    pub id: String,
    pub title: String,
    pub document_number: Option<String>,
    #[schema(format = "uuid")]
    pub owner_id: String,
    pub category: Option<String>,
    #[schema(example = "in_progress")]
    pub status: String,
    pub revision: i64,
    pub original_hash: Option<String>,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[schema(format = "date-time")]
    pub updated_at: String,
}

impl From<Document> for DocumentBody {
    fn from(value: Document) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            document_number: value.document_number,
            owner_id: value.owner_id.to_string(),
            category: value.category,
            status: value.status.as_str().to_owned(),
            revision: value.revision,
            original_hash: value.original_hash.map(|hash| hash.as_str().to_owned()),
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

/// One workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepBody {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub document_id: String,
    #[schema(format = "uuid")]
    pub signer_id: String,
    pub step_order: u32,
    #[schema(example = "sign")]
    pub required_action: String,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(format = "uuid")]
    pub signature_ref: Option<String>,
    #[schema(format = "date-time")]
    pub completed_at: Option<String>,
}

impl From<WorkflowStep> for StepBody {
    fn from(value: WorkflowStep) -> Self {
        Self {
            id: value.id.to_string(),
            document_id: value.document_id.to_string(),
            signer_id: value.signer_id.to_string(),
            step_order: value.step_order.get(),
            required_action: value.required_action.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            signature_ref: value.signature_ref.map(|id| id.to_string()),
            completed_at: value.completed_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryBody {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub signer_id: String,
    pub step_order: u32,
    #[schema(example = "signed")]
    pub action: String,
    pub document_hash: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub verification_code: String,
    pub rejection_reason: Option<String>,
    #[schema(format = "date-time")]
    pub signed_at: String,
}

impl From<LedgerEntry> for LedgerEntryBody {
    fn from(value: LedgerEntry) -> Self {
        Self {
            id: value.id.to_string(),
            signer_id: value.signer_id.to_string(),
            step_order: value.step_order.get(),
            action: value.action.as_str().to_owned(),
            document_hash: value.document_hash.map(|hash| hash.as_str().to_owned()),
            position: value.signer.position,
            department: value.signer.department,
            verification_code: value.verification_code.as_str().to_owned(),
            rejection_reason: value.rejection_reason,
            signed_at: value.signed_at.to_rfc3339(),
        }
    }
}

/// A short-lived file link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlBody {
    #[schema(example = "/files/signed/doc_step1.pdf?expires=1773480600&token=...")]
    pub url: String,
    #[schema(format = "date-time")]
    pub expires_at: String,
}

impl From<SignedUrl> for SignedUrlBody {
    fn from(value: SignedUrl) -> Self {
        Self {
            url: value.path(),
            expires_at: value.expires_at.to_rfc3339(),
        }
    }
}

/// A step with its signer's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStepBody {
    pub step: StepBody,
    pub signer_name: String,
}

/// A ledger entry with its signer's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntryBody {
    pub entry: LedgerEntryBody,
    pub signer_name: String,
}

/// Steps and ledger entries of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineBody {
    pub document: DocumentBody,
    pub steps: Vec<TimelineStepBody>,
    pub entries: Vec<TimelineEntryBody>,
}

impl From<DocumentTimeline> for TimelineBody {
    fn from(value: DocumentTimeline) -> Self {
        Self {
            document: value.document.into(),
            steps: value
                .steps
                .into_iter()
                .map(|TimelineStep { step, signer_name }| TimelineStepBody {
                    step: step.into(),
                    signer_name,
                })
                .collect(),
            entries: value
                .entries
                .into_iter()
                .map(|TimelineEntry { entry, signer_name }| TimelineEntryBody {
                    entry: entry.into(),
                    signer_name,
                })
                .collect(),
        }
    }
}

/// One inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskBody {
    pub step: StepBody,
    pub title: String,
    pub document_number: Option<String>,
    pub document_status: String,
    pub owner_name: String,
    pub total_steps: usize,
    pub can_sign: bool,
    pub waiting_for: Vec<String>,
}

impl From<SigningTask> for TaskBody {
    fn from(value: SigningTask) -> Self {
        Self {
            step: value.step.into(),
            title: value.title,
            document_number: value.document_number,
            document_status: value.document_status.as_str().to_owned(),
            owner_name: value.owner_name,
            total_steps: value.total_steps,
            can_sign: value.can_sign,
            waiting_for: value.waiting_for,
        }
    }
}

/// Whether the caller may act on a step now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityBody {
    #[schema(format = "uuid")]
    pub step_id: String,
    pub eligible: bool,
    pub blocking_signers: Vec<String>,
}

impl From<StepEligibility> for EligibilityBody {
    fn from(value: StepEligibility) -> Self {
        Self {
            step_id: value.step_id.to_string(),
            eligible: value.eligible,
            blocking_signers: value.blocking_signers,
        }
    }
}

/// Result of a signing round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignOutcomeBody {
    pub document: DocumentBody,
    pub step: StepBody,
    pub entry: LedgerEntryBody,
    pub verify_url: String,
}

impl From<SignOutcome> for SignOutcomeBody {
    fn from(value: SignOutcome) -> Self {
        Self {
            document: value.document.into(),
            step: value.step.into(),
            entry: value.entry.into(),
            verify_url: value.verify_url,
        }
    }
}

/// Result of a rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectOutcomeBody {
    pub document: DocumentBody,
    pub step: StepBody,
    #[schema(value_type = Vec<uuid::Uuid>)]
    pub cascaded: Vec<String>,
    pub entry: LedgerEntryBody,
}

impl From<RejectOutcome> for RejectOutcomeBody {
    fn from(value: RejectOutcome) -> Self {
        Self {
            document: value.document.into(),
            step: value.step.into(),
            cascaded: value.cascaded.iter().map(ToString::to_string).collect(),
            entry: value.entry.into(),
        }
    }
}

/// Metadata of a stored signature image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureAssetBody {
    #[schema(format = "uuid")]
    pub id: String,
    pub is_active: bool,
    #[schema(format = "date-time")]
    pub created_at: String,
}

impl From<SignatureAsset> for SignatureAssetBody {
    fn from(value: SignatureAsset) -> Self {
        Self {
            id: value.id.to_string(),
            is_active: value.is_active,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

/// One completed or rejected round as shown to a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedRoundBody {
    pub step_order: u32,
    pub signer_name: String,
    pub action: String,
    #[schema(format = "date-time")]
    pub signed_at: String,
    pub document_hash: Option<String>,
}

impl From<VerifiedRound> for VerifiedRoundBody {
    fn from(value: VerifiedRound) -> Self {
        Self {
            step_order: value.step_order.get(),
            signer_name: value.signer_name,
            action: value.action.as_str().to_owned(),
            signed_at: value.signed_at.to_rfc3339(),
            document_hash: value.document_hash.map(|hash| hash.as_str().to_owned()),
        }
    }
}

/// One step of the chain as shown to a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedStepBody {
    pub step_order: u32,
    pub signer_name: String,
    pub position: Option<String>,
    pub department: Option<String>,
    pub required_action: String,
    pub status: String,
    pub is_current: bool,
    pub action: Option<String>,
    #[schema(format = "date-time")]
    pub acted_at: Option<String>,
    pub document_hash: Option<String>,
    pub rejection_reason: Option<String>,
    #[schema(example = "approved")]
    pub kyc_status: String,
}

impl From<VerifiedStep> for VerifiedStepBody {
    fn from(value: VerifiedStep) -> Self {
        Self {
            step_order: value.step_order.get(),
            signer_name: value.signer_name,
            position: value.position,
            department: value.department,
            required_action: value.required_action.as_str().to_owned(),
            status: value.status.as_str().to_owned(),
            is_current: value.is_current,
            action: value.action.map(|action| action.as_str().to_owned()),
            acted_at: value.acted_at.map(|at| at.to_rfc3339()),
            document_hash: value.document_hash.map(|hash| hash.as_str().to_owned()),
            rejection_reason: value.rejection_reason,
            kyc_status: value.kyc_status.as_str().to_owned(),
        }
    }
}

/// Public reconstruction of a document's signing history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationBody {
    #[schema(format = "uuid")]
    pub document_id: String,
    pub title: String,
    pub document_number: Option<String>,
    pub document_status: String,
    pub original_hash: Option<String>,
    pub scanned: VerifiedRoundBody,
    pub steps: Vec<VerifiedStepBody>,
    pub rounds: Vec<VerifiedRoundBody>,
    pub completed_count: usize,
    pub rejected_count: usize,
    pub total_count: usize,
    #[schema(example = "in_progress")]
    pub aggregate: String,
    pub file_url: Option<SignedUrlBody>,
}

impl From<VerificationView> for VerificationBody {
    fn from(value: VerificationView) -> Self {
        Self {
            document_id: value.document_id.to_string(),
            title: value.title,
            document_number: value.document_number,
            document_status: value.document_status.as_str().to_owned(),
            original_hash: value.original_hash.map(|hash| hash.as_str().to_owned()),
            scanned: value.scanned.into(),
            steps: value.steps.into_iter().map(VerifiedStepBody::from).collect(),
            rounds: value.rounds.into_iter().map(VerifiedRoundBody::from).collect(),
            completed_count: value.completed_count,
            rejected_count: value.rejected_count,
            total_count: value.total_count,
            aggregate: value.aggregate.as_str().to_owned(),
            file_url: value.file_url.map(SignedUrlBody::from),
        }
    }
}
