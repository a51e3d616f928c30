//! Internal Diesel row structs and their conversions to domain types.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Stored strings are parsed back into domain
//! enums on read; a value the domain does not recognise is a [`RowDecodeError`].

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    AuditEvent, Document, DocumentHash, DocumentId, LedgerEntry, LedgerEntryId,
    SignatureAsset, SignatureAssetId, SignerProfile, SignerSnapshot, StepId, StepOrder, UserId,
    VerificationCode, WorkflowStep,
};

use super::schema::{
    audit_logs, document_signatures, documents, user_profiles, user_signatures, workflow_steps,
};

/// A stored value the domain cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored {column} is invalid: {message}")]
pub(crate) struct RowDecodeError {
    column: &'static str,
    message: String,
}

impl RowDecodeError {
    fn new(column: &'static str, error: impl std::fmt::Display) -> Self {
        Self {
            column,
            message: error.to_string(),
        }
    }
}

fn step_order(column: &'static str, value: i32) -> Result<StepOrder, RowDecodeError> {
    u32::try_from(value)
        .map_err(|err| RowDecodeError::new(column, err))
        .and_then(|raw| StepOrder::new(raw).map_err(|err| RowDecodeError::new(column, err)))
}

fn stored_order(order: StepOrder) -> i32 {
    i32::try_from(order.get()).unwrap_or(i32::MAX)
}

fn optional_hash(
    column: &'static str,
    value: Option<String>,
) -> Result<Option<DocumentHash>, RowDecodeError> {
    value
        .map(DocumentHash::parse)
        .transpose()
        .map_err(|err| RowDecodeError::new(column, err))
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DocumentRow {
    pub id: Uuid,
    pub title: String,
    pub document_number: Option<String>,
    pub owner_id: Uuid,
    pub category: Option<String>,
    pub current_file_key: String,
    pub original_hash: Option<String>,
    pub status: String,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Document> for DocumentRow {
    fn from(document: &Document) -> Self {
        Self {
            id: *document.id.as_uuid(),
            title: document.title.clone(),
            document_number: document.document_number.clone(),
            owner_id: *document.owner_id.as_uuid(),
            category: document.category.clone(),
            current_file_key: document.current_file_key.clone(),
            original_hash: document
                .original_hash
                .as_ref()
                .map(|hash| hash.as_str().to_owned()),
            status: document.status.as_str().to_owned(),
            revision: document.revision,
            created_at: document.created_at,
            updated_at: document.updated_at,
        }
    }
}

impl TryFrom<DocumentRow> for Document {
    type Error = RowDecodeError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DocumentId::from_uuid(row.id),
            title: row.title,
            document_number: row.document_number,
            owner_id: UserId::from_uuid(row.owner_id),
            category: row.category,
            current_file_key: row.current_file_key,
            original_hash: optional_hash("documents.original_hash", row.original_hash)?,
            status: row
                .status
                .parse()
                .map_err(|err| RowDecodeError::new("documents.status", err))?,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Columns a workflow commit rewrites on the document row.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = documents)]
pub(crate) struct DocumentCommitUpdate<'a> {
    pub current_file_key: &'a str,
    pub status: &'a str,
    pub revision: i64,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Document> for DocumentCommitUpdate<'a> {
    fn from(document: &'a Document) -> Self {
        Self {
            current_file_key: &document.current_file_key,
            status: document.status.as_str(),
            revision: document.revision,
            updated_at: document.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = workflow_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StepRow {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signer_id: Uuid,
    pub step_order: i32,
    pub required_action: String,
    pub status: String,
    pub signature_ref: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&WorkflowStep> for StepRow {
    fn from(step: &WorkflowStep) -> Self {
        Self {
            id: *step.id.as_uuid(),
            document_id: *step.document_id.as_uuid(),
            signer_id: *step.signer_id.as_uuid(),
            step_order: stored_order(step.step_order),
            required_action: step.required_action.as_str().to_owned(),
            status: step.status.as_str().to_owned(),
            signature_ref: step.signature_ref.map(|id| *id.as_uuid()),
            completed_at: step.completed_at,
        }
    }
}

impl TryFrom<StepRow> for WorkflowStep {
    type Error = RowDecodeError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StepId::from_uuid(row.id),
            document_id: DocumentId::from_uuid(row.document_id),
            signer_id: UserId::from_uuid(row.signer_id),
            step_order: step_order("workflow_steps.step_order", row.step_order)?,
            required_action: row
                .required_action
                .parse()
                .map_err(|err| RowDecodeError::new("workflow_steps.required_action", err))?,
            status: row
                .status
                .parse()
                .map_err(|err| RowDecodeError::new("workflow_steps.status", err))?,
            signature_ref: row.signature_ref.map(LedgerEntryId::from_uuid),
            completed_at: row.completed_at,
        })
    }
}

/// Columns a step transition rewrites. `None` clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = workflow_steps)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct StepTransitionUpdate<'a> {
    pub status: &'a str,
    pub signature_ref: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a WorkflowStep> for StepTransitionUpdate<'a> {
    fn from(step: &'a WorkflowStep) -> Self {
        Self {
            status: step.status.as_str(),
            signature_ref: step.signature_ref.map(|id| *id.as_uuid()),
            completed_at: step.completed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = document_signatures)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LedgerRow {
    pub id: Uuid,
    pub document_id: Uuid,
    pub signer_id: Uuid,
    pub step_order: i32,
    pub action: String,
    pub document_hash: Option<String>,
    pub signer_position: Option<String>,
    pub signer_department: Option<String>,
    pub verification_code: String,
    pub rejection_reason: Option<String>,
    pub signature_asset_id: Option<Uuid>,
    pub file_key: Option<String>,
    pub signed_at: DateTime<Utc>,
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: *entry.id.as_uuid(),
            document_id: *entry.document_id.as_uuid(),
            signer_id: *entry.signer_id.as_uuid(),
            step_order: stored_order(entry.step_order),
            action: entry.action.as_str().to_owned(),
            document_hash: entry
                .document_hash
                .as_ref()
                .map(|hash| hash.as_str().to_owned()),
            signer_position: entry.signer.position.clone(),
            signer_department: entry.signer.department.clone(),
            verification_code: entry.verification_code.as_str().to_owned(),
            rejection_reason: entry.rejection_reason.clone(),
            signature_asset_id: entry.signature_asset_id.map(|id| *id.as_uuid()),
            file_key: entry.file_key.clone(),
            signed_at: entry.signed_at,
        }
    }
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = RowDecodeError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: LedgerEntryId::from_uuid(row.id),
            document_id: DocumentId::from_uuid(row.document_id),
            signer_id: UserId::from_uuid(row.signer_id),
            step_order: step_order("document_signatures.step_order", row.step_order)?,
            action: row
                .action
                .parse()
                .map_err(|err| RowDecodeError::new("document_signatures.action", err))?,
            document_hash: optional_hash("document_signatures.document_hash", row.document_hash)?,
            signer: SignerSnapshot {
                position: row.signer_position,
                department: row.signer_department,
            },
            verification_code: VerificationCode::parse(&row.verification_code).map_err(|err| {
                RowDecodeError::new("document_signatures.verification_code", err)
            })?,
            rejection_reason: row.rejection_reason,
            signature_asset_id: row.signature_asset_id.map(SignatureAssetId::from_uuid),
            file_key: row.file_key,
            signed_at: row.signed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Signature assets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_signatures)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SignatureRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub image_key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&SignatureAsset> for SignatureRow {
    fn from(asset: &SignatureAsset) -> Self {
        Self {
            id: *asset.id.as_uuid(),
            owner_id: *asset.owner_id.as_uuid(),
            image_key: asset.image_key.clone(),
            is_active: asset.is_active,
            created_at: asset.created_at,
        }
    }
}

impl From<SignatureRow> for SignatureAsset {
    fn from(row: SignatureRow) -> Self {
        Self {
            id: SignatureAssetId::from_uuid(row.id),
            owner_id: UserId::from_uuid(row.owner_id),
            image_key: row.image_key,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Directory and audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProfileRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub position: Option<String>,
    pub department: Option<String>,
}

impl From<ProfileRow> for SignerProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            full_name: row.full_name,
            position: row.position,
            department: row.department,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_logs)]
pub(crate) struct NewAuditRow<'a> {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Uuid,
    pub details: &'a serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a AuditEvent> for NewAuditRow<'a> {
    fn from(event: &'a AuditEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id: *event.actor_id.as_uuid(),
            action: event.action.as_str(),
            entity_type: event.action.entity_type(),
            entity_id: event.entity_id,
            details: &event.details,
            created_at: event.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Row conversion coverage.

    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;
    use crate::domain::{LedgerAction, RequiredAction, StepStatus};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0)
            .single()
            .expect("timestamp")
    }

    fn step_row(order: i32, status: &str) -> StepRow {
        StepRow {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            signer_id: Uuid::new_v4(),
            step_order: order,
            required_action: "approve".to_owned(),
            status: status.to_owned(),
            signature_ref: None,
            completed_at: None,
        }
    }

    #[rstest]
    fn step_rows_decode_into_domain_steps() {
        let step = WorkflowStep::try_from(step_row(2, "pending")).expect("decodes");

        assert_eq!(step.step_order.get(), 2);
        assert_eq!(step.required_action, RequiredAction::Approve);
        assert_eq!(step.status, StepStatus::Pending);
    }

    #[rstest]
    #[case(0, "pending", "workflow_steps.step_order")]
    #[case(-3, "pending", "workflow_steps.step_order")]
    #[case(1, "skipped", "workflow_steps.status")]
    fn invalid_step_rows_name_the_column(
        #[case] order: i32,
        #[case] status: &str,
        #[case] column: &str,
    ) {
        let err = WorkflowStep::try_from(step_row(order, status)).expect_err("invalid row");

        assert!(err.to_string().contains(column));
    }

    #[rstest]
    fn ledger_rows_keep_the_signer_snapshot() {
        let entry = LedgerEntry {
            id: LedgerEntryId::random(),
            document_id: DocumentId::random(),
            signer_id: UserId::random(),
            step_order: StepOrder::FIRST,
            action: LedgerAction::Rejected,
            document_hash: None,
            signer: SignerSnapshot {
                position: Some("Clerk".to_owned()),
                department: Some("Registry".to_owned()),
            },
            verification_code: VerificationCode::generate(),
            rejection_reason: Some("wrong annex".to_owned()),
            signature_asset_id: None,
            file_key: None,
            signed_at: at(),
        };

        let decoded = LedgerEntry::try_from(LedgerRow::from(&entry)).expect("decodes");

        assert_eq!(decoded, entry);
    }

    #[rstest]
    fn malformed_document_hashes_are_rejected() {
        let row = DocumentRow {
            id: Uuid::new_v4(),
            title: "Budget".to_owned(),
            document_number: None,
            owner_id: Uuid::new_v4(),
            category: None,
            current_file_key: "a/b.pdf".to_owned(),
            original_hash: Some("xyz".to_owned()),
            status: "draft".to_owned(),
            revision: 0,
            created_at: at(),
            updated_at: at(),
        };

        let err = Document::try_from(row).expect_err("bad hash");

        assert!(err.to_string().contains("documents.original_hash"));
    }
}
