//! Public reconstruction of a document's signing history.
//!
//! A [`VerificationView`] is assembled once from stored state. Comparing an
//! uploaded file against it ([`VerificationView::verify_file_hash`]) is a pure
//! local operation over the hashes already in the view.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::ports::SignedUrl;
use crate::domain::{
    Document, DocumentHash, DocumentId, DocumentStatus, KycStatus, LedgerAction, LedgerEntry,
    RequiredAction, SignerProfile, StepChain, StepOrder, StepStatus, UserId, sort_ledger,
};

/// Roll-up of the chain for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateStatus {
    /// Some step was rejected.
    Rejected,
    /// Every step completed.
    FullySigned,
    /// Neither of the above.
    InProgress,
}

impl AggregateStatus {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::FullySigned => "fully_signed",
            Self::InProgress => "in_progress",
        }
    }
}

/// One step as shown on the verification page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedStep {
    /// Position in the chain.
    pub step_order: StepOrder,
    /// Assigned signer.
    pub signer_id: UserId,
    /// Display name from the directory.
    pub signer_name: String,
    /// Position recorded on the ledger, else the current profile value.
    pub position: Option<String>,
    /// Department recorded on the ledger, else the current profile value.
    pub department: Option<String>,
    /// Requested action.
    pub required_action: RequiredAction,
    /// Step state.
    pub status: StepStatus,
    /// Whether it is this signer's turn.
    pub is_current: bool,
    /// Recorded action, if the signer acted.
    pub action: Option<LedgerAction>,
    /// When the signer acted.
    pub acted_at: Option<DateTime<Utc>>,
    /// Fingerprint of the artifact this step produced.
    pub document_hash: Option<DocumentHash>,
    /// Reason, for a rejection.
    pub rejection_reason: Option<String>,
    /// Identity assurance of the signer.
    pub kyc_status: KycStatus,
}

/// One ledger entry as shown on the verification page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRound {
    /// Position of the step acted on.
    pub step_order: StepOrder,
    /// Acting signer.
    pub signer_id: UserId,
    /// Display name from the directory.
    pub signer_name: String,
    /// Recorded action.
    pub action: LedgerAction,
    /// Time of action.
    pub signed_at: DateTime<Utc>,
    /// Fingerprint of the artifact produced.
    pub document_hash: Option<DocumentHash>,
}

/// Everything the public verification page shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationView {
    /// Document identifier.
    pub document_id: DocumentId,
    /// Document title.
    pub title: String,
    /// Registry number.
    pub document_number: Option<String>,
    /// Stored document status.
    pub document_status: DocumentStatus,
    /// Fingerprint of the uploaded original.
    pub original_hash: Option<DocumentHash>,
    /// The entry whose code was scanned.
    pub scanned: VerifiedRound,
    /// Steps in order.
    pub steps: Vec<VerifiedStep>,
    /// Ledger entries in `signed_at` order.
    pub rounds: Vec<VerifiedRound>,
    /// Number of completed steps.
    pub completed_count: usize,
    /// Number of rejected steps.
    pub rejected_count: usize,
    /// Number of steps.
    pub total_count: usize,
    /// Roll-up.
    pub aggregate: AggregateStatus,
    /// Short-lived link to the latest artifact, when one could be minted.
    pub file_url: Option<SignedUrl>,
}

/// Which artifact an uploaded file matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchedRound {
    /// The file is the unsigned original.
    Original,
    /// The file is the output of a signing round.
    Round(VerifiedRound),
}

/// Outcome of comparing an uploaded file against the known hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashCheck {
    /// Fingerprint of the uploaded bytes.
    pub computed_hash: DocumentHash,
    /// First matching artifact; `None` means no known round matches.
    pub matched: Option<MatchedRound>,
}

impl HashCheck {
    /// Whether any round matched.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}

/// Stored state needed to assemble a view.
pub struct VerificationInput<'a> {
    /// The owning document.
    pub document: &'a Document,
    /// Its steps.
    pub chain: &'a StepChain,
    /// Every ledger entry of the document.
    pub entries: Vec<LedgerEntry>,
    /// Directory profiles keyed by user.
    pub profiles: &'a HashMap<UserId, SignerProfile>,
    /// Identity assurance keyed by user.
    pub kyc: &'a HashMap<UserId, KycStatus>,
    /// The entry whose code was presented.
    pub scanned: &'a LedgerEntry,
}

/// Directory name for a user, or a placeholder for unknown ids.
pub(crate) fn display_name(profiles: &HashMap<UserId, SignerProfile>, user_id: &UserId) -> String {
    profiles
        .get(user_id)
        .map_or_else(|| "Unknown signer".to_owned(), |p| p.full_name.clone())
}

fn round_for(entry: &LedgerEntry, profiles: &HashMap<UserId, SignerProfile>) -> VerifiedRound {
    VerifiedRound {
        step_order: entry.step_order,
        signer_id: entry.signer_id,
        signer_name: display_name(profiles, &entry.signer_id),
        action: entry.action,
        signed_at: entry.signed_at,
        document_hash: entry.document_hash.clone(),
    }
}

impl VerificationView {
    /// Join steps to ledger entries (by signer) and compute the roll-up.
    #[must_use]
    pub fn assemble(input: VerificationInput<'_>) -> Self {
        let VerificationInput {
            document,
            chain,
            mut entries,
            profiles,
            kyc,
            scanned,
        } = input;
        sort_ledger(&mut entries);

        let current = chain.current().map(|step| step.id);
        let steps = chain
            .steps()
            .iter()
            .map(|step| {
                let entry = entries.iter().find(|e| e.signer_id == step.signer_id);
                let profile = profiles.get(&step.signer_id);
                VerifiedStep {
                    step_order: step.step_order,
                    signer_id: step.signer_id,
                    signer_name: display_name(profiles, &step.signer_id),
                    position: entry
                        .and_then(|e| e.signer.position.clone())
                        .or_else(|| profile.and_then(|p| p.position.clone())),
                    department: entry
                        .and_then(|e| e.signer.department.clone())
                        .or_else(|| profile.and_then(|p| p.department.clone())),
                    required_action: step.required_action,
                    status: step.status,
                    is_current: Some(step.id) == current,
                    action: entry.map(|e| e.action),
                    acted_at: entry.map(|e| e.signed_at),
                    document_hash: entry.and_then(|e| e.document_hash.clone()),
                    rejection_reason: entry.and_then(|e| e.rejection_reason.clone()),
                    kyc_status: kyc.get(&step.signer_id).copied().unwrap_or_default(),
                }
            })
            .collect();

        let completed_count = chain.completed_count();
        let rejected_count = chain.rejected_count();
        let total_count = chain.len();
        let aggregate = if rejected_count > 0 {
            AggregateStatus::Rejected
        } else if total_count > 0 && completed_count == total_count {
            AggregateStatus::FullySigned
        } else {
            AggregateStatus::InProgress
        };

        Self {
            document_id: document.id,
            title: document.title.clone(),
            document_number: document.document_number.clone(),
            document_status: document.status,
            original_hash: document.original_hash.clone(),
            scanned: round_for(scanned, profiles),
            steps,
            rounds: entries.iter().map(|e| round_for(e, profiles)).collect(),
            completed_count,
            rejected_count,
            total_count,
            aggregate,
            file_url: None,
        }
    }

    /// Attach a link to the latest artifact.
    #[must_use]
    pub fn with_file_url(mut self, url: SignedUrl) -> Self {
        self.file_url = Some(url);
        self
    }

    /// Hash `uploaded` and compare it against the original and every round.
    ///
    /// The original is checked first, then rounds in `signed_at` order; the
    /// first match wins.
    #[must_use]
    pub fn verify_file_hash(&self, uploaded: &[u8]) -> HashCheck {
        let computed_hash = DocumentHash::of(uploaded);
        let matched = if self.original_hash.as_ref() == Some(&computed_hash) {
            Some(MatchedRound::Original)
        } else {
            self.rounds
                .iter()
                .find(|round| round.document_hash.as_ref() == Some(&computed_hash))
                .cloned()
                .map(MatchedRound::Round)
        };
        HashCheck {
            computed_hash,
            matched,
        }
    }
}

#[cfg(test)]
#[path = "verification_tests.rs"]
mod tests;
