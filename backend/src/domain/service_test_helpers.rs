//! Builders shared by the service unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use crate::domain::{
    Document, DocumentId, DocumentStatus, RequiredAction, SignerProfile, StepChain, StepOrder,
    UserId, WorkflowSnapshot, WorkflowStep,
};

pub(crate) struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 15, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

/// A document owned by `owner` with one pending `sign` step per signer.
pub(crate) fn snapshot_with_signers(owner: UserId, signers: &[UserId]) -> WorkflowSnapshot {
    let document_id = DocumentId::random();
    let steps: Vec<WorkflowStep> = signers
        .iter()
        .enumerate()
        .map(|(index, signer_id)| {
            WorkflowStep::pending(
                document_id,
                *signer_id,
                StepOrder::from_index(index).expect("step order"),
                RequiredAction::Sign,
            )
        })
        .collect();
    let status = if steps.is_empty() {
        DocumentStatus::Draft
    } else {
        DocumentStatus::PendingSign
    };
    WorkflowSnapshot {
        document: Document {
            id: document_id,
            title: "Annual budget".to_owned(),
            document_number: Some("FIN-2026-014".to_owned()),
            owner_id: owner,
            category: Some("finance".to_owned()),
            current_file_key: format!("{owner}/1700000000000_original.pdf"),
            original_hash: None,
            status,
            revision: 1,
            created_at: fixture_timestamp(),
            updated_at: fixture_timestamp(),
        },
        chain: StepChain::new(steps).expect("valid chain"),
    }
}

pub(crate) fn profile(user_id: UserId, name: &str) -> SignerProfile {
    SignerProfile {
        user_id,
        full_name: name.to_owned(),
        position: Some("Deputy Mayor".to_owned()),
        department: Some("Finance".to_owned()),
    }
}

pub(crate) fn profiles(entries: &[(UserId, &str)]) -> HashMap<UserId, SignerProfile> {
    entries
        .iter()
        .map(|(user_id, name)| (*user_id, profile(*user_id, name)))
        .collect()
}
