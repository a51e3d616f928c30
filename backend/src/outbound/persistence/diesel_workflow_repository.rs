//! PostgreSQL-backed `WorkflowRepository` implementation using Diesel ORM.
//!
//! Every commit runs in one transaction that locks the document row with
//! `SELECT ... FOR UPDATE`, reloads the step chain, applies the shared commit
//! rules and writes the ledger row, the changed steps and the document row.
//! Concurrent actions on one document therefore serialise on the row lock and
//! the loser observes a revision mismatch.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{WorkflowRepository, WorkflowRepositoryError};
use crate::domain::{
    AttachWorkflow, CommitConflict, CommitOutcome, CompletionCommit, Document, DocumentId,
    LedgerEntry, RejectionCommit, StepChain, StepChainError, StepId, UserId, WorkflowSnapshot,
    WorkflowStep, apply_attachment, apply_completion, apply_rejection,
};

use super::diesel_basic_error_mapping::{
    is_unique_violation_on, map_basic_diesel_error, map_basic_pool_error,
};
use super::models::{
    DocumentCommitUpdate, DocumentRow, LedgerRow, RowDecodeError, StepRow, StepTransitionUpdate,
};
use super::pool::{DbPool, PoolError};
use super::schema::{document_signatures, documents, workflow_steps};

/// Diesel-backed implementation of the workflow repository port.
#[derive(Clone)]
pub struct DieselWorkflowRepository {
    pool: DbPool,
}

impl DieselWorkflowRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failures raised inside a commit transaction.
#[derive(Debug, thiserror::Error)]
enum CommitFailure {
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
    #[error(transparent)]
    Decode(#[from] RowDecodeError),
    #[error(transparent)]
    Chain(#[from] StepChainError),
    #[error(transparent)]
    Conflict(#[from] CommitConflict),
    #[error("document {0} does not exist")]
    Missing(DocumentId),
}

fn map_pool_error(error: PoolError) -> WorkflowRepositoryError {
    map_basic_pool_error(error, WorkflowRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> WorkflowRepositoryError {
    if is_unique_violation_on(&error, "verification_code") {
        return WorkflowRepositoryError::query("verification code already recorded");
    }
    map_basic_diesel_error(
        error,
        WorkflowRepositoryError::query,
        WorkflowRepositoryError::connection,
    )
}

fn map_failure(failure: CommitFailure) -> WorkflowRepositoryError {
    match failure {
        CommitFailure::Diesel(error) => map_diesel_error(error),
        CommitFailure::Decode(error) => WorkflowRepositoryError::query(error.to_string()),
        CommitFailure::Chain(error) => {
            WorkflowRepositoryError::query(format!("stored step chain is invalid: {error}"))
        }
        CommitFailure::Conflict(reason) => WorkflowRepositoryError::from(reason),
        CommitFailure::Missing(document_id) => {
            WorkflowRepositoryError::document_missing(document_id)
        }
    }
}

fn assemble(document: DocumentRow, steps: Vec<StepRow>) -> Result<WorkflowSnapshot, CommitFailure> {
    let document = Document::try_from(document)?;
    let steps = steps
        .into_iter()
        .map(WorkflowStep::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WorkflowSnapshot {
        document,
        chain: StepChain::new(steps)?,
    })
}

async fn load_steps(
    conn: &mut AsyncPgConnection,
    document_id: Uuid,
) -> Result<Vec<StepRow>, diesel::result::Error> {
    workflow_steps::table
        .filter(workflow_steps::document_id.eq(document_id))
        .order(workflow_steps::step_order.asc())
        .select(StepRow::as_select())
        .load(conn)
        .await
}

/// Lock the document row and load its chain.
async fn lock_snapshot(
    conn: &mut AsyncPgConnection,
    document_id: DocumentId,
) -> Result<WorkflowSnapshot, CommitFailure> {
    let row = documents::table
        .find(*document_id.as_uuid())
        .select(DocumentRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or(CommitFailure::Missing(document_id))?;
    let steps = load_steps(conn, *document_id.as_uuid()).await?;
    assemble(row, steps)
}

/// Write the ledger row, the changed steps and the document row.
async fn persist(
    conn: &mut AsyncPgConnection,
    outcome: CommitOutcome,
    entry: Option<&LedgerEntry>,
    insert_steps: bool,
) -> Result<WorkflowSnapshot, CommitFailure> {
    let CommitOutcome {
        snapshot,
        changed_steps,
    } = outcome;

    if let Some(entry) = entry {
        diesel::insert_into(document_signatures::table)
            .values(LedgerRow::from(entry))
            .execute(conn)
            .await?;
    }

    let changed: Vec<&WorkflowStep> = snapshot
        .chain
        .steps()
        .iter()
        .filter(|step| changed_steps.contains(&step.id))
        .collect();
    if insert_steps {
        let rows: Vec<StepRow> = changed.iter().map(|step| StepRow::from(*step)).collect();
        diesel::insert_into(workflow_steps::table)
            .values(&rows)
            .execute(conn)
            .await?;
    } else {
        for step in changed {
            diesel::update(workflow_steps::table.find(*step.id.as_uuid()))
                .set(StepTransitionUpdate::from(step))
                .execute(conn)
                .await?;
        }
    }

    diesel::update(documents::table.find(*snapshot.document.id.as_uuid()))
        .set(DocumentCommitUpdate::from(&snapshot.document))
        .execute(conn)
        .await?;
    Ok(snapshot)
}

impl DieselWorkflowRepository {
    async fn snapshots_for(
        &self,
        document_ids: Vec<Uuid>,
    ) -> Result<Vec<WorkflowSnapshot>, WorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<DocumentRow> = documents::table
            .filter(documents::id.eq_any(&document_ids))
            .order(documents::created_at.desc())
            .select(DocumentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        let step_rows: Vec<StepRow> = workflow_steps::table
            .filter(workflow_steps::document_id.eq_any(&document_ids))
            .select(StepRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut by_document: HashMap<Uuid, Vec<StepRow>> = HashMap::new();
        for step in step_rows {
            by_document.entry(step.document_id).or_default().push(step);
        }
        rows.into_iter()
            .map(|row| {
                let steps = by_document.remove(&row.id).unwrap_or_default();
                assemble(row, steps).map_err(map_failure)
            })
            .collect()
    }
}

#[async_trait]
impl WorkflowRepository for DieselWorkflowRepository {
    async fn insert_document(&self, document: &Document) -> Result<(), WorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(documents::table)
            .values(DocumentRow::from(document))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn load(
        &self,
        document_id: &DocumentId,
    ) -> Result<Option<WorkflowSnapshot>, WorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<DocumentRow> = documents::table
            .find(*document_id.as_uuid())
            .select(DocumentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let steps = load_steps(&mut conn, row.id)
            .await
            .map_err(map_diesel_error)?;
        assemble(row, steps).map(Some).map_err(map_failure)
    }

    async fn find_document_for_step(
        &self,
        step_id: &StepId,
    ) -> Result<Option<DocumentId>, WorkflowRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let document_id: Option<Uuid> = workflow_steps::table
            .find(*step_id.as_uuid())
            .select(workflow_steps::document_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(document_id.map(DocumentId::from_uuid))
    }

    async fn attach_workflow(
        &self,
        commit: AttachWorkflow,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError> {
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let snapshot = conn
            .transaction(|conn| {
                async move {
                    let locked = lock_snapshot(conn, commit.document_id).await?;
                    let outcome = apply_attachment(locked, commit)?;
                    persist(conn, outcome, None, true).await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_failure)?;
        debug!(
            document_id = %snapshot.document.id,
            steps = snapshot.chain.len(),
            "workflow attached"
        );
        Ok(snapshot)
    }

    async fn commit_completion(
        &self,
        commit: CompletionCommit,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError> {
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let commit = &commit;
        let snapshot = conn
            .transaction(|conn| {
                async move {
                    let locked = lock_snapshot(conn, commit.document_id).await?;
                    let outcome = apply_completion(locked, commit)?;
                    persist(conn, outcome, Some(&commit.entry), false).await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_failure)?;
        debug!(
            document_id = %commit.document_id,
            step_id = %commit.step_id,
            revision = snapshot.document.revision,
            "completion stored"
        );
        Ok(snapshot)
    }

    async fn commit_rejection(
        &self,
        commit: RejectionCommit,
    ) -> Result<WorkflowSnapshot, WorkflowRepositoryError> {
        let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
        let conn: &mut AsyncPgConnection = &mut pooled;
        let commit = &commit;
        let snapshot = conn
            .transaction(|conn| {
                async move {
                    let locked = lock_snapshot(conn, commit.document_id).await?;
                    let outcome = apply_rejection(locked, commit)?;
                    persist(conn, outcome, Some(&commit.entry), false).await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_failure)?;
        debug!(
            document_id = %commit.document_id,
            step_id = %commit.step_id,
            "rejection stored"
        );
        Ok(snapshot)
    }

    async fn list_for_signer(
        &self,
        signer_id: &UserId,
    ) -> Result<Vec<WorkflowSnapshot>, WorkflowRepositoryError> {
        let document_ids: Vec<Uuid> = {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            workflow_steps::table
                .filter(workflow_steps::signer_id.eq(*signer_id.as_uuid()))
                .select(workflow_steps::document_id)
                .load(&mut conn)
                .await
                .map_err(map_diesel_error)?
        };
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.snapshots_for(document_ids).await
    }
}
