//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Signer display data maintained by the identity provider.
    user_profiles (user_id) {
        user_id -> Uuid,
        full_name -> Varchar,
        position -> Nullable<Varchar>,
        department -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Latest identity-assurance status per user.
    kyc_submissions (user_id) {
        user_id -> Uuid,
        status -> Varchar,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Documents and the pointer to their latest artifact.
    ///
    /// `revision` is the compare-and-set token for workflow commits.
    documents (id) {
        id -> Uuid,
        title -> Varchar,
        document_number -> Nullable<Varchar>,
        owner_id -> Uuid,
        category -> Nullable<Varchar>,
        current_file_key -> Varchar,
        original_hash -> Nullable<Varchar>,
        status -> Varchar,
        revision -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Ordered signer steps, one row per signer per document.
    workflow_steps (id) {
        id -> Uuid,
        document_id -> Uuid,
        signer_id -> Uuid,
        step_order -> Int4,
        required_action -> Varchar,
        status -> Varchar,
        signature_ref -> Nullable<Uuid>,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// The append-only signing ledger.
    document_signatures (id) {
        id -> Uuid,
        document_id -> Uuid,
        signer_id -> Uuid,
        step_order -> Int4,
        action -> Varchar,
        document_hash -> Nullable<Varchar>,
        signer_position -> Nullable<Varchar>,
        signer_department -> Nullable<Varchar>,
        verification_code -> Varchar,
        rejection_reason -> Nullable<Varchar>,
        signature_asset_id -> Nullable<Uuid>,
        file_key -> Nullable<Varchar>,
        signed_at -> Timestamptz,
    }
}

diesel::table! {
    /// Uploaded signature images; at most one active row per owner.
    user_signatures (id) {
        id -> Uuid,
        owner_id -> Uuid,
        image_key -> Varchar,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    audit_logs (id) {
        id -> Uuid,
        actor_id -> Uuid,
        action -> Varchar,
        entity_type -> Varchar,
        entity_id -> Uuid,
        details -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(workflow_steps -> documents (document_id));
diesel::joinable!(document_signatures -> documents (document_id));

diesel::allow_tables_to_appear_in_same_query!(
    audit_logs,
    document_signatures,
    documents,
    kyc_submissions,
    user_profiles,
    user_signatures,
    workflow_steps,
);
