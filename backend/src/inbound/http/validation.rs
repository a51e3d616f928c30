//! Shared validation helpers for inbound HTTP adapters.
//!
//! Path segments and JSON fields arrive as strings; these helpers turn them
//! into domain values and produce `invalid_request` errors whose details name
//! the offending field.

use std::str::FromStr;

use serde_json::json;

use crate::domain::{Error, Placement, RequiredAction, SigningError, UserId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidAction,
}

impl ErrorCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidAction => "invalid_action",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    const fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: Option<&str>) -> Error {
    let mut details = json!({
        "field": field.as_str(),
        "code": code.as_str(),
    });
    if let (Some(value), Some(map)) = (value, details.as_object_mut()) {
        map.insert("value".to_owned(), json!(value));
    }
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    field_error(
        field,
        format!("missing required field: {}", field.as_str()),
        ErrorCode::MissingField,
        None,
    )
}

/// Parse any UUID-backed identifier.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse().map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            Some(value),
        )
    })
}

pub(crate) fn parse_user_id(value: &str, field: FieldName) -> Result<UserId, Error> {
    UserId::new(value).map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            Some(value),
        )
    })
}

pub(crate) fn parse_action(value: &str, field: FieldName) -> Result<RequiredAction, Error> {
    value.parse().map_err(|_| {
        field_error(
            field,
            format!("{} must be sign, approve or review", field.as_str()),
            ErrorCode::InvalidAction,
            Some(value),
        )
    })
}

pub(crate) fn parse_placement(
    page_index: u32,
    click_x: f64,
    click_y: f64,
    scale: f64,
) -> Result<Placement, Error> {
    Placement::new(page_index, click_x, click_y, scale)
        .map_err(|err| SigningError::validation("placement", err.to_string()).into())
}

/// Reject an empty upload body.
pub(crate) fn require_body(body: &[u8], field: FieldName) -> Result<(), Error> {
    if body.is_empty() {
        Err(missing_field_error(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::{ErrorCode as DomainCode, StepId};

    #[rstest]
    fn invalid_ids_name_field_and_value() {
        let err = parse_id::<StepId>("step-1", FieldName::new("stepId")).expect_err("not a uuid");

        assert_eq!(err.code(), DomainCode::InvalidRequest);
        assert_eq!(
            err.details(),
            Some(&json!({"field": "stepId", "code": "invalid_uuid", "value": "step-1"}))
        );
    }

    #[rstest]
    #[case("sign", RequiredAction::Sign)]
    #[case("approve", RequiredAction::Approve)]
    #[case("review", RequiredAction::Review)]
    fn actions_parse(#[case] raw: &str, #[case] expected: RequiredAction) {
        assert_eq!(parse_action(raw, FieldName::new("action")).ok(), Some(expected));
    }

    #[rstest]
    fn unknown_actions_are_refused() {
        let err = parse_action("notarise", FieldName::new("signers[0].action"))
            .expect_err("unknown action");
        assert_eq!(err.detail_code(), Some("invalid_action"));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn bad_scales_are_validation_errors(#[case] scale: f64) {
        let err = parse_placement(0, 10.0, 10.0, scale).expect_err("bad scale");
        assert_eq!(err.code(), DomainCode::InvalidRequest);
        assert_eq!(err.detail_code(), Some("validation_error"));
    }

    #[rstest]
    fn empty_bodies_are_missing_fields() {
        let err = require_body(&[], FieldName::new("body")).expect_err("empty");
        assert_eq!(err.detail_code(), Some("missing_field"));
    }
}
