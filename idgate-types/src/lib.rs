#![deny(missing_docs)]
//! Core type definitions for the idgate authentication gateway and client.
//!
//! This crate groups together the strongly-typed values and message
//! structures used across the system. It provides:
//!
//! * The [`SubjectId`] wrapper around the provider's composite subject
//!   identifier, with parsing and display implementations.
//! * The verified claims set carried inside an identity token (see
//!   [`claims`] module).
//! * API versioned types for client/gateway/provider communication (see
//!   [`api`] module).
//!
//! Use these types to pass, store, and (de)serialize identifiers and claims
//! in a type-safe way throughout your application.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod api;
pub mod claims;

/// Errors produced when parsing a [`SubjectId`] from its wire form.
#[derive(Debug, thiserror::Error)]
pub enum SubjectIdError {
    /// The subject string did not contain exactly two comma-separated parts.
    #[error("expected two comma-separated components, got {0}")]
    WrongComponentCount(usize),
    /// A component did not carry the expected `s=`/`u=` prefix.
    #[error("missing `{0}` prefix in subject component")]
    MissingPrefix(&'static str),
    /// The `u=` component is not a valid UUID.
    #[error("invalid uuid component: {0}")]
    InvalidUuid(#[from] uuid::Error),
}

/// The provider's composite subject identifier.
///
/// On the wire this is a single string of the form
/// `s=<NRIC>,u=<UUID>`, e.g.
/// `s=S1234567A,u=11111111-1111-1111-1111-111111111111`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId {
    /// The NRIC-like national identifier component (`s=`).
    pub nric: String,
    /// The account UUID component (`u=`).
    pub account_id: Uuid,
}

impl FromStr for SubjectId {
    type Err = SubjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split(',').collect::<Vec<_>>();
        if parts.len() != 2 {
            return Err(SubjectIdError::WrongComponentCount(parts.len()));
        }
        let nric = parts[0]
            .strip_prefix("s=")
            .ok_or(SubjectIdError::MissingPrefix("s="))?;
        let account_id = parts[1]
            .strip_prefix("u=")
            .ok_or(SubjectIdError::MissingPrefix("u="))?;
        Ok(Self {
            nric: nric.to_string(),
            account_id: Uuid::from_str(account_id)?,
        })
    }
}

impl TryFrom<String> for SubjectId {
    type Error = SubjectIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s={},u={}", self.nric, self.account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_composite_subject() {
        let sub = "s=S1234567A,u=11111111-1111-1111-1111-111111111111"
            .parse::<SubjectId>()
            .unwrap();
        assert_eq!(sub.nric, "S1234567A");
        assert_eq!(
            sub.account_id,
            Uuid::from_str("11111111-1111-1111-1111-111111111111").unwrap()
        );
        assert_eq!(
            sub.to_string(),
            "s=S1234567A,u=11111111-1111-1111-1111-111111111111"
        );
    }

    #[test]
    fn rejects_missing_prefixes() {
        assert!(matches!(
            "S1234567A,u=11111111-1111-1111-1111-111111111111".parse::<SubjectId>(),
            Err(SubjectIdError::MissingPrefix("s="))
        ));
        assert!(matches!(
            "s=S1234567A,11111111-1111-1111-1111-111111111111".parse::<SubjectId>(),
            Err(SubjectIdError::MissingPrefix("u="))
        ));
    }

    #[test]
    fn rejects_wrong_component_count() {
        assert!(matches!(
            "s=S1234567A".parse::<SubjectId>(),
            Err(SubjectIdError::WrongComponentCount(1))
        ));
    }
}
