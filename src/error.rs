//! Errors raised by the signal detection core

use thiserror::Error;

use crate::models::MemberKey;

#[derive(Error, Debug)]
pub enum SignalError {
    /// The requesting account has no place in the compared member set.
    #[error("{0} is not a member of this circle")]
    NotAMember(String),

    /// The commit statistics or membership collaborator failed.
    #[error("failed to fetch commit statistics: {0}")]
    DataFetch(String),

    #[error("malformed commit record for member {member}: {reason}")]
    MalformedRecord { member: MemberKey, reason: String },
}

impl SignalError {
    /// Whether the cross-circle view may drop the failing circle and carry on.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            SignalError::NotAMember(_) | SignalError::DataFetch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;
