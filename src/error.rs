use crate::models::{ItemId, ItemStatus};
use crate::repo::RepoError;

/// Failure of an external collaborator (image verification, description generation).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExternalServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(thiserror::Error, Debug)]
pub enum MarketError {
    #[error("missing or invalid fields: {}", .missing_fields.join(", "))]
    Validation { missing_fields: Vec<&'static str> },
    #[error("images awaiting verification ({pending} pending, {rejected} rejected)")]
    ModerationPending { pending: usize, rejected: usize },
    #[error("invalid transition for item {id}: {from} -> {to}")]
    InvalidTransition { id: ItemId, from: ItemStatus, to: ItemStatus },
    #[error("not found: {0}")]
    NotFound(ItemId),
    #[error("item {0} is already published")]
    SyncConflict(ItemId),
    #[error(transparent)]
    ExternalService(#[from] ExternalServiceError),
    #[error("forbidden")]
    Forbidden,
    #[error("store error: {0}")]
    Store(String),
}

impl MarketError {
    pub fn missing(field: &'static str) -> Self {
        MarketError::Validation { missing_fields: vec![field] }
    }
}

impl From<RepoError> for MarketError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound(id) => MarketError::NotFound(id),
            RepoError::Conflict(id) => MarketError::SyncConflict(id),
            RepoError::InvalidTransition { id, from, to } => MarketError::InvalidTransition { id, from, to },
            RepoError::Internal(msg) => MarketError::Store(msg),
        }
    }
}

pub type MarketResult<T> = Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_errors_keep_their_ids() {
        let e: MarketError = RepoError::NotFound("42".into()).into();
        assert!(matches!(e, MarketError::NotFound(id) if id == "42"));
        let e: MarketError = RepoError::Conflict("7".into()).into();
        assert!(matches!(e, MarketError::SyncConflict(id) if id == "7"));
        let e: MarketError = RepoError::InvalidTransition {
            id: "9".into(),
            from: ItemStatus::Rejected,
            to: ItemStatus::Approved,
        }
        .into();
        assert_eq!(e.to_string(), "invalid transition for item 9: rejected -> approved");
    }
}
