use std::fmt;

/// Why an authenticated actor was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    InsufficientRole,
    NotOwner,
    NotHotelOwner,
    OnlyAdminMayApproveReject,
    ProviderEditWindowClosed,
    AdminOnlySubmitted,
    AccountBanned,
}

impl ForbiddenReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForbiddenReason::InsufficientRole => "insufficient-role",
            ForbiddenReason::NotOwner => "not-owner",
            ForbiddenReason::NotHotelOwner => "not-hotel-owner",
            ForbiddenReason::OnlyAdminMayApproveReject => "only-admin-may-approve-reject",
            ForbiddenReason::ProviderEditWindowClosed => "provider-edit-window-closed",
            ForbiddenReason::AdminOnlySubmitted => "admin-only-submitted",
            ForbiddenReason::AccountBanned => "account-banned",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sled failure: {0}")]
    Sled(#[from] sled::Error),
    #[error("transaction aborted on {collection}/{id}")]
    Aborted { collection: &'static str, id: String },
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("failed to decode {collection} record: {source}")]
    Decode {
        collection: &'static str,
        #[source]
        source: minicbor::decode::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("missing or malformed bearer credential")]
    Unauthenticated,
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),
    #[error("{collection} record {id} not found")]
    NotFound { collection: &'static str, id: String },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("invalid input: {0}")]
    InvalidRange(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code equivalent for this error.
    pub fn status(&self) -> u16 {
        match self {
            Error::Unauthenticated | Error::InvalidCredential(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound { .. } => 404,
            Error::InvalidState(_) | Error::InvalidTransition(_) | Error::InvalidRange(_) => 400,
            Error::Store(_) | Error::Internal(_) => 500,
        }
    }

    /// Machine readable kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::InvalidCredential(_) => "invalid-credential",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound { .. } => "not-found",
            Error::InvalidState(_) => "invalid-state",
            Error::InvalidTransition(_) => "invalid-transition",
            Error::InvalidRange(_) => "invalid-range",
            Error::Store(_) => "store-failure",
            Error::Internal(_) => "internal",
        }
    }

    pub fn forbidden_reason(&self) -> Option<ForbiddenReason> {
        match self {
            Error::Forbidden(reason) => Some(*reason),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
