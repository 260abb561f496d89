//! Unified error codes for the dispatch engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Store errors
//! - 4xxx: Distribution errors
//! - 5xxx: Notification errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Conflicting write
    Conflict = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 6,
    /// Operation not supported
    Unsupported = 7,

    // ==================== 2xxx: Store ====================
    /// Optimistic transaction lost the race
    StoreConflict = 2001,
    /// Store timeout or contention, safe to redeliver
    StoreTransient = 2002,
    /// Schema violation or forbidden store operation
    StorePermanent = 2003,

    // ==================== 4xxx: Distribution ====================
    /// Distribution could not be completed
    DistributionFailed = 4001,
    /// Event has no points of sale
    NoPointsOfSale = 4002,
    /// Purchase was already distributed
    AlreadyDistributed = 4003,

    // ==================== 5xxx: Notification ====================
    /// Notification payload is incomplete
    NotificationInvalid = 5001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
}

/// Error category, used to pick a recovery policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller mistake, never retried
    Request,
    /// Store-level failure
    Store,
    /// Engine business rule
    Engine,
    /// System failure
    System,
}

impl ErrorCode {
    /// Numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Default human-readable message for this code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Conflicting write",
            Self::InvalidRequest => "Invalid request",
            Self::RequiredField => "Missing required fields",
            Self::Unsupported => "Operation not supported",
            Self::StoreConflict => "Store transaction conflict",
            Self::StoreTransient => "Store temporarily unavailable",
            Self::StorePermanent => "Store rejected the operation",
            Self::DistributionFailed => "Distribution failed",
            Self::NoPointsOfSale => "No Points of Sale found",
            Self::AlreadyDistributed => "Purchase already distributed",
            Self::NotificationInvalid => "Notification payload invalid",
            Self::InternalError => "Internal server error",
        }
    }

    /// Category of this code
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            0..=999 => ErrorCategory::Request,
            2000..=2999 => ErrorCategory::Store,
            4000..=5999 => ErrorCategory::Engine,
            _ => ErrorCategory::System,
        }
    }

    /// Whether the trigger transport may redeliver after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreConflict | Self::StoreTransient)
    }

    /// HTTP status code for this error
    pub fn http_status(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Self::Success => StatusCode::OK,
            Self::ValidationFailed | Self::InvalidRequest | Self::RequiredField => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict | Self::StoreConflict | Self::AlreadyDistributed => {
                StatusCode::CONFLICT
            }
            Self::Unsupported => StatusCode::NOT_IMPLEMENTED,
            Self::StoreTransient => StatusCode::SERVICE_UNAVAILABLE,
            Self::NoPointsOfSale | Self::NotificationInvalid => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unknown
            | Self::StorePermanent
            | Self::DistributionFailed
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::Conflict,
            5 => Self::InvalidRequest,
            6 => Self::RequiredField,
            7 => Self::Unsupported,
            2001 => Self::StoreConflict,
            2002 => Self::StoreTransient,
            2003 => Self::StorePermanent,
            4001 => Self::DistributionFailed,
            4002 => Self::NoPointsOfSale,
            4003 => Self::AlreadyDistributed,
            5001 => Self::NotificationInvalid,
            9001 => Self::InternalError,
            other => return Err(other),
        };
        Ok(code)
    }
}
