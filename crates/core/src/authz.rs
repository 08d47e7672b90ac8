//! Error classification for backend failures.
//!
//! Backends that send a structured error code are classified by that
//! code. Older backends only trap with free-form text, so a message-based
//! fallback recognizes the known authorization phrasings.

use serde::{Deserialize, Serialize};

/// Substrings marking a legacy error message as an authorization failure.
pub const AUTHORIZATION_PATTERNS: &[&str] = &[
    "Unauthorized",
    "not authorized",
    "permission denied",
    "access denied",
    "Only users can",
    "Only admins can",
];

/// Substrings indicating the caller must log in (as opposed to lacking
/// a role).
pub const LOGIN_REQUIRED_PATTERNS: &[&str] = &[
    "Only users can",
    "login required",
    "authentication required",
];

/// Message the gateway reports before its connection is established.
pub const NOT_READY_MESSAGE: &str = "Actor not available";

const NETWORK_PATTERNS: &[&str] = &["network", "fetch"];

/// Coarse category of a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The connection or session is not established yet.
    NotReady,
    /// The caller is anonymous and must log in.
    Unauthorized,
    /// The caller is known but lacks the required role.
    Forbidden,
    /// Transport-level failure.
    Network,
    /// Any other failure reported by the backend.
    Backend,
    /// The backend answered with an unexpected payload.
    Decode,
}

impl ErrorKind {
    /// `true` for both "please log in" and "lacks permission" failures.
    pub fn is_authorization(self) -> bool {
        matches!(self, ErrorKind::Unauthorized | ErrorKind::Forbidden)
    }

    /// Map a structured wire code to a kind.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NOT_READY" => Some(ErrorKind::NotReady),
            "UNAUTHORIZED" => Some(ErrorKind::Unauthorized),
            "FORBIDDEN" => Some(ErrorKind::Forbidden),
            "NETWORK" => Some(ErrorKind::Network),
            "BACKEND" | "NOT_FOUND" | "VALIDATION_ERROR" | "INTERNAL_ERROR" => {
                Some(ErrorKind::Backend)
            }
            "DECODE" => Some(ErrorKind::Decode),
            _ => None,
        }
    }

    /// Short user-facing text for this kind.
    pub fn friendly_message(self) -> &'static str {
        match self {
            ErrorKind::NotReady => "Connection to backend is not ready. Please try again.",
            ErrorKind::Unauthorized => "Please log in to perform this action",
            ErrorKind::Forbidden => "You do not have permission to perform this action",
            ErrorKind::Network => "Network error. Please check your connection and try again.",
            ErrorKind::Backend | ErrorKind::Decode => {
                "An unexpected error occurred. Please try again."
            }
        }
    }
}

/// Classify an untyped legacy error message.
pub fn classify_message(message: &str) -> ErrorKind {
    if is_authorization_message(message) {
        if requires_login(message) {
            ErrorKind::Unauthorized
        } else {
            ErrorKind::Forbidden
        }
    } else if message.contains(NOT_READY_MESSAGE) {
        ErrorKind::NotReady
    } else if NETWORK_PATTERNS.iter().any(|p| message.contains(p)) {
        ErrorKind::Network
    } else {
        ErrorKind::Backend
    }
}

/// `true` if the message matches any [`AUTHORIZATION_PATTERNS`] entry.
pub fn is_authorization_message(message: &str) -> bool {
    AUTHORIZATION_PATTERNS.iter().any(|p| message.contains(p))
}

fn requires_login(message: &str) -> bool {
    LOGIN_REQUIRED_PATTERNS.iter().any(|p| message.contains(p))
}
