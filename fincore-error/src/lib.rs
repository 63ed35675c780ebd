//! Shared error taxonomy for the fincore money engine.
//!
//! Every component below the HTTP boundary returns a typed, domain-specific
//! error (see `fincore_transfers::TransferError` and friends) which converts
//! into the [`Error`] defined here. `fincore-api` is the single place that
//! maps an `Error` to an HTTP status and a JSON envelope — no other crate
//! should guess at a status code.

use std::fmt;

/// The small, closed top-level taxonomy from spec.md §7's "Code family" column.
///
/// New wire codes are added as associated functions on [`Error`], not as new
/// `ErrorKind` variants — this list is not meant to grow in lockstep with the
/// wire code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    Validation,
    Business,
    NotFound,
    CardState,
    Pin,
    Crypto,
    Contention,
    Internal,
}

impl ErrorKind {
    /// HTTP status this kind maps to, per spec.md §7.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Auth => 401,
            ErrorKind::Validation => 400,
            ErrorKind::Business => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::CardState => 400,
            ErrorKind::Pin => 400,
            ErrorKind::Crypto => 500,
            ErrorKind::Contention => 409,
            ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Auth => "auth",
            ErrorKind::Validation => "validation",
            ErrorKind::Business => "business",
            ErrorKind::NotFound => "not_found",
            ErrorKind::CardState => "card_state",
            ErrorKind::Pin => "pin",
            ErrorKind::Crypto => "crypto",
            ErrorKind::Contention => "contention",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A fincore error carrying the wire code from spec.md §7, a static
/// caller-safe message, and an optional redacted detail for server-side
/// logs. `message` never embeds sensitive values (card number, CVV, PIN,
/// balance) — that rule is load-bearing, not a style preference.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code} {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub code: &'static str,
    pub message: &'static str,
    pub detail: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: &'static str, message: &'static str) -> Self {
        Self {
            kind,
            code,
            message,
            detail: None,
        }
    }

    /// Attach a server-side detail. Never call this with a card number, CVV,
    /// PIN, or balance — `detail` may end up in logs.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// HTTP status for this error. Follows `kind.http_status()` except for
    /// `AUTH_002`, which spec.md §7 carves out as 403 (ownership failure)
    /// rather than the 401 the rest of the `Auth` kind maps to.
    pub fn http_status(&self) -> u16 {
        if self.code == "AUTH_002" {
            403
        } else {
            self.kind.http_status()
        }
    }

    // -- AUTH_xxx --------------------------------------------------------

    pub fn auth_missing_identity() -> Self {
        Self::new(
            ErrorKind::Auth,
            "AUTH_001",
            "missing or invalid identity header",
        )
    }

    pub fn auth_ownership() -> Self {
        Self::new(ErrorKind::Auth, "AUTH_002", "resource is not owned by caller")
    }

    // -- VAL_xxx ----------------------------------------------------------

    pub fn validation(code: &'static str, message: &'static str) -> Self {
        Self::new(ErrorKind::Validation, code, message)
    }

    // -- BUS_xxx ------------------------------------------------------------

    pub fn insufficient_balance() -> Self {
        Self::new(ErrorKind::Business, "BUS_001", "insufficient balance")
    }

    pub fn daily_limit_exceeded() -> Self {
        Self::new(ErrorKind::Business, "BUS_002", "daily transfer limit exceeded")
    }

    pub fn monthly_limit_exceeded() -> Self {
        Self::new(ErrorKind::Business, "BUS_003", "monthly transfer limit exceeded")
    }

    pub fn invalid_status_transition() -> Self {
        Self::new(ErrorKind::Business, "BUS_101", "status transition not allowed")
    }

    // -- RES_xxx ------------------------------------------------------------

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, "RES_001", "resource not found")
    }

    pub fn user_not_found() -> Self {
        Self::new(ErrorKind::NotFound, "RES_002", "user not found")
    }

    pub fn card_not_found() -> Self {
        Self::new(ErrorKind::NotFound, "RES_003", "card not found")
    }

    pub fn transfer_not_found() -> Self {
        Self::new(ErrorKind::NotFound, "RES_004", "transfer not found")
    }

    // -- CRD_xxx --------------------------------------------------------

    pub fn card_blocked() -> Self {
        Self::new(ErrorKind::CardState, "CRD_BLOCKED", "card is blocked")
    }

    pub fn card_cancelled() -> Self {
        Self::new(ErrorKind::CardState, "CRD_CANCELLED", "card is cancelled")
    }

    pub fn card_expired() -> Self {
        Self::new(ErrorKind::CardState, "CRD_EXPIRED", "card has expired")
    }

    // -- PIN_xxx --------------------------------------------------------

    pub fn pin_mismatch() -> Self {
        Self::new(ErrorKind::Pin, "PIN_MISMATCH", "current PIN does not match")
    }

    pub fn pin_not_set() -> Self {
        Self::new(ErrorKind::Pin, "PIN_NOT_SET", "no PIN is set for this card")
    }

    pub fn pin_weak() -> Self {
        Self::new(ErrorKind::Pin, "PIN_WEAK", "PIN is too predictable")
    }

    // -- CRYPTO_FAIL / SYS_001 / Contention ------------------------------

    pub fn crypto_fail() -> Self {
        Self::new(ErrorKind::Crypto, "CRYPTO_FAIL", "cryptographic operation failed")
    }

    pub fn contention() -> Self {
        Self::new(
            ErrorKind::Contention,
            "SYS_002",
            "lock acquisition timed out, retry is safe",
        )
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal, "SYS_001", "internal error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_matches_kind() {
        assert_eq!(Error::auth_missing_identity().http_status(), 401);
        assert_eq!(Error::insufficient_balance().http_status(), 400);
        assert_eq!(Error::card_not_found().http_status(), 404);
        assert_eq!(Error::contention().http_status(), 409);
        assert_eq!(Error::crypto_fail().http_status(), 500);
    }

    #[test]
    fn ownership_failure_is_403_not_401() {
        assert_eq!(Error::auth_ownership().http_status(), 403);
    }

    #[test]
    fn detail_is_opt_in() {
        let e = Error::internal().with_detail("pool exhausted");
        assert_eq!(e.detail.as_deref(), Some("pool exhausted"));
    }
}
